pub mod error;

pub use error::*;

use cloudsync::{STATUS_UNKNOWN, SyncOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 設定ファイルを直接指定する環境変数
pub const CONFIG_ENV: &str = "CLOUDSYNC_CONFIG";

const ENV_ENABLE_SYNC_NAME: &str = "CLOUDSYNC_ENABLE_SYNC_NAME";
const ENV_XOR: &str = "CLOUDSYNC_XOR";
const ENV_MAX_CONCURRENT_SCOPES: &str = "CLOUDSYNC_MAX_CONCURRENT_SCOPES";

const CANDIDATES: [&str; 2] = ["cloudsync.yaml", ".cloudsync.yaml"];

/// 同期エンジンの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 更新時にリモート側の名前へ追従する
    pub enable_sync_name: bool,
    /// 追加・削除のみ行い、既存レコードは更新しない
    pub xor: bool,
    /// 同時に同期するスコープ数の上限
    pub max_concurrent_scopes: usize,
    /// 削除できないレコードに付けるステータス
    pub unknown_status: String,
    pub log_level: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enable_sync_name: true,
            xor: false,
            max_concurrent_scopes: 4,
            unknown_status: STATUS_UNKNOWN.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::ConfigFileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// 設定ファイルを探して読み込み、環境変数で上書きする
    ///
    /// 設定ファイルが見つからない場合はデフォルト値を使う。
    /// 戻り値の2番目は読み込んだファイルのパス。
    pub fn load() -> Result<(Self, Option<PathBuf>)> {
        let path = find_config_file()?;
        let mut config = match &path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok((config, path))
    }

    /// `CLOUDSYNC_*` 環境変数による上書き
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(value) = env_bool(ENV_ENABLE_SYNC_NAME)? {
            self.enable_sync_name = value;
        }
        if let Some(value) = env_bool(ENV_XOR)? {
            self.xor = value;
        }
        if let Ok(value) = std::env::var(ENV_MAX_CONCURRENT_SCOPES) {
            self.max_concurrent_scopes = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    name: ENV_MAX_CONCURRENT_SCOPES.to_string(),
                    value,
                })?;
        }
        Ok(())
    }

    pub fn to_options(&self) -> SyncOptions {
        SyncOptions {
            xor: self.xor,
            enable_sync_name: self.enable_sync_name,
            unknown_status: self.unknown_status.clone(),
        }
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Ok(value) = std::env::var(name) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value,
        }),
    }
}

/// CloudSyncの設定ディレクトリ (~/.config/cloudsync)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("cloudsync"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 CLOUDSYNC_CONFIG (直接パス指定、存在しなければエラー)
/// 2. カレントディレクトリ: cloudsync.yaml, .cloudsync.yaml
/// 3. ~/.config/cloudsync/config.yaml (グローバル設定)
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ConfigFileNotFound(path));
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}
