use cloudsync_config::SyncConfig;
use colored::Colorize;
use std::path::Path;

pub fn handle(config: &SyncConfig, source: Option<&Path>) {
    match source {
        Some(path) => println!("📄 設定ファイル: {}", path.display().to_string().cyan()),
        None => println!("{}", "設定ファイルなし (デフォルト値を使用)".dimmed()),
    }
    println!();
    print!("{}", config.to_yaml());
}
