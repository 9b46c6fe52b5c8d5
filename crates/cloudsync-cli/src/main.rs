mod commands;
mod utils;

use clap::{Parser, Subcommand};
use cloudsync_config::SyncConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudsync")]
#[command(about = "クラウドの実体と、手元の台帳を、いつも同じに。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// ローカルインベントリをプロバイダーの状態に同期
    Reconcile {
        /// ローカルインベントリのスナップショット (存在しなければ空から開始)
        #[arg(short, long, default_value = "inventory.json")]
        local: PathBuf,
        /// プロバイダーの状態 (JSON)
        #[arg(short, long)]
        remote: PathBuf,
        /// 同期結果の書き出し先 (省略時は --local に上書き)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// 対象のアカウントID (省略時は全アカウント)
        #[arg(short, long)]
        account: Option<String>,
        /// 追加・削除のみ行い、既存レコードは更新しない
        #[arg(long)]
        xor: bool,
        /// 結果を書き出さない
        #[arg(long)]
        dry_run: bool,
    },
    /// 1つのスコープだけを再同期
    Resync {
        /// リソース種別 (cloudsync kinds で確認)
        keyword: String,
        /// アカウントID
        #[arg(short, long)]
        account: String,
        /// リージョン (ローカルIDまたはプロバイダーID)。リージョン配下の種別で必須
        #[arg(long)]
        region: Option<String>,
        #[arg(short, long, default_value = "inventory.json")]
        local: PathBuf,
        #[arg(short, long)]
        remote: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// 登録されているリソース種別を表示
    Kinds,
    /// 有効な設定を表示
    Config,
    /// バージョン情報を表示
    Version,
}

fn init_tracing(config: &SyncConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("cloudsync {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (mut config, source) = SyncConfig::load()?;
    init_tracing(&config);
    tracing::debug!(?source, "Configuration loaded");

    match cli.command {
        Commands::Reconcile {
            local,
            remote,
            out,
            account,
            xor,
            dry_run,
        } => {
            if xor {
                config.xor = true;
            }
            let out = if dry_run {
                None
            } else {
                Some(out.unwrap_or_else(|| local.clone()))
            };
            commands::reconcile::handle(&config, &local, &remote, out.as_deref(), account.as_deref())
                .await?;
        }
        Commands::Resync {
            keyword,
            account,
            region,
            local,
            remote,
            out,
        } => {
            let out = out.unwrap_or_else(|| local.clone());
            commands::resync::handle(
                &config,
                &keyword,
                &account,
                region.as_deref(),
                &local,
                &remote,
                &out,
            )
            .await?;
        }
        Commands::Kinds => {
            commands::kinds::handle(&config)?;
        }
        Commands::Config => {
            commands::config::handle(&config, source.as_deref());
        }
        // 設定読み込み前に処理済み
        Commands::Version => {}
    }

    Ok(())
}
