use crate::utils;
use cloudsync::SyncContext;
use cloudsync_config::SyncConfig;
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    config: &SyncConfig,
    local: &Path,
    remote: &Path,
    out: Option<&Path>,
    account: Option<&str>,
) -> anyhow::Result<()> {
    println!("{}", "インベントリを同期中...".blue());
    if config.xor {
        println!("{}", "追加・削除のみ (xor)".yellow());
    }

    let sync = utils::load_inventory(config, local, remote).await?;
    let ctx = SyncContext::new("cloudsync-cli");

    let failed = match account {
        Some(account) => {
            println!("アカウント: {}", account.cyan());
            let result = sync.sync_account(&ctx, account).await?;
            usize::from(result.is_failed())
        }
        None => {
            let results = sync.sync_all(&ctx, config.max_concurrent_scopes).await;
            for (job, result) in &results {
                let mark = if result.is_failed() {
                    "✗".red()
                } else {
                    "✓".green()
                };
                println!("  {} {}", mark, job.scope.manager_id.cyan());
            }
            results.iter().filter(|(_, r)| r.is_failed()).count()
        }
    };

    utils::print_results(&ctx.results());

    match out {
        Some(out) => utils::save_inventory(&sync, out).await?,
        None => println!("{}", "dry-run: 結果は書き出していません".dimmed()),
    }

    if failed > 0 {
        anyhow::bail!("{}件のスコープで同期に失敗しました", failed);
    }
    println!("{}", "✓ 同期が完了しました".green().bold());
    Ok(())
}
