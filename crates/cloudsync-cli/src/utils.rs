use cloudsync::{SyncResult, SyncResultSet, SyncServices};
use cloudsync_config::SyncConfig;
use cloudsync_inventory::{InventoryStores, InventorySync, LocalInventory, RemoteCloud};
use colored::Colorize;
use std::path::Path;

/// スナップショットとプロバイダー状態から同期ツリーを組み立てる
pub async fn load_inventory(
    config: &SyncConfig,
    local: &Path,
    remote: &Path,
) -> anyhow::Result<InventorySync> {
    let snapshot = LocalInventory::load_file(local).await.map_err(|e| {
        anyhow::anyhow!("ローカルインベントリを読み込めません ({}): {}", local.display(), e)
    })?;
    let cloud = RemoteCloud::load_file(remote).await.map_err(|e| {
        anyhow::anyhow!("プロバイダー状態を読み込めません ({}): {}", remote.display(), e)
    })?;

    println!("📄 読み込んだファイル:");
    println!(
        "  • {} ({}件)",
        local.display().to_string().cyan(),
        snapshot.len()
    );
    println!(
        "  • {} ({}アカウント)",
        remote.display().to_string().cyan(),
        cloud.accounts.len()
    );

    let stores = InventoryStores::load(snapshot)?;
    let services = SyncServices::new(config.to_options());
    Ok(InventorySync::new(services, stores, cloud)?)
}

pub async fn save_inventory(sync: &InventorySync, out: &Path) -> anyhow::Result<()> {
    let snapshot = sync.stores().snapshot();
    snapshot.save_file(out).await?;
    println!(
        "{} {} ({}件)",
        "✓ 書き出しました:".green(),
        out.display().to_string().cyan(),
        snapshot.len()
    );
    Ok(())
}

fn count(n: usize, color: fn(&str) -> colored::ColoredString) -> colored::ColoredString {
    let text = n.to_string();
    if n == 0 { text.dimmed() } else { color(&text) }
}

fn errors(result: &SyncResult) -> usize {
    result.add_errors + result.update_errors + result.delete_errors + result.failures().len()
}

/// リソース種別ごとの同期結果を表示
pub fn print_results(results: &SyncResultSet) {
    println!();
    if results.is_empty() {
        println!("{}", "同期対象はありませんでした".dimmed());
        return;
    }

    println!(
        "{}",
        format!(
            "{:<28} {:>6} {:>6} {:>6} {:>6} {:>6} {:>10} {:>10}",
            "KIND", "ADDED", "UPDATE", "REMOVE", "FLAG", "ERROR", "REQUEST", "STORE"
        )
        .bold()
    );
    println!("{}", "─".repeat(86).dimmed());

    for (keyword, stats) in results.iter() {
        let result = &stats.result;
        println!(
            "{:<28} {:>6} {:>6} {:>6} {:>6} {:>6} {:>8}ms {:>8}ms",
            keyword.cyan(),
            count(result.added, |s| s.green()),
            count(result.updated, |s| s.blue()),
            count(result.deleted, |s| s.yellow()),
            count(result.flagged, |s| s.magenta()),
            count(errors(result), |s| s.red().bold()),
            stats.request_cost.as_millis(),
            stats.store_cost.as_millis(),
        );
        if let Some(err) = result.first_error() {
            println!("  {} {}", "⚠".yellow(), err.to_string().red());
        }
    }

    let total = results.total();
    println!("{}", "─".repeat(86).dimmed());
    println!("{} {}", "合計:".bold(), total.summary());
}
