use crate::utils;
use cloudsync::{Record, Scope, SyncContext};
use cloudsync_config::SyncConfig;
use cloudsync_inventory::region;
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    config: &SyncConfig,
    keyword: &str,
    account: &str,
    region_id: Option<&str>,
    local: &Path,
    remote: &Path,
    out: &Path,
) -> anyhow::Result<()> {
    let sync = utils::load_inventory(config, local, remote).await?;

    if sync.registry().get(keyword).is_none() {
        anyhow::bail!(
            "リソース種別 '{}' は登録されていません\n利用可能な種別: {}",
            keyword,
            sync.registry().keywords().join(", ")
        );
    }

    let provider = sync
        .accounts()
        .await
        .into_iter()
        .find(|a| a.id == account)
        .ok_or_else(|| anyhow::anyhow!("アカウント '{}' が見つかりません", account))?;

    let scope = if keyword == region::KEYWORD {
        provider.scope()
    } else {
        let wanted = region_id.ok_or_else(|| {
            anyhow::anyhow!("{} の再同期には --region の指定が必要です", keyword)
        })?;
        let record = sync
            .stores()
            .regions
            .find(|r| r.meta.manager_id == provider.id && (r.id() == wanted || r.external_id() == wanted))
            .ok_or_else(|| anyhow::anyhow!("リージョン '{}' がローカルインベントリにありません", wanted))?;
        Scope::child_of(&record.meta)
    };

    println!("{} {} ({})", "再同期:".blue(), keyword.cyan(), scope);

    let ctx = SyncContext::new("cloudsync-cli");
    let result = sync.resync(&ctx, keyword, &scope).await?;
    utils::print_results(&ctx.results());
    utils::save_inventory(&sync, out).await?;

    if result.is_failed() {
        anyhow::bail!("再同期に失敗しました: {}", result);
    }
    println!("{}", "✓ 再同期が完了しました".green().bold());
    Ok(())
}
