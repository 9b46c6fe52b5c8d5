use cloudsync::SyncServices;
use cloudsync_config::SyncConfig;
use cloudsync_inventory::{InventoryStores, InventorySync, RemoteCloud};
use colored::Colorize;

/// 直接再同期できる種別と、カスケードで同期される種別の一覧
const TREE: &str = "\
cloudregion
 ├── zone ── storage ── disk
 ├── loadbalancer
 │    ├── loadbalancerbackendgroup ── loadbalancerbackend
 │    └── loadbalancerlistener ────── loadbalancerlistenerrule
 ├── dbinstance
 ├── nat_sku
 └── waf_instance ── waf_rule";

pub fn handle(config: &SyncConfig) -> anyhow::Result<()> {
    let sync = InventorySync::new(
        SyncServices::new(config.to_options()),
        InventoryStores::new(),
        RemoteCloud::default(),
    )?;

    println!("{}", "再同期できるリソース種別:".bold());
    for keyword in sync.registry().keywords() {
        println!("  • {}", keyword.cyan());
    }
    println!();
    println!("{}", "同期ツリー:".bold());
    for line in TREE.lines() {
        println!("  {}", line.dimmed());
    }
    Ok(())
}
