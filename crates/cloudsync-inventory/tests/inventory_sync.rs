use cloudsync::{
    QueuedTasks, Record, RecordingEventSink, RemoteMeta, Scope, SyncContext, SyncEvent,
    SyncOptions, SyncServices, Vendor,
};
use cloudsync_inventory::dbinstance::RemoteDbInstance;
use cloudsync_inventory::loadbalancer::RemoteLoadbalancer;
use cloudsync_inventory::loadbalancer::backend::RemoteBackend;
use cloudsync_inventory::loadbalancer::backend_group::RemoteBackendGroup;
use cloudsync_inventory::loadbalancer::listener::RemoteListener;
use cloudsync_inventory::loadbalancer::rule::RemoteListenerRule;
use cloudsync_inventory::natsku::RemoteNatSku;
use cloudsync_inventory::region::RemoteRegion;
use cloudsync_inventory::storage::{RemoteDisk, RemoteStorage};
use cloudsync_inventory::waf::{RemoteWafInstance, RemoteWafRule};
use cloudsync_inventory::zone::RemoteZone;
use cloudsync_inventory::{
    InventoryError, InventoryStores, InventorySync, LocalInventory, ProviderAccount, RemoteAccount,
    RemoteCloud,
};
use std::sync::Arc;

fn lb() -> RemoteLoadbalancer {
    RemoteLoadbalancer {
        meta: RemoteMeta::new("lb-1", "web").with_status("running"),
        address: "10.0.0.10".to_string(),
        network_type: "vpc".to_string(),
        backend_group_id: "bg-1".to_string(),
        backend_groups: vec![RemoteBackendGroup {
            meta: RemoteMeta::new("bg-1", "web-pool"),
            group_type: "normal".to_string(),
            backends: vec![RemoteBackend::new("10.0.1.1", 8080)],
            ..Default::default()
        }],
        listeners: vec![RemoteListener {
            meta: RemoteMeta::new("lis-1", "http"),
            protocol: "http".to_string(),
            port: 80,
            backend_group_id: "bg-1".to_string(),
            rules: vec![RemoteListenerRule {
                meta: RemoteMeta::new("rule-1", "api"),
                domain: "example.com".to_string(),
                path: "/api".to_string(),
                backend_group_id: "bg-1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

fn region() -> RemoteRegion {
    RemoteRegion {
        meta: RemoteMeta::new("r-1", "tokyo").with_status("enabled"),
        city: "Tokyo".to_string(),
        zones: vec![RemoteZone {
            meta: RemoteMeta::new("z-1", "tokyo-a").with_status("enabled"),
            storages: vec![RemoteStorage {
                meta: RemoteMeta::new("st-1", "ssd-pool"),
                storage_type: "ssd".to_string(),
                capacity_gb: 1024,
                disks: vec![RemoteDisk {
                    meta: RemoteMeta::new("d-1", "data"),
                    size_gb: 100,
                    disk_type: "data".to_string(),
                }],
            }],
        }],
        loadbalancers: vec![lb()],
        dbinstances: vec![RemoteDbInstance {
            meta: RemoteMeta::new("db-1", "orders").with_status("running"),
            engine: "mysql".to_string(),
            engine_version: "8.0".to_string(),
            instance_type: "db.small".to_string(),
            delete_protection: true,
        }],
        nat_skus: vec![RemoteNatSku {
            meta: RemoteMeta::new("", "nat.s1"),
            zones: vec!["zone-b".to_string(), "zone-a".to_string()],
            max_connections: 10_000,
        }],
        waf_instances: vec![RemoteWafInstance {
            meta: RemoteMeta::new("waf-1", "edge"),
            waf_type: "cloud".to_string(),
            default_action: "allow".to_string(),
            rules: vec![RemoteWafRule {
                meta: RemoteMeta::new("", "block-sqli"),
                priority: 1,
                action: "block".to_string(),
            }],
        }],
    }
}

fn account(vendor: Vendor) -> ProviderAccount {
    ProviderAccount::new("acc-1", "production", vendor)
}

fn cloud(vendor: Vendor, regions: Vec<RemoteRegion>) -> RemoteCloud {
    RemoteCloud {
        accounts: vec![RemoteAccount {
            account: account(vendor),
            regions,
        }],
    }
}

fn services() -> SyncServices {
    SyncServices::new(SyncOptions::default())
}

fn inventory(cloud: RemoteCloud) -> InventorySync {
    InventorySync::new(services(), InventoryStores::new(), cloud).unwrap()
}

#[tokio::test]
async fn test_full_tree_is_created() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();

    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(!result.is_error(), "{}", result);
    assert_eq!(result.added, 13);

    let stores = sync.stores();
    let regions = stores.regions.snapshot();
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].meta.parent_id, "acc-1");
    assert_eq!(regions[0].city, "Tokyo");

    let zones = stores.zones.snapshot();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].meta.parent_id, regions[0].id());

    let storages = stores.storages.snapshot();
    assert_eq!(storages[0].meta.parent_id, zones[0].id());
    assert_eq!(storages[0].capacity_gb, 1024);
    let disks = stores.disks.snapshot();
    assert_eq!(disks[0].meta.parent_id, storages[0].id());

    assert_eq!(stores.dbinstances.len(), 1);
    assert_eq!(stores.nat_skus.len(), 1);
    assert_eq!(stores.waf_instances.len(), 1);
    assert_eq!(stores.waf_rules.len(), 1);

    // every collection was recorded under its keyword
    let recorded = ctx.results();
    for keyword in [
        "cloudregion",
        "zone",
        "storage",
        "disk",
        "loadbalancer",
        "loadbalancerbackendgroup",
        "loadbalancerbackend",
        "loadbalancerlistener",
        "loadbalancerlistenerrule",
        "dbinstance",
        "nat_sku",
        "waf_instance",
        "waf_rule",
    ] {
        assert!(recorded.get(keyword).is_some(), "missing {}", keyword);
    }
}

#[tokio::test]
async fn test_backend_group_links_are_resolved() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    let stores = sync.stores();
    let group = stores.backend_groups.snapshot().remove(0);
    assert!(group.is_default);

    let lb = stores.loadbalancers.snapshot().remove(0);
    assert_eq!(lb.backend_group_id, group.id());
    assert_eq!(group.meta.parent_id, lb.id());

    let listener = stores.listeners.snapshot().remove(0);
    assert_eq!(listener.backend_group_id, group.id());

    let rule = stores.listener_rules.snapshot().remove(0);
    assert_eq!(rule.backend_group_id, group.id());
    assert_eq!(rule.meta.parent_id, listener.id());

    let backend = stores.backends.snapshot().remove(0);
    assert_eq!(backend.meta.parent_id, group.id());
    assert_eq!(backend.port, 8080);
}

#[tokio::test]
async fn test_second_pass_is_noop() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();

    sync.sync_account(&ctx, "acc-1").await.unwrap();
    let before = sync.stores().snapshot();

    let second = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(second.is_noop(), "{}", second);
    assert_eq!(sync.stores().snapshot(), before);
}

#[tokio::test]
async fn test_vanished_loadbalancer_takes_its_children() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    let mut changed = region();
    changed.loadbalancers.clear();
    sync.replace_cloud(cloud(Vendor::Generic, vec![changed])).await;

    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert_eq!(result.deleted, 1, "{}", result);
    assert!(!result.is_error());

    let stores = sync.stores();
    assert!(stores.loadbalancers.is_empty());
    assert!(stores.listeners.is_empty());
    assert!(stores.listener_rules.is_empty());
    assert!(stores.backend_groups.is_empty());
    assert!(stores.backends.is_empty());
}

#[tokio::test]
async fn test_zone_with_storages_is_flagged_once() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    let mut changed = region();
    changed.zones.clear();
    sync.replace_cloud(cloud(Vendor::Generic, vec![changed])).await;

    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert_eq!(result.flagged, 1, "{}", result);
    assert_eq!(result.deleted, 0);

    let zone = sync.stores().zones.snapshot().remove(0);
    assert_eq!(zone.meta.status, "unknown");
    assert_eq!(sync.stores().storages.len(), 1);

    let again = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(again.is_noop(), "{}", again);
}

#[tokio::test]
async fn test_region_with_zones_is_flagged() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    sync.replace_cloud(cloud(Vendor::Generic, vec![])).await;
    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert_eq!(result.flagged, 1, "{}", result);

    let region = sync.stores().regions.snapshot().remove(0);
    assert_eq!(region.meta.status, "unknown");
    assert_eq!(sync.stores().zones.len(), 1);
}

/// Load balancer with a default pool `bg-1` and a pool `bg-2` the listener forwards to
fn two_pool_region() -> RemoteRegion {
    let mut region = region();
    let lb = &mut region.loadbalancers[0];
    lb.backend_groups.push(RemoteBackendGroup {
        meta: RemoteMeta::new("bg-2", "api-pool"),
        group_type: "normal".to_string(),
        backends: vec![RemoteBackend::new("10.0.1.2", 8080)],
        ..Default::default()
    });
    lb.listeners[0].backend_group_id = "bg-2".to_string();
    lb.listeners[0].rules[0].backend_group_id = "bg-2".to_string();
    region
}

#[tokio::test]
async fn test_dropped_default_group_is_deleted() {
    let sync = inventory(cloud(Vendor::Generic, vec![two_pool_region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert_eq!(sync.stores().backend_groups.len(), 2);

    let mut changed = two_pool_region();
    let lb = &mut changed.loadbalancers[0];
    lb.backend_group_id.clear();
    lb.backend_groups.retain(|g| g.meta.global_id != "bg-1");
    sync.replace_cloud(cloud(Vendor::Generic, vec![changed])).await;

    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(!result.is_error(), "{}", result);
    assert_eq!(result.deleted, 1, "{}", result);
    assert_eq!(result.flagged, 0, "{}", result);

    let stores = sync.stores();
    let groups = stores.backend_groups.snapshot();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].meta.external_id, "bg-2");
    assert!(stores.loadbalancers.snapshot()[0].backend_group_id.is_empty());

    // the dropped group's backends went with it
    let backends = stores.backends.snapshot();
    assert_eq!(backends.len(), 1);
    assert_eq!(backends[0].meta.parent_id, groups[0].id());

    let again = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(again.is_noop(), "{}", again);
}

#[tokio::test]
async fn test_flagged_default_group_is_deleted_once_released() {
    let sync = inventory(cloud(Vendor::Generic, vec![two_pool_region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    // bg-1 vanishes while the provider still names it the default
    let mut changed = two_pool_region();
    changed.loadbalancers[0]
        .backend_groups
        .retain(|g| g.meta.global_id != "bg-1");
    sync.replace_cloud(cloud(Vendor::Generic, vec![changed.clone()])).await;

    let flagged = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert_eq!(flagged.flagged, 1, "{}", flagged);

    changed.loadbalancers[0].backend_group_id.clear();
    sync.replace_cloud(cloud(Vendor::Generic, vec![changed])).await;

    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert_eq!(result.deleted, 1, "{}", result);
    assert_eq!(sync.stores().backend_groups.len(), 1);
}

#[tokio::test]
async fn test_listener_retarget_is_logged_as_update() {
    let events = Arc::new(RecordingEventSink::new());
    let sync = InventorySync::new(
        services().with_events(events.clone()),
        InventoryStores::new(),
        cloud(Vendor::Generic, vec![two_pool_region()]),
    )
    .unwrap();
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    let mut changed = two_pool_region();
    changed.loadbalancers[0].listeners[0].backend_group_id = "bg-1".to_string();
    sync.replace_cloud(cloud(Vendor::Generic, vec![changed])).await;
    events.clear();

    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(!result.is_error(), "{}", result);
    assert_eq!(result.updated, 1, "{}", result);

    let stores = sync.stores();
    let listener = stores.listeners.snapshot().remove(0);
    let bg1 = stores
        .backend_groups
        .find(|g| g.meta.external_id == "bg-1")
        .unwrap();
    assert_eq!(listener.backend_group_id, bg1.id());

    let listener_fields: Vec<String> = events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            SyncEvent::Updated { keyword, id, fields }
                if keyword == "loadbalancerlistener" && id == listener.id() =>
            {
                Some(fields)
            }
            _ => None,
        })
        .flatten()
        .collect();
    assert!(listener_fields.contains(&"backend_group_ext_id".to_string()));
    assert!(listener_fields.contains(&"backend_group_id".to_string()));
}

#[tokio::test]
async fn test_protected_dbinstance_is_flagged_not_deleted() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    let mut changed = region();
    changed.dbinstances.clear();
    sync.replace_cloud(cloud(Vendor::Generic, vec![changed])).await;

    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert_eq!(result.flagged, 1, "{}", result);
    assert_eq!(sync.stores().dbinstances.snapshot()[0].meta.status, "unknown");
}

#[tokio::test]
async fn test_unprotected_dbinstance_is_deleted() {
    let mut initial = region();
    initial.dbinstances[0].delete_protection = false;
    let sync = inventory(cloud(Vendor::Generic, vec![initial.clone()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    initial.dbinstances.clear();
    sync.replace_cloud(cloud(Vendor::Generic, vec![initial])).await;

    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert_eq!(result.deleted, 1, "{}", result);
    assert!(sync.stores().dbinstances.is_empty());
}

#[tokio::test]
async fn test_follow_up_tasks_for_new_records() {
    let (tasks, mut rx) = QueuedTasks::new();
    let services = services().with_tasks(Arc::new(tasks));
    let sync = InventorySync::new(
        services,
        InventoryStores::new(),
        cloud(Vendor::Generic, vec![region()]),
    )
    .unwrap();

    sync.sync_account(&SyncContext::default(), "acc-1").await.unwrap();

    let mut names = Vec::new();
    while let Ok(request) = rx.try_recv() {
        names.push(request.name);
    }
    names.sort();
    assert_eq!(names, vec!["DBInstanceSyncTask", "LoadbalancerSyncstatusTask"]);
}

#[tokio::test]
async fn test_nat_skus_match_on_name_and_zones() {
    let mut east = region();
    east.meta = RemoteMeta::new("r-2", "osaka");
    east.zones.clear();
    east.loadbalancers.clear();
    east.dbinstances.clear();
    east.waf_instances.clear();
    let mut west = east.clone();
    west.meta = RemoteMeta::new("r-3", "fukuoka");

    let sync = inventory(cloud(Vendor::Aws, vec![east, west]));
    let ctx = SyncContext::default();
    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert_eq!(result.added, 4, "{}", result);

    let mut names: Vec<String> = sync
        .stores()
        .nat_skus
        .snapshot()
        .into_iter()
        .map(|s| s.meta.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["nat.s1", "nat.s1-1"]);

    // the generated name must not break the match on the next pass
    let second = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(second.is_noop(), "{}", second);
    assert_eq!(sync.stores().nat_skus.len(), 2);
}

#[tokio::test]
async fn test_qcloud_listener_backends_get_a_synthetic_group() {
    let mut region = region();
    region.loadbalancers = vec![RemoteLoadbalancer {
        meta: RemoteMeta::new("lb-q", "edge"),
        listeners: vec![RemoteListener {
            meta: RemoteMeta::new("lis-q", "tcp"),
            protocol: "tcp".to_string(),
            port: 443,
            backends: vec![RemoteBackend::new("10.0.2.1", 443)],
            ..Default::default()
        }],
        ..Default::default()
    }];

    let sync = inventory(cloud(Vendor::Qcloud, vec![region]));
    let ctx = SyncContext::default();
    let result = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(!result.is_error(), "{}", result);

    let stores = sync.stores();
    let groups = stores.backend_groups.snapshot();
    assert_eq!(groups.len(), 1);
    assert!(groups[0].meta.external_id.is_empty());
    assert_eq!(groups[0].listener_ext_id, "lis-q");

    let listener = stores.listeners.snapshot().remove(0);
    assert_eq!(listener.backend_group_id, groups[0].id());
    assert_eq!(stores.backends.snapshot()[0].meta.parent_id, groups[0].id());

    let second = sync.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(second.is_noop(), "{}", second);
}

#[tokio::test]
async fn test_direct_resync_of_region_child() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    let region_record = sync.stores().regions.snapshot().remove(0);
    let scope = Scope::child_of(&region_record.meta);

    let unchanged = sync.resync(&ctx, "loadbalancer", &scope).await.unwrap();
    assert!(unchanged.is_noop(), "{}", unchanged);

    let mut changed = region();
    changed.loadbalancers.clear();
    sync.replace_cloud(cloud(Vendor::Generic, vec![changed])).await;

    let result = sync.resync(&ctx, "loadbalancer", &scope).await.unwrap();
    assert_eq!(result.deleted, 1, "{}", result);
    // only the load balancer collection was touched
    assert_eq!(sync.stores().zones.len(), 1);
}

#[tokio::test]
async fn test_missing_remote_region_fails_child_resync() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    let region_record = sync.stores().regions.snapshot().remove(0);
    sync.replace_cloud(cloud(Vendor::Generic, vec![])).await;

    let result = sync
        .resync(&ctx, "zone", &Scope::child_of(&region_record.meta))
        .await
        .unwrap();
    assert!(result.is_failed());
    assert_eq!(sync.stores().zones.len(), 1);
}

#[tokio::test]
async fn test_unknown_account_and_keyword() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();

    let err = sync.sync_account(&ctx, "nope").await.unwrap_err();
    assert!(matches!(err, InventoryError::UnknownAccount(id) if id == "nope"));

    let scope = account(Vendor::Generic).scope();
    assert!(sync.resync(&ctx, "vpc", &scope).await.is_err());
}

#[tokio::test]
async fn test_sync_all_runs_every_account() {
    let mut cloud = cloud(Vendor::Generic, vec![region()]);
    let mut other = region();
    other.meta = RemoteMeta::new("r-9", "frankfurt");
    cloud.accounts.push(RemoteAccount {
        account: ProviderAccount::new("acc-2", "staging", Vendor::Openstack),
        regions: vec![other],
    });

    let sync = inventory(cloud);
    let results = sync.sync_all(&SyncContext::default(), 2).await;
    assert_eq!(results.len(), 2);
    for (job, result) in &results {
        assert!(!result.is_error(), "{}: {}", job.scope, result);
        assert_eq!(result.added, 13);
    }
    assert_eq!(sync.stores().regions.len(), 2);
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let sync = inventory(cloud(Vendor::Generic, vec![region()]));
    let ctx = SyncContext::default();
    sync.sync_account(&ctx, "acc-1").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("inventory.json");
    let snapshot = sync.stores().snapshot();
    assert_eq!(snapshot.len(), 13);
    snapshot.save_file(&path).await.unwrap();

    let loaded = LocalInventory::load_file(&path).await.unwrap();
    assert_eq!(loaded, snapshot);

    // a restarted process picks up where the last one stopped
    let restarted = InventorySync::new(
        services(),
        InventoryStores::load(loaded).unwrap(),
        cloud(Vendor::Generic, vec![region()]),
    )
    .unwrap();
    let result = restarted.sync_account(&ctx, "acc-1").await.unwrap();
    assert!(result.is_noop(), "{}", result);
}

#[tokio::test]
async fn test_missing_snapshot_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = LocalInventory::load_file(&dir.path().join("none.json"))
        .await
        .unwrap();
    assert!(loaded.is_empty());
}
