//! Inventory wiring: stores, snapshots, provider state and the sync tree

use crate::account::ProviderAccount;
use crate::dbinstance::{DbInstance, DbInstanceKind, RemoteDbInstance};
use crate::error::{InventoryError, Result};
use crate::loadbalancer::backend::{Backend, BackendKind};
use crate::loadbalancer::backend_group::{BackendGroup, BackendGroupKind};
use crate::loadbalancer::listener::{Listener, ListenerKind};
use crate::loadbalancer::rule::{ListenerRule, ListenerRuleKind};
use crate::loadbalancer::vendor::backend_group_listers;
use crate::loadbalancer::{Loadbalancer, LoadbalancerChildren, LoadbalancerKind, RemoteLoadbalancer};
use crate::natsku::{NatSku, NatSkuKind, RemoteNatSku};
use crate::region::{self, Region, RegionKind, RemoteRegion};
use crate::storage::{Disk, DiskKind, Storage, StorageKind};
use crate::waf::{RemoteWafInstance, WafInstance, WafInstanceKind, WafRule, WafRuleKind};
use crate::zone::{RemoteZone, Zone, ZoneKind};
use async_trait::async_trait;
use cloudsync::{
    Cascade, ChildLister, ChildSync, Deletable, FieldMapper, LocalStore, MemoryStore, Record,
    RegisteredSync, RemoteLister, ResourceKind, Scope, ScopeDriver, ScopeJob, SyncContext,
    SyncError, SyncOrchestrator, SyncRegistry, SyncResult, SyncServices,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Serialized form of every local store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalInventory {
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub storages: Vec<Storage>,
    #[serde(default)]
    pub disks: Vec<Disk>,
    #[serde(default)]
    pub loadbalancers: Vec<Loadbalancer>,
    #[serde(default)]
    pub backend_groups: Vec<BackendGroup>,
    #[serde(default)]
    pub backends: Vec<Backend>,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    #[serde(default)]
    pub listener_rules: Vec<ListenerRule>,
    #[serde(default)]
    pub dbinstances: Vec<DbInstance>,
    #[serde(default)]
    pub nat_skus: Vec<NatSku>,
    #[serde(default)]
    pub waf_instances: Vec<WafInstance>,
    #[serde(default)]
    pub waf_rules: Vec<WafRule>,
}

impl LocalInventory {
    /// Read a snapshot; a missing file is an empty inventory
    pub async fn load_file(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            tracing::debug!(path = %path.display(), "No inventory snapshot, starting empty");
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn save_file(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        tracing::debug!(path = %path.display(), "Saved inventory snapshot");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
            + self.zones.len()
            + self.storages.len()
            + self.disks.len()
            + self.loadbalancers.len()
            + self.backend_groups.len()
            + self.backends.len()
            + self.listeners.len()
            + self.listener_rules.len()
            + self.dbinstances.len()
            + self.nat_skus.len()
            + self.waf_instances.len()
            + self.waf_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One in-memory store per resource family
#[derive(Clone, Default)]
pub struct InventoryStores {
    pub regions: Arc<MemoryStore<Region>>,
    pub zones: Arc<MemoryStore<Zone>>,
    pub storages: Arc<MemoryStore<Storage>>,
    pub disks: Arc<MemoryStore<Disk>>,
    pub loadbalancers: Arc<MemoryStore<Loadbalancer>>,
    pub backend_groups: Arc<MemoryStore<BackendGroup>>,
    pub backends: Arc<MemoryStore<Backend>>,
    pub listeners: Arc<MemoryStore<Listener>>,
    pub listener_rules: Arc<MemoryStore<ListenerRule>>,
    pub dbinstances: Arc<MemoryStore<DbInstance>>,
    pub nat_skus: Arc<MemoryStore<NatSku>>,
    pub waf_instances: Arc<MemoryStore<WafInstance>>,
    pub waf_rules: Arc<MemoryStore<WafRule>>,
}

impl InventoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores holding a snapshot; duplicate ids, external ids or names are rejected
    pub fn load(snapshot: LocalInventory) -> Result<Self> {
        Ok(Self {
            regions: Arc::new(MemoryStore::load(snapshot.regions)?),
            zones: Arc::new(MemoryStore::load(snapshot.zones)?),
            storages: Arc::new(MemoryStore::load(snapshot.storages)?),
            disks: Arc::new(MemoryStore::load(snapshot.disks)?),
            loadbalancers: Arc::new(MemoryStore::load(snapshot.loadbalancers)?),
            backend_groups: Arc::new(MemoryStore::load(snapshot.backend_groups)?),
            backends: Arc::new(MemoryStore::load(snapshot.backends)?),
            listeners: Arc::new(MemoryStore::load(snapshot.listeners)?),
            listener_rules: Arc::new(MemoryStore::load(snapshot.listener_rules)?),
            dbinstances: Arc::new(MemoryStore::load(snapshot.dbinstances)?),
            nat_skus: Arc::new(MemoryStore::load(snapshot.nat_skus)?),
            waf_instances: Arc::new(MemoryStore::load(snapshot.waf_instances)?),
            waf_rules: Arc::new(MemoryStore::load(snapshot.waf_rules)?),
        })
    }

    pub fn snapshot(&self) -> LocalInventory {
        LocalInventory {
            regions: self.regions.snapshot(),
            zones: self.zones.snapshot(),
            storages: self.storages.snapshot(),
            disks: self.disks.snapshot(),
            loadbalancers: self.loadbalancers.snapshot(),
            backend_groups: self.backend_groups.snapshot(),
            backends: self.backends.snapshot(),
            listeners: self.listeners.snapshot(),
            listener_rules: self.listener_rules.snapshot(),
            dbinstances: self.dbinstances.snapshot(),
            nat_skus: self.nat_skus.snapshot(),
            waf_instances: self.waf_instances.snapshot(),
            waf_rules: self.waf_rules.snapshot(),
        }
    }
}

/// Provider state of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAccount {
    #[serde(flatten)]
    pub account: ProviderAccount,
    #[serde(default)]
    pub regions: Vec<RemoteRegion>,
}

/// Provider state of every configured account, as the vendor APIs would list it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteCloud {
    #[serde(default)]
    pub accounts: Vec<RemoteAccount>,
}

impl RemoteCloud {
    pub async fn load_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn account(&self, id: &str) -> Option<&RemoteAccount> {
        self.accounts.iter().find(|a| a.account.id == id)
    }

    pub fn region(&self, account_id: &str, region_ext_id: &str) -> Option<&RemoteRegion> {
        self.account(account_id)?
            .regions
            .iter()
            .find(|r| r.meta.global_id == region_ext_id)
    }
}

type SharedCloud = Arc<RwLock<RemoteCloud>>;

/// Lists the regions of the scope's provider account
pub struct CloudRegionLister {
    cloud: SharedCloud,
}

#[async_trait]
impl RemoteLister<RemoteRegion> for CloudRegionLister {
    async fn list(&self, scope: &Scope) -> cloudsync::Result<Vec<RemoteRegion>> {
        let cloud = self.cloud.read().await;
        let account = cloud
            .account(&scope.manager_id)
            .ok_or_else(|| SyncError::NotFound(format!("account {}", scope.manager_id)))?;
        Ok(account.regions.clone())
    }
}

/// Lists one collection of the region a scope's parent id points at.
///
/// Used for direct resyncs of region children; cascades read the same
/// collection from the remote region handle instead.
pub struct RegionChildLister<C> {
    cloud: SharedCloud,
    regions: Arc<dyn LocalStore<Region>>,
    select: fn(&RemoteRegion) -> Vec<C>,
}

impl<C> RegionChildLister<C> {
    fn new(cloud: SharedCloud, regions: Arc<dyn LocalStore<Region>>, select: fn(&RemoteRegion) -> Vec<C>) -> Self {
        Self {
            cloud,
            regions,
            select,
        }
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> RemoteLister<C> for RegionChildLister<C> {
    async fn list(&self, scope: &Scope) -> cloudsync::Result<Vec<C>> {
        let region = self.regions.fetch_by_id(&scope.parent_id).await?;
        let cloud = self.cloud.read().await;
        let remote = cloud
            .region(&scope.manager_id, region.external_id())
            .ok_or_else(|| SyncError::NotFound(format!("region {}", region.external_id())))?;
        Ok((self.select)(remote))
    }
}

fn store<T: Record>(store: &Arc<MemoryStore<T>>) -> Arc<dyn LocalStore<T>> {
    store.clone()
}

/// Cascade into `orchestrator`, reading children off the parent's remote handle
fn cascade<P, C>(
    orchestrator: Arc<SyncOrchestrator<C>>,
    select: fn(&P::Remote) -> Vec<C::Remote>,
) -> Arc<dyn Cascade<P>>
where
    P: ResourceKind,
    C: FieldMapper + Deletable,
{
    let lister: Arc<dyn ChildLister<P::Remote, C::Remote>> =
        Arc::new(move |parent: &P::Remote| -> cloudsync::Result<Vec<C::Remote>> { Ok(select(parent)) });
    Arc::new(ChildSync::<P, C>::new(orchestrator, lister))
}

/// The full sync tree of the inventory plus its registry
pub struct InventorySync {
    stores: InventoryStores,
    cloud: SharedCloud,
    registry: Arc<SyncRegistry>,
}

impl InventorySync {
    pub fn new(services: SyncServices, stores: InventoryStores, cloud: RemoteCloud) -> Result<Self> {
        let cloud = Arc::new(RwLock::new(cloud));
        let s = &stores;

        let disks = Arc::new(SyncOrchestrator::new(Arc::new(DiskKind), store(&s.disks), services.clone()));
        let storages = Arc::new(
            SyncOrchestrator::new(
                Arc::new(StorageKind::new(store(&s.disks))),
                store(&s.storages),
                services.clone(),
            )
            .with_child(cascade::<StorageKind, DiskKind>(disks, |st| st.disks.clone())),
        );
        let zones = Arc::new(
            SyncOrchestrator::new(
                Arc::new(ZoneKind::new(store(&s.storages))),
                store(&s.zones),
                services.clone(),
            )
            .with_child(cascade::<ZoneKind, StorageKind>(storages, |z| z.storages.clone())),
        );

        let backends = Arc::new(SyncOrchestrator::new(
            Arc::new(BackendKind),
            store(&s.backends),
            services.clone(),
        ));
        let backend_groups = Arc::new(
            SyncOrchestrator::new(
                Arc::new(BackendGroupKind::new(
                    store(&s.loadbalancers),
                    store(&s.listeners),
                    store(&s.listener_rules),
                    store(&s.backends),
                    services.clone(),
                )),
                store(&s.backend_groups),
                services.clone(),
            )
            .with_child(cascade::<BackendGroupKind, BackendKind>(backends, |g| g.backends.clone())),
        );
        let rules = Arc::new(SyncOrchestrator::new(
            Arc::new(ListenerRuleKind::new(
                store(&s.listener_rules),
                store(&s.listeners),
                store(&s.backend_groups),
                services.clone(),
            )),
            store(&s.listener_rules),
            services.clone(),
        ));
        let listeners = Arc::new(
            SyncOrchestrator::new(
                Arc::new(ListenerKind::new(
                    store(&s.listeners),
                    store(&s.backend_groups),
                    services.clone(),
                )),
                store(&s.listeners),
                services.clone(),
            )
            .with_child(cascade::<ListenerKind, ListenerRuleKind>(rules, |l| l.rules.clone())),
        );
        // groups first: listeners and rules resolve the group they forward to
        let loadbalancers = Arc::new(
            SyncOrchestrator::new(
                Arc::new(LoadbalancerKind::new(LoadbalancerChildren {
                    listeners: store(&s.listeners),
                    rules: store(&s.listener_rules),
                    backend_groups: store(&s.backend_groups),
                    backends: store(&s.backends),
                })),
                store(&s.loadbalancers),
                services.clone(),
            )
            .with_child(Arc::new(ChildSync::<LoadbalancerKind, BackendGroupKind>::per_vendor(
                backend_groups,
                backend_group_listers(),
            )))
            .with_child(cascade::<LoadbalancerKind, ListenerKind>(listeners, |lb| lb.listeners.clone())),
        );

        let dbinstances = Arc::new(SyncOrchestrator::new(
            Arc::new(DbInstanceKind),
            store(&s.dbinstances),
            services.clone(),
        ));
        let nat_skus = Arc::new(SyncOrchestrator::new(
            Arc::new(NatSkuKind),
            store(&s.nat_skus),
            services.clone(),
        ));
        let waf_rules = Arc::new(SyncOrchestrator::new(
            Arc::new(WafRuleKind),
            store(&s.waf_rules),
            services.clone(),
        ));
        let waf_instances = Arc::new(
            SyncOrchestrator::new(Arc::new(WafInstanceKind), store(&s.waf_instances), services.clone())
                .with_child(cascade::<WafInstanceKind, WafRuleKind>(waf_rules, |w| w.rules.clone())),
        );

        let regions = Arc::new(
            SyncOrchestrator::new(
                Arc::new(RegionKind::new(store(&s.zones))),
                store(&s.regions),
                services,
            )
            .with_child(cascade::<RegionKind, ZoneKind>(zones.clone(), |r| r.zones.clone()))
            .with_child(cascade::<RegionKind, LoadbalancerKind>(loadbalancers.clone(), |r| {
                r.loadbalancers.clone()
            }))
            .with_child(cascade::<RegionKind, DbInstanceKind>(dbinstances.clone(), |r| {
                r.dbinstances.clone()
            }))
            .with_child(cascade::<RegionKind, NatSkuKind>(nat_skus.clone(), |r| r.nat_skus.clone()))
            .with_child(cascade::<RegionKind, WafInstanceKind>(waf_instances.clone(), |r| {
                r.waf_instances.clone()
            })),
        );

        let region_store = store(&s.regions);
        let mut registry = SyncRegistry::new();
        registry.register(Arc::new(RegisteredSync::new(
            regions,
            Arc::new(CloudRegionLister { cloud: cloud.clone() }),
        )))?;
        registry.register(Arc::new(
            RegisteredSync::new(
                zones,
                Arc::new(RegionChildLister::<RemoteZone>::new(
                    cloud.clone(),
                    region_store.clone(),
                    |r| r.zones.clone(),
                )),
            )
            .under_parent(region::KEYWORD),
        ))?;
        registry.register(Arc::new(
            RegisteredSync::new(
                loadbalancers,
                Arc::new(RegionChildLister::<RemoteLoadbalancer>::new(
                    cloud.clone(),
                    region_store.clone(),
                    |r| r.loadbalancers.clone(),
                )),
            )
            .under_parent(region::KEYWORD),
        ))?;
        registry.register(Arc::new(
            RegisteredSync::new(
                dbinstances,
                Arc::new(RegionChildLister::<RemoteDbInstance>::new(
                    cloud.clone(),
                    region_store.clone(),
                    |r| r.dbinstances.clone(),
                )),
            )
            .under_parent(region::KEYWORD),
        ))?;
        registry.register(Arc::new(
            RegisteredSync::new(
                nat_skus,
                Arc::new(RegionChildLister::<RemoteNatSku>::new(
                    cloud.clone(),
                    region_store.clone(),
                    |r| r.nat_skus.clone(),
                )),
            )
            .under_parent(region::KEYWORD),
        ))?;
        registry.register(Arc::new(
            RegisteredSync::new(
                waf_instances,
                Arc::new(RegionChildLister::<RemoteWafInstance>::new(
                    cloud.clone(),
                    region_store,
                    |r| r.waf_instances.clone(),
                )),
            )
            .under_parent(region::KEYWORD),
        ))?;

        Ok(Self {
            stores,
            cloud,
            registry: Arc::new(registry),
        })
    }

    pub fn stores(&self) -> &InventoryStores {
        &self.stores
    }

    pub fn registry(&self) -> &Arc<SyncRegistry> {
        &self.registry
    }

    /// Swap in freshly listed provider state for the next passes
    pub async fn replace_cloud(&self, cloud: RemoteCloud) {
        *self.cloud.write().await = cloud;
    }

    pub async fn accounts(&self) -> Vec<ProviderAccount> {
        self.cloud
            .read()
            .await
            .accounts
            .iter()
            .map(|a| a.account.clone())
            .collect()
    }

    /// Reconcile every region of one account, cascading down the tree
    pub async fn sync_account(&self, ctx: &SyncContext, account_id: &str) -> Result<SyncResult> {
        let account = self
            .accounts()
            .await
            .into_iter()
            .find(|a| a.id == account_id)
            .ok_or_else(|| InventoryError::UnknownAccount(account_id.to_string()))?;

        Ok(self.registry.resync(ctx, region::KEYWORD, &account.scope()).await?)
    }

    /// Reconcile all accounts, at most `max_concurrent` at a time
    pub async fn sync_all(&self, ctx: &SyncContext, max_concurrent: usize) -> Vec<(ScopeJob, SyncResult)> {
        let jobs = self
            .accounts()
            .await
            .iter()
            .map(|a| ScopeJob::new(region::KEYWORD, a.scope()))
            .collect();

        ScopeDriver::new(self.registry.clone(), max_concurrent)
            .run(ctx, jobs)
            .await
    }

    /// Direct resync of one registered kind within `scope`
    pub async fn resync(&self, ctx: &SyncContext, keyword: &str, scope: &Scope) -> Result<SyncResult> {
        Ok(self.registry.resync(ctx, keyword, scope).await?)
    }
}
