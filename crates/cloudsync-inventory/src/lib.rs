//! # CloudSync Inventory
//!
//! Resource families reconciled by the `cloudsync` engine, wired into one
//! tree per provider account:
//!
//! ```text
//! cloudregion
//!  ├── zone ── storage ── disk
//!  ├── loadbalancer
//!  │    ├── loadbalancerbackendgroup ── loadbalancerbackend
//!  │    └── loadbalancerlistener ────── loadbalancerlistenerrule
//!  ├── dbinstance
//!  ├── nat_sku
//!  └── waf_instance ── waf_rule
//! ```
//!
//! [`InventorySync`] builds the orchestrators and the registry for that
//! tree over in-memory stores; [`LocalInventory`] persists the stores as a
//! JSON snapshot and [`RemoteCloud`] stands in for the provider APIs.

mod macros;

pub mod account;
pub mod dbinstance;
pub mod error;
pub mod inventory;
pub mod loadbalancer;
pub mod natsku;
pub mod region;
pub mod storage;
pub mod waf;
pub mod zone;

pub use account::ProviderAccount;
pub use error::{InventoryError, Result};
pub use inventory::{
    CloudRegionLister, InventoryStores, InventorySync, LocalInventory, RegionChildLister,
    RemoteAccount, RemoteCloud,
};

use cloudsync::{LocalStore, Record, ResourceMeta, Scope};

/// Number of local records whose parent is `parent`
pub(crate) async fn child_count<T: Record>(
    store: &dyn LocalStore<T>,
    parent: &ResourceMeta,
) -> cloudsync::Result<usize> {
    Ok(store.query(&Scope::child_of(parent)).await?.len())
}
