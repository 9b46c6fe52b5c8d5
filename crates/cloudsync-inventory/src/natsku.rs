//! NAT gateway SKUs
//!
//! SKUs are virtual: the provider reports no id, so they are matched on the
//! region, the SKU name and the zones it is offered in.

use crate::macros::{impl_record, impl_remote_record};
use cloudsync::{
    Deletable, FieldMapper, RemoteMeta, ResourceKind, ResourceMeta, Result, Scope, SyncKey,
    composite_key,
};
use serde::{Deserialize, Serialize};

pub const KEYWORD: &str = "nat_sku";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NatSku {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    /// Provider SKU name; the record name may differ after name generation
    pub sku_name: String,
    /// Sorted zone names
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub max_connections: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteNatSku {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub max_connections: u64,
}

impl_record!(NatSku);
impl_remote_record!(RemoteNatSku);

fn zone_list(zones: &[String]) -> String {
    let mut zones = zones.to_vec();
    zones.sort();
    zones.join(",")
}

impl SyncKey for NatSku {
    fn sync_key(&self, scope: &Scope) -> String {
        composite_key(&scope.parent_id, [self.sku_name.clone(), zone_list(&self.zones)])
    }
}

impl SyncKey for RemoteNatSku {
    fn sync_key(&self, scope: &Scope) -> String {
        composite_key(&scope.parent_id, [self.meta.name.clone(), zone_list(&self.zones)])
    }
}

#[derive(Debug, Default)]
pub struct NatSkuKind;

impl ResourceKind for NatSkuKind {
    type Local = NatSku;
    type Remote = RemoteNatSku;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

impl FieldMapper for NatSkuKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteNatSku) -> Result<NatSku> {
        let mut zones = remote.zones.clone();
        zones.sort();
        Ok(NatSku {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            sku_name: remote.meta.name.clone(),
            zones,
            max_connections: remote.max_connections,
        })
    }

    fn map_fields(&self, local: &mut NatSku, remote: &RemoteNatSku) {
        local.max_connections = remote.max_connections;
    }
}

impl Deletable for NatSkuKind {}
