//! Cloud regions, the root of every account's resource tree

use crate::dbinstance::RemoteDbInstance;
use crate::loadbalancer::RemoteLoadbalancer;
use crate::macros::{impl_external_key, impl_record, impl_remote_record};
use crate::natsku::RemoteNatSku;
use crate::waf::RemoteWafInstance;
use crate::zone::{RemoteZone, Zone};
use async_trait::async_trait;
use cloudsync::{
    Deletable, FieldMapper, LocalStore, RemoteMeta, ResourceKind, ResourceMeta, Result, Scope,
    SyncContext, SyncError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KEYWORD: &str = "cloudregion";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub city: String,
}

/// A provider region together with everything listed inside it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteRegion {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub zones: Vec<RemoteZone>,
    #[serde(default)]
    pub loadbalancers: Vec<RemoteLoadbalancer>,
    #[serde(default)]
    pub dbinstances: Vec<RemoteDbInstance>,
    #[serde(default)]
    pub nat_skus: Vec<RemoteNatSku>,
    #[serde(default)]
    pub waf_instances: Vec<RemoteWafInstance>,
}

impl_record!(Region);
impl_remote_record!(RemoteRegion);
impl_external_key!(Region, RemoteRegion);

/// Regions that still contain zones are flagged, never deleted
pub struct RegionKind {
    zones: Arc<dyn LocalStore<Zone>>,
}

impl RegionKind {
    pub fn new(zones: Arc<dyn LocalStore<Zone>>) -> Self {
        Self { zones }
    }
}

impl ResourceKind for RegionKind {
    type Local = Region;
    type Remote = RemoteRegion;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

#[async_trait]
impl FieldMapper for RegionKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteRegion) -> Result<Region> {
        Ok(Region {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            city: remote.city.clone(),
        })
    }

    fn map_fields(&self, local: &mut Region, remote: &RemoteRegion) {
        local.city = remote.city.clone();
    }
}

#[async_trait]
impl Deletable for RegionKind {
    async fn validate_delete(&self, _ctx: &SyncContext, local: &Region) -> Result<()> {
        let zones = crate::child_count(self.zones.as_ref(), &local.meta).await?;
        if zones > 0 {
            return Err(SyncError::ConstraintViolation(format!(
                "region {} still has {} zones",
                local.meta.name, zones
            )));
        }
        Ok(())
    }
}
