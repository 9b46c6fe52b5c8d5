//! Load balancer backends

use crate::macros::{impl_record, impl_remote_record};
use cloudsync::{
    Deletable, FieldMapper, RemoteMeta, ResourceKind, ResourceMeta, Result, Scope, SyncKey,
    global_or_composite,
};
use serde::{Deserialize, Serialize};

pub const KEYWORD: &str = "loadbalancerbackend";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backend {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub weight: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteBackend {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub weight: u32,
}

impl RemoteBackend {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            meta: RemoteMeta::default(),
            address: address.into(),
            port,
            weight: 100,
        }
    }
}

impl_record!(Backend);
impl_remote_record!(RemoteBackend);

// Some vendors report backends without ids; address and port identify them then.
impl SyncKey for Backend {
    fn sync_key(&self, scope: &Scope) -> String {
        global_or_composite(
            &self.meta.external_id,
            &scope.parent_id,
            [self.address.clone(), self.port.to_string()],
        )
    }
}

impl SyncKey for RemoteBackend {
    fn sync_key(&self, scope: &Scope) -> String {
        global_or_composite(
            &self.meta.global_id,
            &scope.parent_id,
            [self.address.clone(), self.port.to_string()],
        )
    }
}

#[derive(Debug, Default)]
pub struct BackendKind;

impl ResourceKind for BackendKind {
    type Local = Backend;
    type Remote = RemoteBackend;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

impl FieldMapper for BackendKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteBackend) -> Result<Backend> {
        Ok(Backend {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            address: remote.address.clone(),
            port: remote.port,
            weight: remote.weight,
        })
    }

    fn map_fields(&self, local: &mut Backend, remote: &RemoteBackend) {
        local.weight = remote.weight;
    }
}

impl Deletable for BackendKind {}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsync::Vendor;

    #[test]
    fn test_backend_without_id_matches_on_address() {
        let scope = Scope::new("acc", "bg-1", Vendor::Qcloud);
        let remote = RemoteBackend::new("10.0.0.5", 8080);
        let local = BackendKind.new_local(&scope, &remote).unwrap();

        assert_eq!(remote.sync_key(&scope), "bg-1|10.0.0.5|8080");
        assert_eq!(local.sync_key(&scope), remote.sync_key(&scope));
    }
}
