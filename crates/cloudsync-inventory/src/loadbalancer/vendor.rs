//! Per-vendor backend group listing
//!
//! Vendors disagree on what a load balancer's backend groups are:
//!
//! - generic and OpenStack: every pool reported for the load balancer
//! - Huawei: only pools attached to the load balancer, a listener or a rule
//! - AWS: only target groups referenced by a listener or a rule
//! - Qcloud: backends hang off listeners and rules directly, so one group
//!   without provider id is synthesised per listener/rule

use super::RemoteLoadbalancer;
use super::backend_group::RemoteBackendGroup;
use cloudsync::{ChildLister, RemoteMeta, Result, Vendor, VendorTable};
use std::collections::HashSet;
use std::sync::Arc;

pub type BackendGroupLister = Arc<dyn ChildLister<RemoteLoadbalancer, RemoteBackendGroup>>;

pub fn backend_group_listers() -> VendorTable<BackendGroupLister> {
    VendorTable::uniform(Arc::new(all_groups) as BackendGroupLister)
        .with(Vendor::Openstack, Arc::new(all_groups))
        .with(Vendor::Huawei, Arc::new(attached_pools))
        .with(Vendor::Aws, Arc::new(referenced_target_groups))
        .with(Vendor::Qcloud, Arc::new(listener_groups))
}

fn with_default(lb: &RemoteLoadbalancer, mut group: RemoteBackendGroup) -> RemoteBackendGroup {
    if !lb.backend_group_id.is_empty() && group.meta.global_id == lb.backend_group_id {
        group.is_default = true;
    }
    group
}

fn filtered(lb: &RemoteLoadbalancer, referenced: &HashSet<&str>) -> Vec<RemoteBackendGroup> {
    lb.backend_groups
        .iter()
        .filter(|g| referenced.contains(g.meta.global_id.as_str()))
        .map(|g| with_default(lb, g.clone()))
        .collect()
}

fn listener_references(lb: &RemoteLoadbalancer) -> HashSet<&str> {
    lb.listeners
        .iter()
        .flat_map(|l| {
            std::iter::once(l.backend_group_id.as_str())
                .chain(l.rules.iter().map(|r| r.backend_group_id.as_str()))
        })
        .filter(|id| !id.is_empty())
        .collect()
}

fn all_groups(lb: &RemoteLoadbalancer) -> Result<Vec<RemoteBackendGroup>> {
    Ok(lb
        .backend_groups
        .iter()
        .map(|g| with_default(lb, g.clone()))
        .collect())
}

fn attached_pools(lb: &RemoteLoadbalancer) -> Result<Vec<RemoteBackendGroup>> {
    let mut referenced = listener_references(lb);
    if !lb.backend_group_id.is_empty() {
        referenced.insert(lb.backend_group_id.as_str());
    }
    Ok(filtered(lb, &referenced))
}

fn referenced_target_groups(lb: &RemoteLoadbalancer) -> Result<Vec<RemoteBackendGroup>> {
    Ok(filtered(lb, &listener_references(lb)))
}

fn listener_groups(lb: &RemoteLoadbalancer) -> Result<Vec<RemoteBackendGroup>> {
    let mut groups: Vec<RemoteBackendGroup> = lb
        .backend_groups
        .iter()
        .map(|g| with_default(lb, g.clone()))
        .collect();

    for listener in &lb.listeners {
        if !listener.backends.is_empty() {
            groups.push(RemoteBackendGroup {
                meta: RemoteMeta::new("", listener.meta.name.clone())
                    .with_status(listener.meta.status.clone()),
                group_type: "listener".to_string(),
                is_default: false,
                listener_id: listener.meta.global_id.clone(),
                rule_id: String::new(),
                backends: listener.backends.clone(),
            });
        }
        for rule in listener.rules.iter().filter(|r| !r.backends.is_empty()) {
            groups.push(RemoteBackendGroup {
                meta: RemoteMeta::new("", rule.meta.name.clone())
                    .with_status(rule.meta.status.clone()),
                group_type: "rule".to_string(),
                is_default: false,
                listener_id: listener.meta.global_id.clone(),
                rule_id: rule.meta.global_id.clone(),
                backends: rule.backends.clone(),
            });
        }
    }
    Ok(groups)
}
