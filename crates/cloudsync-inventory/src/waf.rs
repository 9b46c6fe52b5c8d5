//! WAF instances and rules

use crate::macros::{impl_external_key, impl_record, impl_remote_record};
use cloudsync::{
    Deletable, FieldMapper, RemoteMeta, ResourceKind, ResourceMeta, Result, Scope, SyncKey,
    global_or_composite,
};
use serde::{Deserialize, Serialize};

pub const KEYWORD: &str = "waf_instance";
pub const RULE_KEYWORD: &str = "waf_rule";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WafInstance {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub waf_type: String,
    #[serde(default)]
    pub default_action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteWafInstance {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub waf_type: String,
    #[serde(default)]
    pub default_action: String,
    #[serde(default)]
    pub rules: Vec<RemoteWafRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WafRule {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    /// Provider rule name, used as identity when the provider has no rule id
    pub rule_name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteWafRule {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub action: String,
}

impl_record!(WafInstance, WafRule);
impl_remote_record!(RemoteWafInstance, RemoteWafRule);
impl_external_key!(WafInstance, RemoteWafInstance);

impl SyncKey for WafRule {
    fn sync_key(&self, scope: &Scope) -> String {
        global_or_composite(&self.meta.external_id, &scope.parent_id, [&self.rule_name])
    }
}

impl SyncKey for RemoteWafRule {
    fn sync_key(&self, scope: &Scope) -> String {
        global_or_composite(&self.meta.global_id, &scope.parent_id, [&self.meta.name])
    }
}

#[derive(Debug, Default)]
pub struct WafInstanceKind;

impl ResourceKind for WafInstanceKind {
    type Local = WafInstance;
    type Remote = RemoteWafInstance;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

impl FieldMapper for WafInstanceKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteWafInstance) -> Result<WafInstance> {
        Ok(WafInstance {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            waf_type: remote.waf_type.clone(),
            default_action: remote.default_action.clone(),
        })
    }

    fn map_fields(&self, local: &mut WafInstance, remote: &RemoteWafInstance) {
        local.waf_type = remote.waf_type.clone();
        local.default_action = remote.default_action.clone();
    }
}

impl Deletable for WafInstanceKind {}

#[derive(Debug, Default)]
pub struct WafRuleKind;

impl ResourceKind for WafRuleKind {
    type Local = WafRule;
    type Remote = RemoteWafRule;

    fn keyword(&self) -> &'static str {
        RULE_KEYWORD
    }
}

impl FieldMapper for WafRuleKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteWafRule) -> Result<WafRule> {
        Ok(WafRule {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            rule_name: remote.meta.name.clone(),
            priority: remote.priority,
            action: remote.action.clone(),
        })
    }

    fn map_fields(&self, local: &mut WafRule, remote: &RemoteWafRule) {
        local.priority = remote.priority;
        local.action = remote.action.clone();
    }
}

impl Deletable for WafRuleKind {}
