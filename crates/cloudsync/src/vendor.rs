//! Cloud vendor dispatch

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Cloud vendor owning a provider account.
///
/// Vendor-specific behavior (how a child collection is listed, for example)
/// is selected through a [`VendorTable`] rather than branching inline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Aws,
    Huawei,
    Qcloud,
    Openstack,
    #[default]
    Generic,
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vendor::Aws => write!(f, "aws"),
            Vendor::Huawei => write!(f, "huawei"),
            Vendor::Qcloud => write!(f, "qcloud"),
            Vendor::Openstack => write!(f, "openstack"),
            Vendor::Generic => write!(f, "generic"),
        }
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Vendor::Aws),
            "huawei" => Ok(Vendor::Huawei),
            "qcloud" | "tencent" => Ok(Vendor::Qcloud),
            "openstack" => Ok(Vendor::Openstack),
            "generic" => Ok(Vendor::Generic),
            other => Err(format!("unknown vendor: {}", other)),
        }
    }
}

/// Per-vendor strategy table with a generic fallback.
#[derive(Debug, Clone)]
pub struct VendorTable<T> {
    default: T,
    overrides: HashMap<Vendor, T>,
}

impl<T> VendorTable<T> {
    /// Same strategy for every vendor
    pub fn uniform(default: T) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with(mut self, vendor: Vendor, strategy: T) -> Self {
        self.overrides.insert(vendor, strategy);
        self
    }

    pub fn resolve(&self, vendor: Vendor) -> &T {
        self.overrides.get(&vendor).unwrap_or(&self.default)
    }

    pub fn is_overridden(&self, vendor: Vendor) -> bool {
        self.overrides.contains_key(&vendor)
    }
}
