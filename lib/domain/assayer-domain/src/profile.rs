//! Named threshold presets consumed by validators.

use serde::{Deserialize, Serialize};

pub const PROFILE_PRODUCTION: &str = "production";
pub const PROFILE_DEVELOPMENT: &str = "development";
pub const PROFILE_STRICT: &str = "strict";

/// Profile used when an assessment names none, or names one that does not exist.
pub const DEFAULT_PROFILE: &str = PROFILE_PRODUCTION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    Low,
    High,
    Maximum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub min_control_plane_nodes: u32,
    pub min_worker_nodes: u32,
    pub max_cluster_admin_bindings: u32,
    pub require_network_policies: bool,
    pub require_resource_limits: bool,
    pub require_pod_security_admission: bool,
    pub allow_privileged_containers: bool,
    pub max_secret_age_days: u32,
    pub cert_expiry_warning_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub strictness: Strictness,
    pub thresholds: Thresholds,
}

impl Profile {
    /// Resolves a profile by name. Empty or unknown names fall back to
    /// [`DEFAULT_PROFILE`].
    pub fn resolve(name: &str) -> Profile {
        Self::lookup(name).unwrap_or_else(Self::production)
    }

    /// Exact lookup, without the default fallback.
    pub fn lookup(name: &str) -> Option<Profile> {
        match name.trim() {
            PROFILE_PRODUCTION => Some(Self::production()),
            PROFILE_DEVELOPMENT => Some(Self::development()),
            PROFILE_STRICT => Some(Self::strict()),
            _ => None,
        }
    }

    pub fn names() -> [&'static str; 3] {
        [PROFILE_PRODUCTION, PROFILE_DEVELOPMENT, PROFILE_STRICT]
    }

    pub fn production() -> Profile {
        Profile {
            name: PROFILE_PRODUCTION.to_string(),
            strictness: Strictness::High,
            thresholds: Thresholds {
                min_control_plane_nodes: 3,
                min_worker_nodes: 2,
                max_cluster_admin_bindings: 3,
                require_network_policies: true,
                require_resource_limits: true,
                require_pod_security_admission: true,
                allow_privileged_containers: false,
                max_secret_age_days: 90,
                cert_expiry_warning_days: 30,
            },
        }
    }

    pub fn development() -> Profile {
        Profile {
            name: PROFILE_DEVELOPMENT.to_string(),
            strictness: Strictness::Low,
            thresholds: Thresholds {
                min_control_plane_nodes: 1,
                min_worker_nodes: 1,
                max_cluster_admin_bindings: 10,
                require_network_policies: false,
                require_resource_limits: false,
                require_pod_security_admission: false,
                allow_privileged_containers: true,
                max_secret_age_days: 365,
                cert_expiry_warning_days: 7,
            },
        }
    }

    pub fn strict() -> Profile {
        Profile {
            name: PROFILE_STRICT.to_string(),
            strictness: Strictness::Maximum,
            thresholds: Thresholds {
                min_control_plane_nodes: 3,
                min_worker_nodes: 3,
                max_cluster_admin_bindings: 1,
                require_network_policies: true,
                require_resource_limits: true,
                require_pod_security_admission: true,
                allow_privileged_containers: false,
                max_secret_age_days: 30,
                cert_expiry_warning_days: 60,
            },
        }
    }
}
