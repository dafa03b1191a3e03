//! Built-in validators. Each one registers itself with the engine through
//! `inventory`; linking this crate is enough to make them available.

pub mod network_policies;
pub mod nodes;
pub mod rbac;

use std::sync::Arc;

use assayer_ports::Validator;

pub use network_policies::NetworkPolicyValidator;
pub use nodes::NodesValidator;
pub use rbac::ClusterAdminValidator;

/// Fresh instances of every built-in validator.
pub fn builtin() -> Vec<Arc<dyn Validator>> {
    vec![
        nodes::factory(),
        rbac::factory(),
        network_policies::factory(),
    ]
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod rbac_test;
#[cfg(test)]
mod registration_test;
