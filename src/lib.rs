//! Scheduled and on-demand configuration audits for Kubernetes clusters.
//!
//! The engine lives in the `lib/` crates; this crate wires them together
//! from an [`AssayerConfig`] for the `assayer` binary.

pub mod wiring;

pub use assayer_application as application;
pub use assayer_domain as domain;
pub use assayer_domain::AssayerConfig;
pub use assayer_ports as ports;
pub use wiring::{
    AuditRequest, audit, build_registry, cluster_controller, cluster_ports, controller_settings,
    local_ports, reconciler_settings,
};
