//! Kubernetes-backed ports built on kube-rs.

pub mod client;
pub mod inspector;
pub mod reader;
pub mod store;
pub mod watch;

pub use client::connect;
pub use inspector::{KubeClusterInspector, detect_platform};
pub use reader::KubeClusterReader;
pub use store::{ASSESSMENT_GROUP, ASSESSMENT_VERSION, KubeAssessmentStore, assessment_kind};
pub use watch::KubeAssessmentWatch;

#[cfg(test)]
mod inspector_test;
