//! Domain models for cluster assessments.

pub mod assessment;
pub mod config;
pub mod finding;
pub mod profile;
pub mod resource;

pub use assessment::{
    Assessment, AssessmentSpec, AssessmentStatus, AssessmentSummary, CONDITION_READY,
    ClusterInfo, Condition, Phase, ReportFormat, ReportStorageSpec,
};
pub use config::{AssayerConfig, ControllerConfig, DefaultsConfig, KubeConfig, ReportsConfig};
pub use finding::{Finding, FindingStatus};
pub use profile::{DEFAULT_PROFILE, Profile, Strictness, Thresholds};
pub use resource::{ObjectKey, Resource, ResourceKind};
