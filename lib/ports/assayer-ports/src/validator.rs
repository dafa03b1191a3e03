//! The contract every check implements.
//!
//! Validators are stateless and read-only. They register themselves through
//! [`inventory`] so that a binary only has to link the crate that defines them:
//!
//! ```rust,ignore
//! fn nodes() -> Arc<dyn Validator> {
//!     Arc::new(NodesValidator)
//! }
//!
//! inventory::submit! { ValidatorRegistration::new(nodes) }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use assayer_domain::{Finding, Profile};

use crate::cancel::{CancelToken, Cancelled};
use crate::cluster::{ClusterError, ClusterReader};

/// Everything a validator may look at during one invocation.
#[derive(Clone)]
pub struct ValidationContext {
    pub cancel: CancelToken,
    pub reader: Arc<dyn ClusterReader>,
    pub profile: Profile,
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("profile", &self.profile.name)
            .finish_non_exhaustive()
    }
}

/// A check that could not complete. Findings produced before the failure
/// travel with the error; the runner decides how both are reported.
#[derive(Debug)]
pub struct ValidatorError {
    pub partial: Vec<Finding>,
    pub error: anyhow::Error,
}

impl ValidatorError {
    pub fn with_partial(partial: Vec<Finding>, error: impl Into<anyhow::Error>) -> Self {
        Self {
            partial,
            error: error.into(),
        }
    }
}

impl fmt::Display for ValidatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)
    }
}

impl std::error::Error for ValidatorError {}

impl From<anyhow::Error> for ValidatorError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            partial: Vec::new(),
            error,
        }
    }
}

impl From<ClusterError> for ValidatorError {
    fn from(error: ClusterError) -> Self {
        anyhow::Error::new(error).into()
    }
}

impl From<Cancelled> for ValidatorError {
    fn from(error: Cancelled) -> Self {
        anyhow::Error::new(error).into()
    }
}

#[async_trait]
pub trait Validator: Send + Sync {
    /// Unique, stable name; also the registry key.
    fn name(&self) -> &str;

    fn category(&self) -> &str;

    fn description(&self) -> &str;

    async fn validate(&self, ctx: &ValidationContext) -> Result<Vec<Finding>, ValidatorError>;
}

/// Static factory submitted by validator crates.
pub struct ValidatorRegistration {
    factory: fn() -> Arc<dyn Validator>,
}

impl ValidatorRegistration {
    pub const fn new(factory: fn() -> Arc<dyn Validator>) -> Self {
        Self { factory }
    }

    pub fn build(&self) -> Arc<dyn Validator> {
        (self.factory)()
    }
}

inventory::collect!(ValidatorRegistration);

/// Every registration linked into the current binary.
pub fn registrations() -> impl Iterator<Item = &'static ValidatorRegistration> {
    inventory::iter::<ValidatorRegistration>.into_iter()
}
