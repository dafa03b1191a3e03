//! Name-keyed validator store.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use assayer_ports::{Validator, registrations};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("validator {name:?} is already registered")]
    AlreadyRegistered { name: String },
}

/// Validators keyed by name. Populated at start-up, read concurrently
/// afterwards; nothing is ever removed.
#[derive(Default)]
pub struct Registry {
    validators: RwLock<BTreeMap<String, Arc<dyn Validator>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from every validator linked into the binary through
    /// `inventory`. A duplicate name is a start-up error.
    pub fn from_registrations() -> Result<Self, RegistryError> {
        let registry = Self::new();
        for registration in registrations() {
            registry.register(registration.build())?;
        }
        Ok(registry)
    }

    pub fn register(&self, validator: Arc<dyn Validator>) -> Result<(), RegistryError> {
        let mut validators = self
            .validators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match validators.entry(validator.name().to_string()) {
            Entry::Occupied(existing) => Err(RegistryError::AlreadyRegistered {
                name: existing.key().clone(),
            }),
            Entry::Vacant(slot) => {
                tracing::debug!(validator = %slot.key(), "registered validator");
                slot.insert(validator);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Validator>> {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Snapshot of all validators. Callers must not rely on the order.
    pub fn list(&self) -> Vec<Arc<dyn Validator>> {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("validators", &self.names())
            .finish()
    }
}
