//! Named policy and oracle constructors.

use super::config::TrainingConfig;
use crate::oracle::Oracle;
use crate::{Result, SeqRlError};
use std::collections::BTreeMap;

/// Builds a policy from the run configuration
pub type PolicyFactory<P> = Box<dyn Fn(&TrainingConfig) -> Result<P>>;

/// Builds a fresh oracle instance
pub type OracleFactory = Box<dyn Fn() -> Result<Box<dyn Oracle>>>;

/// Explicit registry of policy and oracle constructors.
///
/// Populated by registration calls before training starts and passed to
/// the trainer by reference.
pub struct Registry<P> {
    policies: BTreeMap<String, PolicyFactory<P>>,
    oracles: BTreeMap<String, OracleFactory>,
}

impl<P> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Registry<P> {
    pub fn new() -> Self {
        Self {
            policies: BTreeMap::new(),
            oracles: BTreeMap::new(),
        }
    }

    /// Register a policy constructor; names must be unique
    pub fn register_policy<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn(&TrainingConfig) -> Result<P> + 'static,
    {
        if self.policies.contains_key(name) {
            return Err(SeqRlError::Config(format!("policy {:?} already registered", name)));
        }
        self.policies.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    /// Register an oracle constructor; names must be unique
    pub fn register_oracle<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn() -> Result<Box<dyn Oracle>> + 'static,
    {
        if self.oracles.contains_key(name) {
            return Err(SeqRlError::Config(format!("oracle {:?} already registered", name)));
        }
        self.oracles.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    pub fn build_policy(&self, name: &str, config: &TrainingConfig) -> Result<P> {
        let factory = self.policies.get(name).ok_or_else(|| {
            SeqRlError::Config(format!(
                "unknown policy {:?} (registered: {})",
                name,
                self.policy_names().join(", ")
            ))
        })?;
        factory(config)
    }

    pub fn build_oracle(&self, name: &str) -> Result<Box<dyn Oracle>> {
        let factory = self.oracles.get(name).ok_or_else(|| {
            SeqRlError::Config(format!(
                "unknown oracle {:?} (registered: {})",
                name,
                self.oracle_names().join(", ")
            ))
        })?;
        factory()
    }

    /// Registered policy names, sorted
    pub fn policy_names(&self) -> Vec<&str> {
        self.policies.keys().map(String::as_str).collect()
    }

    /// Registered oracle names, sorted
    pub fn oracle_names(&self) -> Vec<&str> {
        self.oracles.keys().map(String::as_str).collect()
    }
}
