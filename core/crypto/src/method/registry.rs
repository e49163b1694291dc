//! Method registry for type-discriminant dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use super::config::MethodConfig;
use super::placeholder::{AlternativeFactory, AsymmetricKeyFactory};
use super::symmetric::SymmetricFactory;
use super::{EncryptionMethod, MethodFactory};
use safebox_common::{Error, Result};

/// Registry of encryption method factories keyed by `type`.
pub struct MethodRegistry {
    factories: HashMap<&'static str, Box<dyn MethodFactory>>,
}

impl MethodRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with every built-in variant.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(SymmetricFactory))
            .expect("Failed to register symmetric method");
        registry
            .register(Box::new(AsymmetricKeyFactory))
            .expect("Failed to register asymmetric-key method");
        registry
            .register(Box::new(AlternativeFactory))
            .expect("Failed to register alternative method");
        registry
    }

    /// Register a factory.
    ///
    /// # Errors
    /// - `AlreadyExists` if the discriminant is already registered
    pub fn register(&mut self, factory: Box<dyn MethodFactory>) -> Result<()> {
        let kind = factory.kind();
        if self.factories.contains_key(kind) {
            return Err(Error::AlreadyExists(format!(
                "Encryption method '{}' is already registered",
                kind
            )));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Look up the factory for a discriminant.
    pub fn factory(&self, kind: &str) -> Result<&dyn MethodFactory> {
        self.factories
            .get(kind)
            .map(|f| f.as_ref())
            .ok_or_else(|| Error::NotFound(format!("Encryption method '{}' is not registered", kind)))
    }

    /// Validate a configuration with its variant's rules.
    pub fn validate(&self, config: &MethodConfig) -> Result<()> {
        self.factory(config.kind())?.validate(config)
    }

    /// Resolve a configuration to a method instance.
    pub fn create(&self, config: &MethodConfig) -> Result<Arc<dyn EncryptionMethod>> {
        self.factory(config.kind())?.create(config)
    }

    /// Canonical empty configuration for a discriminant.
    pub fn default_config(&self, kind: &str) -> Result<MethodConfig> {
        Ok(self.factory(kind)?.default_config())
    }

    /// Registered discriminants, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
