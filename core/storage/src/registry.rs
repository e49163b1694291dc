//! Source registry for dynamic source resolution.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::{SourceConfig, LOCAL, REMOTE_API};
use crate::kv::KeyValueStore;
use crate::local::LocalSource;
use crate::remote::{HttpTransport, RemoteApiSource, RemoteClient};
use crate::source::Source;
use safebox_common::{Error, Result, SourcePath};

/// Collaborators a source may need.
#[derive(Clone)]
pub struct SourceContext {
    pub kv: Arc<dyn KeyValueStore>,
    pub http: Arc<dyn HttpTransport>,
}

impl SourceContext {
    pub fn new(kv: Arc<dyn KeyValueStore>, http: Arc<dyn HttpTransport>) -> Self {
        Self { kv, http }
    }
}

/// Builds and validates one source variant.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    /// Type discriminant handled by this factory.
    fn kind(&self) -> &'static str;

    /// Human readable label.
    fn label(&self) -> &'static str;

    /// Canonical empty configuration.
    fn default_config(&self) -> SourceConfig;

    /// Check the configuration.
    ///
    /// Field checks run first and fail with `ConfigValidation`. Variants
    /// backed by a remote service then probe it.
    async fn validate(&self, config: &SourceConfig, ctx: &SourceContext) -> Result<()>;

    /// Create a source instance from a configuration snapshot.
    fn create(&self, config: &SourceConfig, ctx: &SourceContext) -> Result<Arc<dyn Source>>;
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ConfigValidation(format!("'{}' is required", field)));
    }
    Ok(())
}

fn mismatch(expected: &str, config: &SourceConfig) -> Error {
    Error::ConfigValidation(format!(
        "Expected a '{}' source configuration, got '{}'",
        expected,
        config.kind()
    ))
}

/// Factory for [`LocalSource`].
pub struct LocalFactory;

#[async_trait]
impl SourceFactory for LocalFactory {
    fn kind(&self) -> &'static str {
        LOCAL
    }

    fn label(&self) -> &'static str {
        "Local storage"
    }

    fn default_config(&self) -> SourceConfig {
        SourceConfig::Local {
            name: String::new(),
            encryption: String::new(),
        }
    }

    async fn validate(&self, config: &SourceConfig, _ctx: &SourceContext) -> Result<()> {
        match config {
            SourceConfig::Local { name, encryption } => {
                require("name", name)?;
                require("encryption", encryption)
            }
            other => Err(mismatch(LOCAL, other)),
        }
    }

    fn create(&self, config: &SourceConfig, ctx: &SourceContext) -> Result<Arc<dyn Source>> {
        match config {
            SourceConfig::Local { name, .. } => {
                Ok(Arc::new(LocalSource::new(name.clone(), ctx.kv.clone())))
            }
            other => Err(mismatch(LOCAL, other)),
        }
    }
}

/// Factory for [`RemoteApiSource`].
pub struct RemoteApiFactory;

impl RemoteApiFactory {
    fn check_fields(config: &SourceConfig) -> Result<()> {
        match config {
            SourceConfig::RemoteApi {
                name,
                encryption,
                username,
                password,
                root_folder,
                base_url,
            } => {
                require("name", name)?;
                require("encryption", encryption)?;
                require("username", username)?;
                require("password", password)?;
                require("rootFolder", root_folder)?;
                if let Some(base_url) = base_url {
                    url::Url::parse(base_url).map_err(|e| {
                        Error::ConfigValidation(format!("Invalid base URL '{}': {}", base_url, e))
                    })?;
                }
                Ok(())
            }
            other => Err(mismatch(REMOTE_API, other)),
        }
    }
}

#[async_trait]
impl SourceFactory for RemoteApiFactory {
    fn kind(&self) -> &'static str {
        REMOTE_API
    }

    fn label(&self) -> &'static str {
        "OpenDrive"
    }

    fn default_config(&self) -> SourceConfig {
        SourceConfig::RemoteApi {
            name: String::new(),
            encryption: String::new(),
            username: String::new(),
            password: String::new(),
            root_folder: "/".to_string(),
            base_url: None,
        }
    }

    async fn validate(&self, config: &SourceConfig, ctx: &SourceContext) -> Result<()> {
        Self::check_fields(config)?;

        let source = self.create(config, ctx)?;
        match source.list(&SourcePath::root()).await {
            Ok(_) => Ok(()),
            Err(Error::NotFound(msg)) => Err(Error::ConfigValidation(format!(
                "Root folder is not reachable: {}",
                msg
            ))),
            Err(e @ Error::Unauthorized(_)) | Err(e @ Error::Connectivity(_)) => Err(e),
            Err(e) => Err(Error::Connectivity(format!(
                "Unable to connect to remote storage: {}",
                e
            ))),
        }
    }

    fn create(&self, config: &SourceConfig, ctx: &SourceContext) -> Result<Arc<dyn Source>> {
        match config {
            SourceConfig::RemoteApi {
                name,
                username,
                password,
                root_folder,
                base_url,
                ..
            } => {
                let client = RemoteClient::new(
                    ctx.http.clone(),
                    base_url.as_deref(),
                    username.clone(),
                    password.clone(),
                );
                Ok(Arc::new(RemoteApiSource::new(
                    name.clone(),
                    client,
                    root_folder.clone(),
                )))
            }
            other => Err(mismatch(REMOTE_API, other)),
        }
    }
}

/// Registry of source factories keyed by type discriminant.
pub struct SourceRegistry {
    factories: HashMap<&'static str, Box<dyn SourceFactory>>,
}

impl SourceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding the `local` and `remote-api` variants.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(LocalFactory))
            .expect("Failed to register local source");
        registry
            .register(Box::new(RemoteApiFactory))
            .expect("Failed to register remote-api source");
        registry
    }

    /// Register a factory.
    ///
    /// # Errors
    /// - Returns error if the discriminant is already registered
    pub fn register(&mut self, factory: Box<dyn SourceFactory>) -> Result<()> {
        let kind = factory.kind();
        if self.factories.contains_key(kind) {
            return Err(Error::AlreadyExists(format!(
                "Source type '{}' is already registered",
                kind
            )));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Look up the factory for a discriminant.
    pub fn factory(&self, kind: &str) -> Result<&dyn SourceFactory> {
        self.factories
            .get(kind)
            .map(|f| f.as_ref())
            .ok_or_else(|| Error::NotFound(format!("Source type '{}' is not registered", kind)))
    }

    /// Validate a configuration with its variant's rules.
    pub async fn validate(&self, config: &SourceConfig, ctx: &SourceContext) -> Result<()> {
        self.factory(config.kind())?.validate(config, ctx).await
    }

    /// Create a source for a configuration.
    pub fn create(&self, config: &SourceConfig, ctx: &SourceContext) -> Result<Arc<dyn Source>> {
        debug!(kind = config.kind(), name = config.name(), "Creating source");
        self.factory(config.kind())?.create(config, ctx)
    }

    /// Canonical empty configuration for a discriminant.
    pub fn default_config(&self, kind: &str) -> Result<SourceConfig> {
        Ok(self.factory(kind)?.default_config())
    }

    /// Registered discriminants, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
