//! Shared, observable configuration of methods and sources.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use safebox_common::{Error, Result, SourceIndex};
use safebox_crypto::{MethodConfig, MethodRegistry};
use safebox_storage::{KeyValueStore, SourceConfig, SourceContext, SourceRegistry};

/// Key-value key holding the method list.
pub const METHODS_KEY: &str = "encryption-methods";
/// Key-value key holding the source list.
pub const SOURCES_KEY: &str = "sources";

/// Immutable view of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub methods: Vec<MethodConfig>,
    pub sources: Vec<SourceConfig>,
}

impl ConfigSnapshot {
    pub fn method(&self, name: &str) -> Option<&MethodConfig> {
        self.methods.iter().find(|m| m.name() == name)
    }

    pub fn source(&self, index: SourceIndex) -> Option<&SourceConfig> {
        self.sources.get(index.get())
    }

    pub fn source_index(&self, name: &str) -> Option<SourceIndex> {
        self.sources
            .iter()
            .position(|s| s.name() == name)
            .map(SourceIndex)
    }

    /// Method configured for a source.
    pub fn method_for(&self, index: SourceIndex) -> Result<&MethodConfig> {
        let source = self
            .source(index)
            .ok_or_else(|| Error::NotFound(format!("Source {} not configured", index)))?;
        self.method(source.encryption()).ok_or_else(|| {
            Error::ConfigValidation(format!(
                "Source \"{}\" uses unknown encryption method \"{}\"",
                source.name(),
                source.encryption()
            ))
        })
    }

    fn check_method_name_free(&self, name: &str, except: Option<&str>) -> Result<()> {
        if Some(name) != except && self.method(name).is_some() {
            return Err(Error::AlreadyExists(format!(
                "Encryption method \"{}\" already exists",
                name
            )));
        }
        Ok(())
    }

    fn check_source(&self, config: &SourceConfig, except: Option<SourceIndex>) -> Result<()> {
        if self.method(config.encryption()).is_none() {
            return Err(Error::ConfigValidation(format!(
                "Encryption method \"{}\" does not exist",
                config.encryption()
            )));
        }
        if let Some(existing) = self.source_index(config.name()) {
            if Some(existing) != except {
                return Err(Error::AlreadyExists(format!(
                    "Source \"{}\" already exists",
                    config.name()
                )));
            }
        }
        Ok(())
    }
}

/// Configuration service.
///
/// Holds the current [`ConfigSnapshot`] and notifies subscribers when it
/// changes. Every mutation validates first; a rejected change leaves the
/// snapshot untouched.
pub struct ConfigService {
    methods: Arc<MethodRegistry>,
    sources: Arc<SourceRegistry>,
    ctx: SourceContext,
    state: watch::Sender<Arc<ConfigSnapshot>>,
}

impl ConfigService {
    pub fn new(methods: Arc<MethodRegistry>, sources: Arc<SourceRegistry>, ctx: SourceContext) -> Self {
        Self {
            methods,
            sources,
            ctx,
            state: watch::Sender::new(Arc::new(ConfigSnapshot::default())),
        }
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.state.borrow().clone()
    }

    /// Receiver notified after every applied change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.state.subscribe()
    }

    /// Apply `f` to a copy of the snapshot and publish it if `f` succeeds.
    fn apply<T>(&self, f: impl FnOnce(&mut ConfigSnapshot) -> Result<T>) -> Result<T> {
        let mut outcome = None;
        self.state.send_if_modified(|current| {
            let mut next = current.as_ref().clone();
            match f(&mut next) {
                Ok(value) => {
                    *current = Arc::new(next);
                    outcome = Some(Ok(value));
                    true
                }
                Err(e) => {
                    outcome = Some(Err(e));
                    false
                }
            }
        });
        outcome.unwrap_or_else(|| Err(Error::Storage("Configuration update was not applied".to_string())))
    }

    pub fn add_method(&self, config: MethodConfig) -> Result<()> {
        self.methods.validate(&config)?;
        self.apply(|snap| {
            snap.check_method_name_free(config.name(), None)?;
            info!(name = config.name(), kind = config.kind(), "Added encryption method");
            snap.methods.push(config);
            Ok(())
        })
    }

    /// Replace the method called `name`. Sources follow a rename.
    pub fn update_method(&self, name: &str, config: MethodConfig) -> Result<()> {
        self.methods.validate(&config)?;
        self.apply(|snap| {
            let pos = snap
                .methods
                .iter()
                .position(|m| m.name() == name)
                .ok_or_else(|| Error::NotFound(format!("Encryption method \"{}\" not found", name)))?;
            snap.check_method_name_free(config.name(), Some(name))?;

            if config.name() != name {
                for source in snap.sources.iter_mut() {
                    if source.encryption() == name {
                        *source = source.with_encryption(config.name());
                    }
                }
            }
            snap.methods[pos] = config;
            debug!(name, "Updated encryption method");
            Ok(())
        })
    }

    /// Remove a method no source refers to.
    pub fn remove_method(&self, name: &str) -> Result<MethodConfig> {
        self.apply(|snap| {
            let pos = snap
                .methods
                .iter()
                .position(|m| m.name() == name)
                .ok_or_else(|| Error::NotFound(format!("Encryption method \"{}\" not found", name)))?;
            if let Some(user) = snap.sources.iter().find(|s| s.encryption() == name) {
                return Err(Error::NotPermitted(format!(
                    "Encryption method \"{}\" is used by source \"{}\"",
                    name,
                    user.name()
                )));
            }
            Ok(snap.methods.remove(pos))
        })
    }

    /// Validate (probing remote backends) and append a source.
    pub async fn add_source(&self, config: SourceConfig) -> Result<SourceIndex> {
        self.snapshot().check_source(&config, None)?;
        self.sources.validate(&config, &self.ctx).await?;
        self.apply(|snap| {
            snap.check_source(&config, None)?;
            info!(name = config.name(), kind = config.kind(), "Added source");
            snap.sources.push(config);
            Ok(SourceIndex(snap.sources.len() - 1))
        })
    }

    pub async fn update_source(&self, index: SourceIndex, config: SourceConfig) -> Result<()> {
        self.snapshot().check_source(&config, Some(index))?;
        self.sources.validate(&config, &self.ctx).await?;
        self.apply(|snap| {
            if index.get() >= snap.sources.len() {
                return Err(Error::NotFound(format!("Source {} not configured", index)));
            }
            snap.check_source(&config, Some(index))?;
            snap.sources[index.get()] = config;
            Ok(())
        })
    }

    /// Remove a source. Later sources move down one index.
    pub fn remove_source(&self, index: SourceIndex) -> Result<SourceConfig> {
        self.apply(|snap| {
            if index.get() >= snap.sources.len() {
                return Err(Error::NotFound(format!("Source {} not configured", index)));
            }
            Ok(snap.sources.remove(index.get()))
        })
    }

    /// Load both lists from `kv`. Missing keys load as empty lists.
    pub fn load(&self, kv: &dyn KeyValueStore) -> Result<()> {
        let methods: Vec<MethodConfig> = match kv.get(METHODS_KEY)? {
            Some(json) => serde_json::from_slice(&json)?,
            None => Vec::new(),
        };
        let sources: Vec<SourceConfig> = match kv.get(SOURCES_KEY)? {
            Some(json) => serde_json::from_slice(&json)?,
            None => Vec::new(),
        };

        for method in &methods {
            self.methods.validate(method)?;
        }
        let snapshot = ConfigSnapshot { methods, sources };
        for source in &snapshot.sources {
            if snapshot.method(source.encryption()).is_none() {
                return Err(Error::ConfigValidation(format!(
                    "Source \"{}\" uses unknown encryption method \"{}\"",
                    source.name(),
                    source.encryption()
                )));
            }
        }

        debug!(
            methods = snapshot.methods.len(),
            sources = snapshot.sources.len(),
            "Loaded configuration"
        );
        self.state.send_replace(Arc::new(snapshot));
        Ok(())
    }

    /// Write both lists to `kv`.
    pub fn save(&self, kv: &dyn KeyValueStore) -> Result<()> {
        let snapshot = self.snapshot();
        kv.set(METHODS_KEY, &serde_json::to_vec(&snapshot.methods)?)?;
        kv.set(SOURCES_KEY, &serde_json::to_vec(&snapshot.sources)?)?;
        Ok(())
    }
}
