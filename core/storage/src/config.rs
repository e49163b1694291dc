//! Storage source configuration shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of the key-value backed local source.
pub const LOCAL: &str = "local";
/// Discriminant of the remote API backed source.
pub const REMOTE_API: &str = "remote-api";

/// Tagged union of source configurations.
///
/// Every variant names the encryption method used for its payloads.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceConfig {
    /// Browser-style persistent key-value storage.
    Local { name: String, encryption: String },
    /// Remote storage reached over a JSON API.
    #[serde(rename_all = "camelCase")]
    RemoteApi {
        name: String,
        encryption: String,
        username: String,
        password: String,
        /// `/`, a slash path below the backend root, or a backend folder id.
        root_folder: String,
        /// Overrides the default API endpoint.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

impl SourceConfig {
    /// Configured name.
    pub fn name(&self) -> &str {
        match self {
            SourceConfig::Local { name, .. } | SourceConfig::RemoteApi { name, .. } => name,
        }
    }

    /// Name of the encryption method used for this source's payloads.
    pub fn encryption(&self) -> &str {
        match self {
            SourceConfig::Local { encryption, .. } | SourceConfig::RemoteApi { encryption, .. } => {
                encryption
            }
        }
    }

    /// Type discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Local { .. } => LOCAL,
            SourceConfig::RemoteApi { .. } => REMOTE_API,
        }
    }

    /// Return a copy that points at a different encryption method.
    pub fn with_encryption(&self, method: impl Into<String>) -> Self {
        let mut config = self.clone();
        match &mut config {
            SourceConfig::Local { encryption, .. } | SourceConfig::RemoteApi { encryption, .. } => {
                *encryption = method.into()
            }
        }
        config
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SourceConfig");
        s.field("type", &self.kind())
            .field("name", &self.name())
            .field("encryption", &self.encryption());
        if let SourceConfig::RemoteApi {
            username,
            root_folder,
            ..
        } = self
        {
            s.field("username", username)
                .field("password", &"[REDACTED]")
                .field("root_folder", root_folder);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shapes() {
        let local: SourceConfig =
            serde_json::from_str(r#"{"name":"browser","type":"local","encryption":"main"}"#)
                .unwrap();
        assert_eq!(local.kind(), LOCAL);
        assert_eq!(local.encryption(), "main");

        let remote: SourceConfig = serde_json::from_str(
            r#"{"name":"cloud","type":"remote-api","encryption":"main",
                "username":"alice","password":"pw","rootFolder":"/Vault"}"#,
        )
        .unwrap();
        match &remote {
            SourceConfig::RemoteApi {
                root_folder,
                base_url,
                ..
            } => {
                assert_eq!(root_folder, "/Vault");
                assert!(base_url.is_none());
            }
            other => panic!("unexpected config {:?}", other),
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let remote = SourceConfig::RemoteApi {
            name: "cloud".into(),
            encryption: "main".into(),
            username: "alice".into(),
            password: "hunter2".into(),
            root_folder: "/".into(),
            base_url: None,
        };
        let debug = format!("{:?}", remote);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_with_encryption() {
        let local = SourceConfig::Local {
            name: "browser".into(),
            encryption: "old".into(),
        };
        assert_eq!(local.with_encryption("new").encryption(), "new");
    }
}
