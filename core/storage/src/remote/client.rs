//! JSON API client for the remote backend.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::sync::Arc;

use safebox_common::{Error, Result};

use super::transport::{HttpResponse, HttpTransport};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://dev.opendrive.com/api/v1";

/// Backend id of the account's top-level folder.
pub const ROOT_FOLDER_ID: &str = "0";

/// A folder in a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFolder {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "FolderID", deserialize_with = "id_string")]
    pub folder_id: String,
}

/// A file in a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    #[serde(rename = "FileId", deserialize_with = "id_string")]
    pub file_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Size", default, deserialize_with = "lenient_u64")]
    pub size: Option<u64>,
    /// Unix seconds.
    #[serde(rename = "DateModified", default, deserialize_with = "lenient_u64")]
    pub date_modified: Option<u64>,
}

impl RemoteFile {
    /// Modification time, when the backend reported one.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.date_modified
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Result of `folder/list.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderListing {
    #[serde(rename = "Folders", default)]
    pub folders: Vec<RemoteFolder>,
    #[serde(rename = "Files", default)]
    pub files: Vec<RemoteFile>,
}

impl FolderListing {
    pub fn folder(&self, name: &str) -> Option<&RemoteFolder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn file(&self, name: &str) -> Option<&RemoteFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

#[derive(Deserialize)]
struct CreatedFolder {
    #[serde(rename = "FolderID", deserialize_with = "id_string")]
    folder_id: String,
}

#[derive(Deserialize)]
struct UploadedFile {
    #[serde(rename = "FileId", deserialize_with = "id_string")]
    file_id: String,
}

#[derive(Deserialize)]
struct DownloadedFile {
    #[serde(rename = "FileData")]
    file_data: String,
}

/// Ids arrive as strings or numbers depending on the endpoint.
fn id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Error reported inside a 2xx body: `{"error": {"code", "message"}}` or
/// `{"Error": "..."}`.
fn backend_error(value: &Value) -> Option<(Option<u64>, String)> {
    if let Some(err) = value.get("error").filter(|e| e.is_object()) {
        let code = err.get("code").and_then(Value::as_u64);
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown backend error")
            .to_string();
        return Some((code, message));
    }
    value
        .get("Error")
        .and_then(Value::as_str)
        .map(|message| (None, message.to_string()))
}

/// Thin client over the backend's JSON endpoints.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    username: String,
    password: String,
}

impl RemoteClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: Option<&str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, mut body: Value) -> Result<T> {
        body["username"] = json!(self.username);
        body["passwd"] = json!(self.password);
        let response = self.transport.post_json(&self.endpoint(path), &body).await?;
        handle_response(&response)
    }

    /// List the folders and files directly inside `folder_id`.
    pub async fn list_folder(&self, folder_id: &str) -> Result<FolderListing> {
        self.call("folder/list.json", json!({ "folder_id": folder_id }))
            .await
    }

    /// Create `name` inside `parent_id`, returning the new folder id.
    pub async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String> {
        let created: CreatedFolder = self
            .call(
                "folder.json",
                json!({ "folder_name": name, "folder_sub_parent": parent_id }),
            )
            .await?;
        Ok(created.folder_id)
    }

    /// Upload `data` as `name` inside `folder_id`, returning the file id.
    pub async fn upload(&self, folder_id: &str, name: &str, data: &[u8]) -> Result<String> {
        let uploaded: UploadedFile = self
            .call(
                "upload.json",
                json!({
                    "folder_id": folder_id,
                    "file_name": name,
                    "file_data": STANDARD.encode(data),
                }),
            )
            .await?;
        Ok(uploaded.file_id)
    }

    /// Download the content of `file_id`.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let downloaded: DownloadedFile = self
            .call("download.json", json!({ "file_id": file_id }))
            .await?;
        STANDARD
            .decode(downloaded.file_data.as_bytes())
            .map_err(|e| Error::Serialization(format!("Invalid file data: {}", e)))
    }
}

/// Map a response to a typed result.
///
/// 401 and 403, as HTTP status or as a backend error code, are
/// credential failures; every other failure is a connectivity failure.
pub fn handle_response<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    if response.status == 401 || response.status == 403 {
        return Err(Error::Unauthorized(format!(
            "Remote storage rejected the username or password ({})",
            response.status
        )));
    }
    if !response.is_success() {
        return Err(Error::Connectivity(format!(
            "Could not connect to remote storage ({}): {}",
            response.status,
            response.text()
        )));
    }

    let value: Value = response.json()?;
    if let Some((code, message)) = backend_error(&value) {
        return match code {
            Some(401) | Some(403) => Err(Error::Unauthorized(message)),
            _ => Err(Error::Connectivity(message)),
        };
    }

    serde_json::from_value(value)
        .map_err(|e| Error::Serialization(format!("Unexpected response shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_parses_lenient_fields() {
        let listing: FolderListing = serde_json::from_value(json!({
            "Folders": [{"Name": "Vault", "FolderID": 42}],
            "Files": [
                {"FileId": "f1", "Name": "a", "Size": "12", "DateModified": "1700000000"},
                {"FileId": "f2", "Name": "b", "Size": 5}
            ]
        }))
        .unwrap();

        assert_eq!(listing.folder("Vault").unwrap().folder_id, "42");
        let a = listing.file("a").unwrap();
        assert_eq!(a.size, Some(12));
        assert_eq!(a.modified().unwrap().timestamp(), 1_700_000_000);
        assert!(listing.file("b").unwrap().modified().is_none());
    }

    #[test]
    fn test_listing_without_sections_is_empty() {
        let listing: FolderListing = serde_json::from_value(json!({})).unwrap();
        assert!(listing.folders.is_empty());
        assert!(listing.files.is_empty());
    }

    #[test]
    fn test_handle_response_status_mapping() {
        let denied = HttpResponse::json_body(401, &json!({}));
        assert!(matches!(
            handle_response::<Value>(&denied),
            Err(Error::Unauthorized(_))
        ));

        let down = HttpResponse::json_body(500, &json!({}));
        assert!(matches!(
            handle_response::<Value>(&down),
            Err(Error::Connectivity(_))
        ));
    }

    #[test]
    fn test_handle_response_body_errors() {
        let auth = HttpResponse::json_body(
            200,
            &json!({"error": {"code": 401, "message": "Invalid password"}}),
        );
        match handle_response::<Value>(&auth) {
            Err(Error::Unauthorized(msg)) => assert_eq!(msg, "Invalid password"),
            other => panic!("unexpected {:?}", other),
        }

        let other = HttpResponse::json_body(200, &json!({"Error": "Quota exceeded"}));
        assert!(matches!(
            handle_response::<Value>(&other),
            Err(Error::Connectivity(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        struct Never;
        #[async_trait::async_trait]
        impl HttpTransport for Never {
            async fn post_json(&self, _: &str, _: &Value) -> Result<HttpResponse> {
                Err(Error::Connectivity("offline".into()))
            }
        }
        let client = RemoteClient::new(Arc::new(Never), Some("http://h/api/"), "u", "p");
        assert_eq!(client.endpoint("folder.json"), "http://h/api/folder.json");
    }
}
