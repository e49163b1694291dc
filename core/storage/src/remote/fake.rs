//! In-process stand-in for the remote backend.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use safebox_common::{Error, Result};

use super::transport::{HttpResponse, HttpTransport};

#[derive(Default)]
struct State {
    next_id: u64,
    /// Folder id to (name, child folder id).
    folders: HashMap<String, Vec<(String, String)>>,
    /// Folder id to (name, file id, data).
    files: HashMap<String, Vec<(String, String, Vec<u8>)>>,
    requests: Vec<String>,
}

impl State {
    fn allocate(&mut self) -> String {
        self.next_id += 1;
        format!("id-{}", self.next_id)
    }
}

/// Emulates the folder/list, folder, upload and download endpoints.
pub(crate) struct FakeDrive {
    username: String,
    password: String,
    offline: bool,
    state: Mutex<State>,
}

impl FakeDrive {
    pub fn new(username: &str, password: &str) -> Self {
        let mut state = State::default();
        state.folders.insert("0".to_string(), Vec::new());
        Self {
            username: username.to_string(),
            password: password.to_string(),
            offline: false,
            state: Mutex::new(state),
        }
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::new("", "")
        }
    }

    pub fn add_folder(&self, parent: &str, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate();
        state.folders.insert(id.clone(), Vec::new());
        state
            .folders
            .entry(parent.to_string())
            .or_default()
            .push((name.to_string(), id.clone()));
        id
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    fn handle(&self, endpoint: &str, body: &Value) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        state.requests.push(endpoint.to_string());

        if body["username"] != json!(self.username) || body["passwd"] != json!(self.password) {
            return HttpResponse::json_body(
                200,
                &json!({"error": {"code": 401, "message": "Invalid username or password"}}),
            );
        }

        let text = |key: &str| body[key].as_str().unwrap_or_default().to_string();
        match endpoint {
            "folder/list.json" => {
                let id = text("folder_id");
                let Some(folders) = state.folders.get(&id) else {
                    return HttpResponse::json_body(
                        200,
                        &json!({"error": {"code": 404, "message": "Folder not found"}}),
                    );
                };
                let folders: Vec<Value> = folders
                    .iter()
                    .map(|(name, id)| json!({"Name": name, "FolderID": id}))
                    .collect();
                let files: Vec<Value> = state
                    .files
                    .get(&id)
                    .into_iter()
                    .flatten()
                    .map(|(name, id, data)| {
                        json!({"FileId": id, "Name": name, "Size": data.len().to_string(),
                               "DateModified": "1700000000"})
                    })
                    .collect();
                HttpResponse::json_body(200, &json!({"Folders": folders, "Files": files}))
            }
            "folder.json" => {
                let parent = text("folder_sub_parent");
                let id = state.allocate();
                state.folders.insert(id.clone(), Vec::new());
                state
                    .folders
                    .entry(parent)
                    .or_default()
                    .push((text("folder_name"), id.clone()));
                HttpResponse::json_body(200, &json!({"FolderID": id}))
            }
            "upload.json" => {
                let data = STANDARD.decode(text("file_data")).unwrap_or_default();
                let name = text("file_name");
                let id = state.allocate();
                let files = state.files.entry(text("folder_id")).or_default();
                files.retain(|(n, _, _)| n != &name);
                files.push((name, id.clone(), data));
                HttpResponse::json_body(200, &json!({"FileId": id}))
            }
            "download.json" => {
                let id = text("file_id");
                let found = state
                    .files
                    .values()
                    .flatten()
                    .find(|(_, fid, _)| fid == &id)
                    .map(|(_, _, data)| STANDARD.encode(data));
                match found {
                    Some(data) => HttpResponse::json_body(200, &json!({"FileData": data})),
                    None => HttpResponse::json_body(404, &json!({})),
                }
            }
            _ => HttpResponse::json_body(404, &json!({})),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeDrive {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse> {
        if self.offline {
            return Err(Error::Connectivity(format!("Request to {} failed", url)));
        }
        let endpoint = url.splitn(4, '/').nth(3).unwrap_or_default();
        Ok(self.handle(endpoint, body))
    }
}
