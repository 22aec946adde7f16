//! HTTP client for one *arr instance.
//!
//! Built from a stored [`AppConfig`]: requests carry the instance's API key
//! in the `X-Api-Key` header, use HTTP basic auth when a username is set,
//! honour `timeout_secs`, and skip certificate checks when `valid_ssl` is
//! off. Resource bodies differ per app and version, so items are kept as
//! JSON objects and only `id` and `name` are interpreted.

use std::time::Duration;

use arrdesk_store::{AppConfig, StarrApp};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StarrError;
use crate::resource::{api_version, Resource};

/// Header the *arr apps read the API key from.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Longest error body quoted back to the caller.
const MAX_ERROR_LEN: usize = 200;

/// One quality profile, metadata profile or download client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StarrItem(pub serde_json::Value);

impl StarrItem {
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(serde_json::Value::as_i64)
    }

    pub fn name(&self) -> &str {
        self.0
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
    }

    /// A copy without its `id`, as the API expects for a create.
    pub fn without_id(&self) -> StarrItem {
        let mut value = self.0.clone();
        if let Some(object) = value.as_object_mut() {
            object.remove("id");
        }
        StarrItem(value)
    }
}

/// Client for a single instance.
pub struct StarrClient {
    app: StarrApp,
    instance: String,
    api_root: String,
    timeout_secs: u64,
    credentials: Option<(String, String)>,
    http: reqwest::Client,
}

impl StarrClient {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// `Config` if the URL is empty, the API key is not a valid header
    /// value, or no HTTP client can be built.
    pub fn new(config: &AppConfig) -> Result<Self, StarrError> {
        let base = config.url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(StarrError::Config(format!("{} has no URL", config.name)));
        }

        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let mut key = HeaderValue::from_str(&config.api_key)
                .map_err(|e| StarrError::Config(format!("invalid API key: {e}")))?;
            key.set_sensitive(true);
            headers.insert(API_KEY_HEADER, key);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.valid_ssl)
            .default_headers(headers)
            .user_agent(concat!("arrdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StarrError::Config(format!("failed to create HTTP client: {e}")))?;

        let credentials = (!config.username.is_empty())
            .then(|| (config.username.clone(), config.password.clone()));

        Ok(Self {
            app: config.app,
            instance: config.name.clone(),
            api_root: format!("{base}/api/{}", api_version(config.app)),
            timeout_secs: config.timeout_secs,
            credentials,
            http,
        })
    }

    pub fn app(&self) -> StarrApp {
        self.app
    }

    /// Label of the instance this client talks to.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// `<url>/api/<version>`
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Fetch every item of `resource`.
    pub async fn list(&self, resource: Resource) -> Result<Vec<StarrItem>, StarrError> {
        self.ensure_supported(resource)?;
        debug!(app = %self.app, instance = %self.instance, %resource, "Listing");

        let body = self
            .send(self.request(Method::GET, resource.endpoint()))
            .await?;
        let items: Vec<StarrItem> = serde_json::from_slice(&body)?;
        debug!(count = items.len(), %resource, "Listed");
        Ok(items)
    }

    pub async fn quality_profiles(&self) -> Result<Vec<StarrItem>, StarrError> {
        self.list(Resource::QualityProfiles).await
    }

    pub async fn metadata_profiles(&self) -> Result<Vec<StarrItem>, StarrError> {
        self.list(Resource::MetadataProfiles).await
    }

    pub async fn download_clients(&self) -> Result<Vec<StarrItem>, StarrError> {
        self.list(Resource::DownloadClients).await
    }

    /// Delete one item. Returns a confirmation message.
    pub async fn delete(&self, resource: Resource, id: i64) -> Result<String, StarrError> {
        self.ensure_supported(resource)?;

        let path = format!("{}/{id}", resource.endpoint());
        self.send(self.request(Method::DELETE, &path)).await?;

        let message = format!(
            "Deleted {} {} with ID {id}.",
            self.instance,
            resource.singular()
        );
        info!(app = %self.app, instance = %self.instance, %resource, id, "Deleted");
        Ok(message)
    }

    /// Create `item` on the instance. Any `id` it carries is dropped.
    pub async fn add(&self, resource: Resource, item: &StarrItem) -> Result<StarrItem, StarrError> {
        self.ensure_supported(resource)?;

        let body = serde_json::to_vec(&item.without_id())?;
        let response = self
            .send(
                self.request(Method::POST, resource.endpoint())
                    .header(CONTENT_TYPE, "application/json")
                    .body(body),
            )
            .await?;
        let created: StarrItem = serde_json::from_slice(&response)?;
        info!(
            app = %self.app,
            instance = %self.instance,
            %resource,
            name = created.name(),
            id = ?created.id(),
            "Created"
        );
        Ok(created)
    }

    fn ensure_supported(&self, resource: Resource) -> Result<(), StarrError> {
        if resource.supported_by(self.app) {
            Ok(())
        } else {
            Err(StarrError::Unsupported {
                app: self.app,
                resource,
            })
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}/{path}", self.api_root));
        match &self.credentials {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, StarrError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(app = %self.app, instance = %self.instance, status = status.as_u16(), %message, "Request rejected");
            return Err(StarrError::Status {
                app: self.app,
                status: status.as_u16(),
                message,
            });
        }
        Ok(body.to_vec())
    }

    fn transport_error(&self, err: reqwest::Error) -> StarrError {
        if err.is_timeout() {
            StarrError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            StarrError::Request(err.to_string())
        }
    }
}

/// Pull a readable message out of an *arr error body.
///
/// The apps answer with `{"message": ...}` for general failures and a list
/// of `{"propertyName", "errorMessage"}` objects for validation failures.
pub fn error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(serde_json::Value::as_str) {
            if !message.trim().is_empty() {
                return message.trim().to_string();
            }
        }
        if let Some(list) = value.as_array() {
            let messages: Vec<String> = list
                .iter()
                .filter_map(|entry| {
                    let message = entry.get("errorMessage")?.as_str()?.trim();
                    if message.is_empty() {
                        return None;
                    }
                    Some(match entry.get("propertyName").and_then(|p| p.as_str()) {
                        Some(property) if !property.is_empty() => format!("{property}: {message}"),
                        _ => message.to_string(),
                    })
                })
                .collect();
            if !messages.is_empty() {
                return messages.join("; ");
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "no details".to_string()
    } else {
        text.chars().take(MAX_ERROR_LEN).collect()
    }
}
