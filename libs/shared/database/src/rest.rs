use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_models::BackendError;

/// Thin JSON client for the clinic REST backend.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|err| {
                warn!("Falling back to default HTTP client: {}", err);
                Client::new()
            });

        Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        match HeaderValue::from_str(&self.api_key) {
            Ok(value) if !self.api_key.is_empty() => {
                headers.insert("x-api-key", value);
            }
            Ok(_) => {}
            Err(_) => warn!("API key contains characters not allowed in a header, omitting it"),
        }

        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.get_headers());

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await.map_err(|err| {
            error!("Request to {} failed: {}", url, err);
            if err.is_timeout() {
                BackendError::Timeout(err.to_string())
            } else {
                BackendError::Unreachable(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => BackendError::Auth(error_text),
                404 => BackendError::NotFound(error_text),
                code => BackendError::Api { status: code, body: error_text },
            });
        }

        let text = response
            .text()
            .await
            .map_err(|err| BackendError::Unreachable(err.to_string()))?;

        // Some endpoints answer writes with an empty body.
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };

        serde_json::from_str::<T>(text).map_err(|err| {
            error!("Could not decode response from {}: {}", url, err);
            BackendError::Decode(err.to_string())
        })
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, BackendError> {
        self.request::<Value>(Method::GET, path, None).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<Value, BackendError> {
        self.request::<Value>(Method::POST, path, Some(body)).await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
