use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::url::{parse_base_url, resolve_url};

pub const DEFAULT_BASE_URL: &str = "https://api.openshift.io/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Fetch a JSON document from the service.
///
/// `url` is either absolute or relative to the implementation's base URL.
#[async_trait]
pub trait FetchJson: Send + Sync {
    async fn fetch_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value>;
}

/// Options for connecting to the service.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for the planner REST API.
pub struct ApiEndpoint {
    base_url: String,
    http: reqwest::Client,
}

impl ApiEndpoint {
    pub fn new(options: ApiOptions) -> Result<Self> {
        let base_url = parse_base_url(&options.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("planstats/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl FetchJson for ApiEndpoint {
    async fn fetch_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = resolve_url(&self.base_url, url);
        log::debug!("GET {url} {query:?}");

        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url));
        }
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url,
            });
        }

        resp.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                Error::Decode {
                    url,
                    message: e.to_string(),
                }
            } else {
                Error::Http(e)
            }
        })
    }
}

/// Deserialize a fetched document into a wire record.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(url: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
