//! HTTP Transport
//!
//! The updater only needs two capabilities: POST a small body and get the
//! decoded reply, and GET a URL as raw bytes. `Transport` is that seam;
//! `ReqwestTransport` is the production implementation.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = concat!("bundle-updater/", env!("CARGO_PKG_VERSION"));

/// Upper bound on the buffer reserved up front for a download
const MAX_PREALLOC_BYTES: u64 = 8 * 1024 * 1024;

/// Transport-level failures
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid transport configuration: {0}")]
    Config(String),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

/// How the manifest request body is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyFormat {
    /// `application/x-www-form-urlencoded`
    #[default]
    Form,
    Json,
}

/// Options applied to every request
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RequestOptions {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub body_format: BodyFormat,
    /// Extra fields sent with the manifest request
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl RequestOptions {
    /// Configured data with `current` set to the local version
    pub fn manifest_body(&self, local_version: &str) -> Map<String, Value> {
        let mut body = self.data.clone();
        body.insert("current".to_string(), Value::String(local_version.to_string()));
        body
    }
}

/// A decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Already-structured data (the server sent JSON)
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` and return the decoded reply
    async fn post(&self, url: &str, body: &Map<String, Value>) -> Result<Payload, TransportError>;

    /// GET `url` and return the body bytes unmodified
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// `reqwest`-backed transport
pub struct ReqwestTransport {
    client: reqwest::Client,
    body_format: BodyFormat,
}

impl ReqwestTransport {
    /// Build a client honoring timeout, proxy, user agent and headers
    pub fn new(options: &RequestOptions) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
            .default_headers(header_map(&options.headers)?);

        if let Some(secs) = options.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(proxy) = &options.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| TransportError::Config(format!("proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        Ok(Self {
            client,
            body_format: options.body_format,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, url: &str, body: &Map<String, Value>) -> Result<Payload, TransportError> {
        let request = self.client.post(url);
        let request = match self.body_format {
            BodyFormat::Json => request.json(body),
            BodyFormat::Form => request.form(&form_pairs(body)),
        };

        let response = request.send().await?;
        let response = check_status(response)?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);

        let bytes = response.bytes().await?.to_vec();
        Ok(decode_body(bytes, is_json))
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.client.get(url).send().await?;
        let response = check_status(response)?;

        // Content-Length is only a hint; the body grows as chunks arrive
        let hint = response.content_length().unwrap_or(0).min(MAX_PREALLOC_BYTES);
        let mut body = Vec::with_capacity(hint as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(body)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }
    Ok(response)
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Config(format!("header {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Config(format!("header {}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

// Form bodies are flat: non-string values are sent as their JSON text.
fn form_pairs(body: &Map<String, Value>) -> Vec<(String, String)> {
    body.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn decode_body(bytes: Vec<u8>, is_json: bool) -> Payload {
    if is_json {
        if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
            return Payload::Json(value);
        }
    }
    match String::from_utf8(bytes) {
        Ok(text) => Payload::Text(text),
        Err(e) => Payload::Bytes(e.into_bytes()),
    }
}
