//! Outbound webhook HTTP client.
//!
//! The `HttpClient` trait is the seam between the relay and the network.
//! `ReqwestClient` is the production implementation; tests swap in
//! `MockHttpClient` and never open a socket.

use crate::error::NetworkError;
use crate::form::{FileAttachment, FormField};
use async_trait::async_trait;
use dashwire_widget::{HeaderPair, HttpMethod};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value as JsonValue;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// The outbound request body.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    /// No body at all.
    Empty,
    /// A JSON value sent as `application/json`.
    Json(JsonValue),
    /// Form fields plus file attachments, sent as multipart form-data.
    Multipart {
        fields: Vec<FormField>,
        files: Vec<FileAttachment>,
    },
}

impl OutboundBody {
    /// Returns true when the body carries at least one file attachment.
    #[must_use]
    pub fn has_files(&self) -> bool {
        matches!(self, Self::Multipart { files, .. } if !files.is_empty())
    }

    /// Flattens the body into query parameters for GET requests.
    ///
    /// Scalar values are stringified; nested values are serialized as
    /// compact JSON; file attachments are skipped.
    #[must_use]
    pub fn as_query_pairs(&self) -> Vec<(String, String)> {
        match self {
            Self::Empty => Vec::new(),
            Self::Json(JsonValue::Object(map)) => map
                .iter()
                .map(|(key, value)| (key.clone(), stringify_value(value)))
                .collect(),
            Self::Json(_) => Vec::new(),
            Self::Multipart { fields, .. } => fields
                .iter()
                .map(|field| (field.name.clone(), field.value.clone()))
                .collect(),
        }
    }
}

fn stringify_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// One outbound webhook call, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Custom headers in configured order; later duplicate names win.
    pub headers: Vec<HeaderPair>,
    /// Request body (GET flattens it into the query string).
    pub body: OutboundBody,
    /// Bound on the whole call.
    pub timeout: Duration,
}

/// The raw result of a webhook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Upstream HTTP status.
    pub status: u16,
    /// Response headers as received.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Returns the content-type header value, matched case-insensitively.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status <= 299
    }
}

/// Trait for performing outbound webhook calls.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs the call and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` when the call cannot be completed; an
    /// upstream error status is NOT a transport failure and comes back as a
    /// normal `RawResponse`.
    async fn call(&self, request: WebhookRequest) -> Result<RawResponse, NetworkError>;
}

/// Production webhook client over reqwest.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new client with a shared connection pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn call(&self, request: WebhookRequest) -> Result<RawResponse, NetworkError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);

        let multipart = request.method.sends_body() && request.body.has_files();

        if request.method.sends_body() {
            builder = match request.body {
                OutboundBody::Empty => builder,
                OutboundBody::Multipart { fields, files } if multipart => {
                    // Content-type stays untouched here; the transport
                    // generates the multipart boundary itself.
                    builder.multipart(build_form(fields, files).await?)
                }
                OutboundBody::Multipart { fields, .. } => {
                    // No files survived upload, so the fields travel as JSON.
                    let map: serde_json::Map<String, JsonValue> = fields
                        .into_iter()
                        .map(|field| (field.name, JsonValue::String(field.value)))
                        .collect();
                    builder.json(&JsonValue::Object(map))
                }
                OutboundBody::Json(value) => builder.json(&value),
            };
        } else {
            let pairs = request.body.as_query_pairs();
            if !pairs.is_empty() {
                builder = builder.query(&pairs);
            }
        }

        builder = builder.headers(header_map(&request.headers, multipart)?);

        debug!(url = %request.url, method = %request.method, "calling webhook");

        let response = builder
            .send()
            .await
            .map_err(|e| classify_send_error(&e, &request.url))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::RequestFailed {
                reason: format!("failed to read response body: {e}"),
            })?
            .to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builds the outgoing header map from configured pairs.
///
/// Later duplicate names overwrite earlier ones. A configured content-type
/// is dropped for multipart requests so the transport's boundary survives.
fn header_map(pairs: &[HeaderPair], multipart: bool) -> Result<HeaderMap, NetworkError> {
    let mut headers = HeaderMap::new();
    for pair in pairs {
        if multipart && pair.name.eq_ignore_ascii_case("content-type") {
            continue;
        }
        let name =
            HeaderName::from_bytes(pair.name.as_bytes()).map_err(|e| NetworkError::RequestFailed {
                reason: format!("invalid header name '{}': {e}", pair.name),
            })?;
        let value = HeaderValue::from_str(&pair.value).map_err(|e| NetworkError::RequestFailed {
            reason: format!("invalid value for header '{}': {e}", pair.name),
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

async fn build_form(
    fields: Vec<FormField>,
    files: Vec<FileAttachment>,
) -> Result<reqwest::multipart::Form, NetworkError> {
    let mut form = reqwest::multipart::Form::new();
    for field in fields {
        form = form.text(field.name, field.value);
    }
    for file in files {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| NetworkError::AttachmentUnreadable {
                path: file.path.display().to_string(),
                reason: e.to_string(),
            })?;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| NetworkError::RequestFailed {
                reason: format!("invalid mime type '{}': {e}", file.mime_type),
            })?;
        form = form.part(file.field_name, part);
    }
    Ok(form)
}

fn classify_send_error(error: &reqwest::Error, url: &str) -> NetworkError {
    if error.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        NetworkError::ConnectionFailed {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else if error.is_builder() {
        NetworkError::InvalidUrl {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else {
        NetworkError::RequestFailed {
            reason: error.to_string(),
        }
    }
}

/// A client that replays a canned result and records every request, for tests.
pub struct MockHttpClient {
    /// If set, every call fails with this error.
    pub fail_with: Option<NetworkError>,
    /// The response returned on success.
    pub response: RawResponse,
    calls: Mutex<Vec<WebhookRequest>>,
}

impl MockHttpClient {
    /// Creates a mock client that succeeds with the given response.
    #[must_use]
    pub fn succeeding(response: RawResponse) -> Self {
        Self {
            fail_with: None,
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock client that fails every call with the given error.
    #[must_use]
    pub fn failing(error: NetworkError) -> Self {
        Self {
            fail_with: Some(error),
            response: RawResponse {
                status: 0,
                headers: Vec::new(),
                body: Vec::new(),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a JSON success response with the given status.
    #[must_use]
    pub fn json_response(status: u16, body: &JsonValue) -> RawResponse {
        RawResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    /// Returns the requests seen so far.
    #[must_use]
    pub fn calls(&self) -> Vec<WebhookRequest> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }

    /// Returns how many calls were made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock lock poisoned").len()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn call(&self, request: WebhookRequest) -> Result<RawResponse, NetworkError> {
        self.calls.lock().expect("mock lock poisoned").push(request);
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(self.response.clone()),
        }
    }
}
