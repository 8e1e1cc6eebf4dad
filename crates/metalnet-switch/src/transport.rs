//! HTTP transport used by REST-managed switch drivers.
//!
//! Drivers never talk to `reqwest` directly; they build an [`HttpRequest`]
//! and hand it to a [`Transport`]. Production code uses [`HttpTransport`],
//! tests use [`RecordingTransport`] which captures requests and replays
//! scripted responses.
//!
//! # Example
//!
//! ```ignore
//! use metalnet_switch::transport::{send_checked, Credentials, HttpRequest, HttpTransport};
//!
//! let transport = HttpTransport::new(None)?;
//! let request = HttpRequest::get("http://switch/api/running/dell/interfaces", creds);
//! let response = send_checked(&transport, request, &[]).await?;
//! println!("{}", response.body);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::error::{FabricError, FabricResult};

/// HTTP methods used by switch management APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic-auth credentials sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A single request to a switch.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub credentials: Credentials,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            credentials,
        }
    }

    pub fn put(url: impl Into<String>, body: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            body: Some(body.into()),
            credentials,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body.into()),
            credentials,
        }
    }
}

/// Status and body of a switch response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for an error status not listed in `acceptable`.
    pub fn is_failure(&self, acceptable: &[u16]) -> bool {
        self.status >= 400 && !acceptable.contains(&self.status)
    }
}

/// Something that can deliver an [`HttpRequest`] to a switch.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request. Returns `Err` only when no response was received;
    /// error statuses come back as a normal [`HttpResponse`].
    async fn send(&self, request: HttpRequest) -> FabricResult<HttpResponse>;
}

/// Sends a request and converts an unacceptable error status into
/// [`FabricError::Hardware`].
///
/// The failure is logged with the raw response body before it is returned.
pub async fn send_checked(
    transport: &dyn Transport,
    request: HttpRequest,
    acceptable: &[u16],
) -> FabricResult<HttpResponse> {
    let method = request.method;
    let url = request.url.clone();
    let response = transport.send(request).await?;

    if response.is_failure(acceptable) {
        error!(
            method = %method,
            url = %url,
            status = response.status,
            body = %response.body,
            "Bad request to switch"
        );
        return Err(FabricError::Hardware {
            method: method.to_string(),
            url,
            status: response.status,
            body: response.body,
        });
    }

    trace!(method = %method, url = %url, status = response.status, "Switch request succeeded");
    Ok(response)
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client. `timeout` of `None` keeps the client default.
    pub fn new(timeout: Option<Duration>) -> FabricResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| FabricError::Transport {
            url: String::new(),
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> FabricResult<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "Sending switch request");

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self
            .client
            .request(method, &request.url)
            .basic_auth(&request.credentials.username, Some(&request.credentials.password));
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let transport_error = |e: reqwest::Error| FabricError::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        };
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        Ok(HttpResponse { status, body })
    }
}

/// Transport that records every request and answers from a script.
///
/// Requests beyond the script get an empty `200 OK`.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<FabricResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the response for the next unanswered request.
    pub fn push_response(&self, response: HttpResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a transport-level failure.
    pub fn push_failure(&self, error: FabricError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Returns a copy of all captured requests, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Captured bodies of requests sent with `method`.
    pub fn bodies(&self, method: Method) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .filter_map(|r| r.body.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> FabricResult<HttpResponse> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::ok("")))
    }
}
