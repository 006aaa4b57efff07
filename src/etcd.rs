//! etcd sink over the v3 JSON gateway.
//!
//! Every record becomes one `POST /v3/kv/put` with base64-encoded key and
//! value. The client is blocking: a put returns only after the server replied
//! or the request timeout fired.
//!
//! Endpoints are tried in order. An endpoint that refuses the connection is
//! skipped and the same request goes to the next one; the endpoint that
//! answered stays active for later requests. A timeout (including a dial
//! timeout) or an error reply is returned as is, without trying other
//! endpoints.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::BootstrapError;
use crate::settings::EtcdSettings;
use crate::sink::Sink;

const STATUS_PATH: &str = "/v3/maintenance/status";
const AUTH_PATH: &str = "/v3/auth/authenticate";
const PUT_PATH: &str = "/v3/kv/put";

#[derive(Debug, Serialize, PartialEq)]
struct PutRequest {
    key: String,
    value: String,
}

impl PutRequest {
    fn new(key: &str, value: &[u8]) -> Self {
        Self {
            key: STANDARD.encode(key.as_bytes()),
            value: STANDARD.encode(value),
        }
    }
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    name: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Default, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    version: Option<String>,
}

/// Error body returned by the gateway on non-2xx replies.
#[derive(Debug, Default, Deserialize)]
struct GatewayError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

enum CallError {
    /// No endpoint accepted the connection.
    Unreachable(String),
    /// An endpoint answered, but the call failed.
    Failed(String),
}

impl CallError {
    fn reason(self) -> String {
        match self {
            CallError::Unreachable(r) | CallError::Failed(r) => r,
        }
    }
}

/// A connected etcd client.
pub struct EtcdSink {
    client: Client,
    endpoints: Vec<String>,
    active: usize,
    dial_timeout: Duration,
    token: Option<String>,
}

impl EtcdSink {
    /// Build a client and check that at least one endpoint answers.
    ///
    /// Authenticates first when credentials are configured.
    pub fn connect(settings: &EtcdSettings) -> Result<Self, BootstrapError> {
        let endpoints = settings
            .endpoint_list()
            .iter()
            .map(|e| normalize_endpoint(e))
            .collect::<Result<Vec<_>, _>>()?;
        if endpoints.is_empty() {
            return Err(BootstrapError::InvalidEndpoint(settings.endpoints.clone()));
        }

        let client = Client::builder()
            .connect_timeout(settings.dial_timeout())
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| BootstrapError::Connect {
                endpoints: endpoints.join(","),
                reason: e.to_string(),
            })?;

        let mut sink = Self {
            client,
            endpoints,
            active: 0,
            dial_timeout: settings.dial_timeout(),
            token: None,
        };

        if let Some((user, password)) = settings.credentials() {
            sink.authenticate(user, password)?;
        }

        let status: StatusResponse = sink
            .call(STATUS_PATH, &serde_json::json!({}), Some(sink.dial_timeout))
            .map_err(|e| sink.connect_error(e))?;
        info!(
            endpoint = %sink.active_endpoint(),
            version = status.version.as_deref().unwrap_or("unknown"),
            "connected to etcd"
        );
        Ok(sink)
    }

    pub fn active_endpoint(&self) -> &str {
        &self.endpoints[self.active]
    }

    fn authenticate(&mut self, name: &str, password: &str) -> Result<(), BootstrapError> {
        let body = AuthRequest { name, password };
        let reply: AuthResponse = self
            .call(AUTH_PATH, &body, Some(self.dial_timeout))
            .map_err(|e| self.connect_error(e))?;
        debug!(user = name, "authenticated");
        self.token = Some(reply.token);
        Ok(())
    }

    fn connect_error(&self, err: CallError) -> BootstrapError {
        BootstrapError::Connect {
            endpoints: self.endpoints.join(","),
            reason: err.reason(),
        }
    }

    /// POST `body` to `path`, failing over across endpoints on refused connections.
    fn call<B: Serialize, T: DeserializeOwned>(
        &mut self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T, CallError> {
        let mut last_reason = String::new();

        for attempt in 0..self.endpoints.len() {
            let index = (self.active + attempt) % self.endpoints.len();
            let url = format!("{}{path}", self.endpoints[index]);

            let mut request = self.client.post(&url).json(body);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }
            if let Some(token) = &self.token {
                request = request.header("Authorization", token);
            }

            let response = match request.send() {
                Ok(response) => response,
                // a dial timeout is also a connect error, but it does not fail over
                Err(e) if e.is_timeout() => {
                    return Err(CallError::Failed(format!("deadline exceeded: {e}")));
                }
                Err(e) if e.is_connect() => {
                    warn!(endpoint = %self.endpoints[index], error = %e, "endpoint unreachable");
                    last_reason = e.to_string();
                    continue;
                }
                Err(e) => return Err(CallError::Failed(e.to_string())),
            };

            self.active = index;
            let status = response.status();
            let text = response
                .text()
                .map_err(|e| CallError::Failed(e.to_string()))?;
            if !status.is_success() {
                return Err(CallError::Failed(gateway_reason(status.as_u16(), &text)));
            }
            return serde_json::from_str(&text)
                .map_err(|e| CallError::Failed(format!("unexpected reply: {e}")));
        }

        Err(CallError::Unreachable(last_reason))
    }
}

impl Sink for EtcdSink {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BootstrapError> {
        let body = PutRequest::new(key, value);
        self.call::<_, serde_json::Value>(PUT_PATH, &body, None)
            .map_err(|e| BootstrapError::Write {
                key: key.to_string(),
                reason: e.reason(),
            })?;
        Ok(())
    }
}

/// Add `http://` to scheme-less endpoints and drop trailing slashes.
pub fn normalize_endpoint(raw: &str) -> Result<String, BootstrapError> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let url = reqwest::Url::parse(&with_scheme)
        .map_err(|_| BootstrapError::InvalidEndpoint(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(BootstrapError::InvalidEndpoint(raw.to_string()));
    }
    Ok(with_scheme.trim_end_matches('/').to_string())
}

fn gateway_reason(status: u16, body: &str) -> String {
    let parsed: GatewayError = serde_json::from_str(body).unwrap_or_default();
    match parsed.message.or(parsed.error) {
        Some(message) => format!("{message} (HTTP {status})"),
        None => format!("HTTP {status}"),
    }
}
