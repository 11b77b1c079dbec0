// Device HTTP client
//
// Wraps `reqwest::Client` with the device's state URL, credential
// placement, and response classification. A device exposes one state
// document: GET reads it, POST/PUT with a single-field body writes to it.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use md5::{Digest as _, Md5};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{DeviceState, RestExceptionResponse};
use crate::transport::TransportConfig;

/// Default path of the state document on the reference pellet-stove firmware.
pub const DEFAULT_STATE_PATH: &str = "/status.cgi";

/// Default header carrying the device PIN.
pub const DEFAULT_CREDENTIAL_HEADER: &str = "X-HS-PIN";

/// Where the credential travels in each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPlacement {
    /// HTTP header with the given name.
    Header(String),
    /// Query parameter with the given name (on reads and writes).
    Query(String),
    /// Extra field with the given name in write bodies; reads carry no credential.
    Body(String),
    /// HTTP header with the given name carrying `md5(nonce + md5(pin))`,
    /// where the nonce is `meta.nonce` from the last state document.
    /// Requests before the first nonce is known carry no credential.
    HashedHeader(String),
}

impl Default for CredentialPlacement {
    fn default() -> Self {
        Self::Header(DEFAULT_CREDENTIAL_HEADER.into())
    }
}

/// HTTP verb used for property writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMethod {
    #[default]
    Post,
    Put,
}

impl WriteMethod {
    fn as_method(self) -> Method {
        match self {
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
        }
    }
}

/// Raw HTTP client for one device.
///
/// Returns the decoded top-level JSON object on reads; writes send
/// `{"<field>": <value>}`. Timeouts surface as [`Error::Timeout`].
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    credential: SecretString,
    placement: CredentialPlacement,
    state_path: String,
    write_method: WriteMethod,
    timeout: Duration,
    nonce: Mutex<Option<String>>,
}

impl DeviceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the device root, e.g. `http://192.168.1.50`.
    pub fn new(
        base_url: Url,
        credential: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            credential,
            placement: CredentialPlacement::default(),
            state_path: DEFAULT_STATE_PATH.into(),
            write_method: WriteMethod::default(),
            timeout: transport.timeout,
            nonce: Mutex::new(None),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, credential: SecretString) -> Self {
        Self {
            http,
            base_url,
            credential,
            placement: CredentialPlacement::default(),
            state_path: DEFAULT_STATE_PATH.into(),
            write_method: WriteMethod::default(),
            timeout: TransportConfig::default().timeout,
            nonce: Mutex::new(None),
        }
    }

    pub fn with_state_path(mut self, path: impl Into<String>) -> Self {
        self.state_path = path.into();
        self
    }

    pub fn with_credential_placement(mut self, placement: CredentialPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_write_method(mut self, method: WriteMethod) -> Self {
        self.write_method = method;
        self
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fully-qualified state document URL, including a query credential.
    pub fn state_url(&self) -> Result<Url, Error> {
        let mut url = self.base_url.join(&self.state_path)?;
        if let CredentialPlacement::Query(ref name) = self.placement {
            url.query_pairs_mut()
                .append_pair(name, self.credential.expose_secret());
        }
        Ok(url)
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Fetch the device state document.
    pub async fn fetch_state(&self) -> Result<DeviceState, Error> {
        let url = self.state_url()?;
        debug!(path = url.path(), "GET device state");

        let resp = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let body = self.read_body(resp).await?;
        let state = decode_object(&body)?;
        self.remember_nonce(&state);
        Ok(state)
    }

    /// Write a single property: sends `{"<field>": <value>}`.
    ///
    /// With [`CredentialPlacement::HashedHeader`] and no nonce seen yet, the
    /// state document is read first to obtain one.
    pub async fn write_property(&self, field: &str, value: Value) -> Result<(), Error> {
        let hashed = matches!(self.placement, CredentialPlacement::HashedHeader(_));
        if hashed && self.nonce().is_none() {
            debug!("no device nonce yet; refreshing state before write");
            self.fetch_state().await?;
        }

        let url = self.state_url()?;

        let mut payload = Map::new();
        payload.insert(field.to_owned(), value);
        if let CredentialPlacement::Body(ref name) = self.placement {
            payload.insert(
                name.clone(),
                Value::String(self.credential.expose_secret().to_owned()),
            );
        }

        debug!(method = ?self.write_method, path = url.path(), field, "write device property");

        let resp = self
            .authorize(self.http.request(self.write_method.as_method(), url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        self.read_body(resp).await.map(drop)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.placement {
            CredentialPlacement::Header(ref name) => {
                req.header(name.as_str(), self.credential.expose_secret())
            }
            CredentialPlacement::HashedHeader(ref name) => match self.nonce() {
                Some(nonce) => req.header(
                    name.as_str(),
                    hashed_pin(&nonce, self.credential.expose_secret()),
                ),
                None => req,
            },
            CredentialPlacement::Query(_) | CredentialPlacement::Body(_) => req,
        }
    }

    /// The nonce from the last state document, if any.
    pub fn nonce(&self) -> Option<String> {
        self.nonce
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remember_nonce(&self, state: &DeviceState) {
        let nonce = state
            .get("meta")
            .and_then(|meta| meta.get("nonce"))
            .and_then(Value::as_str);
        if let Some(nonce) = nonce {
            *self.nonce.lock().unwrap_or_else(PoisonError::into_inner) = Some(nonce.to_owned());
        }
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Read the body, turning non-2xx responses and error envelopes into errors.
    async fn read_body(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.classify(e))?;

        if let Some(envelope) = RestExceptionResponse::parse(&body) {
            let status_code = if envelope.status_code == 0 {
                status.as_u16()
            } else {
                envelope.status_code
            };
            return Err(Error::Rejected {
                error_code: envelope.error_code,
                status_code,
            });
        }

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Some firmware answers writes with 204 and nothing else.
        if status == StatusCode::NO_CONTENT {
            return Ok(String::new());
        }

        Ok(body)
    }
}

/// `md5(nonce + md5(pin))` as lowercase hex.
pub fn hashed_pin(nonce: &str, pin: &str) -> String {
    let pin_digest = md5_hex(pin);
    md5_hex(&format!("{nonce}{pin_digest}"))
}

fn md5_hex(data: &str) -> String {
    let mut hasher = Md5::default();
    hasher.update(data.as_bytes());
    let digest = hasher.finalize();
    format!("{digest:x}")
}

/// Decode a body that must be a single JSON object.
fn decode_object(body: &str) -> Result<DeviceState, Error> {
    let value: Value = serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Deserialization {
            message: format!("expected a JSON object, got {}", json_kind(&other)),
            body: body.to_owned(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
