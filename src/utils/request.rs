use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use pingora::protocols::http::ServerSession;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::{SiteError, SiteResult};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// A fully read request, detached from the connection so handlers can be
/// driven directly in tests.
#[derive(Clone, Debug)]
pub struct SiteRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl SiteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, value: &Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(value.to_string())
    }

    /// Reads the header and the body, enforcing [`MAX_BODY_BYTES`].
    ///
    /// An oversized body yields the request head with an empty body plus the
    /// error, so the caller can still answer with CORS headers.
    pub async fn from_session(session: &mut ServerSession) -> (Self, Option<SiteError>) {
        let (method, path, headers) = {
            let req_header = session.req_header();
            (
                req_header.method.clone(),
                req_header.uri.path().to_string(),
                req_header.headers.clone(),
            )
        };
        let mut request = Self {
            method,
            path,
            headers,
            body: Vec::new(),
        };

        match read_request_body(session).await {
            Ok(body) => {
                request.body = body;
                (request, None)
            }
            Err(e) => (request, Some(e)),
        }
    }

    /// Retrieves a header value, `None` when absent or not valid UTF-8.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn origin(&self) -> Option<&str> {
        self.header(header::ORIGIN)
    }

    /// Parses the body as a JSON object.
    pub fn json_object(&self) -> SiteResult<Map<String, Value>> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Err(SiteError::Validation("Request body is required".into()));
        }
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SiteError::Validation(
                "Request body must be a JSON object".into(),
            )),
            Err(_) => Err(SiteError::Validation("Invalid JSON body".into())),
        }
    }

    /// Deserializes the body into `T`, reporting failures as validation errors.
    pub fn json<T: DeserializeOwned>(&self) -> SiteResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| SiteError::Validation(format!("Invalid request body: {e}")))
    }
}

async fn read_request_body(session: &mut ServerSession) -> SiteResult<Vec<u8>> {
    let mut body_data = Vec::new();
    loop {
        let chunk = session
            .read_request_body()
            .await
            .map_err(|e| SiteError::Validation(format!("Failed to read request body: {e}")))?;
        let Some(bytes) = chunk else {
            break;
        };
        if body_data.len() + bytes.len() > MAX_BODY_BYTES {
            return Err(SiteError::Validation("Request body too large".into()));
        }
        body_data.extend_from_slice(&bytes);
    }
    Ok(body_data)
}
