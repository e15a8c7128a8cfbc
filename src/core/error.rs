//! Unified error handling for the site backend
//!
//! Every handler returns [`SiteResult`]; the HTTP layer maps each variant to
//! a status code, so storage, mail and validation code never build responses
//! themselves.

use std::fmt;

use http::StatusCode;

/// Unified error types for request handling
#[derive(Debug)]
pub enum SiteError {
    /// Client input is malformed or incomplete
    Validation(String),

    /// Admin credentials missing or wrong
    Unauthorized(String),

    /// Addressed document does not exist
    NotFound(String),

    /// Persistence layer unreachable or write failed
    Storage(String),

    /// Upstream mail API rejected or failed the request
    Delivery(String),

    /// An optional external dependency is not configured
    NotConfigured(String),

    /// Anything else
    Internal(String),
}

impl SiteError {
    /// HTTP status a handler error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            SiteError::Validation(_) => StatusCode::BAD_REQUEST,
            SiteError::Unauthorized(_) => StatusCode::FORBIDDEN,
            SiteError::NotFound(_) => StatusCode::NOT_FOUND,
            SiteError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            SiteError::Storage(_)
            | SiteError::Delivery(_)
            | SiteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to a client.
    ///
    /// Client-facing variants carry their own text; server-side failures are
    /// reduced to a generic message so driver errors never leak.
    pub fn public_message(&self) -> &str {
        match self {
            SiteError::Validation(msg)
            | SiteError::Unauthorized(msg)
            | SiteError::NotFound(msg)
            | SiteError::NotConfigured(msg) => msg,
            _ => "Internal server error",
        }
    }
}

impl fmt::Display for SiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteError::Validation(msg) => write!(f, "Validation error: {msg}"),
            SiteError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            SiteError::NotFound(msg) => write!(f, "Resource not found: {msg}"),
            SiteError::Storage(msg) => write!(f, "Storage error: {msg}"),
            SiteError::Delivery(msg) => write!(f, "Delivery error: {msg}"),
            SiteError::NotConfigured(msg) => write!(f, "Not configured: {msg}"),
            SiteError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for SiteError {}

// Error conversions
impl From<mongodb::error::Error> for SiteError {
    fn from(err: mongodb::error::Error) -> Self {
        SiteError::Storage(format!("mongodb: {err}"))
    }
}

impl From<etcd_client::Error> for SiteError {
    fn from(err: etcd_client::Error) -> Self {
        SiteError::Storage(format!("etcd: {err}"))
    }
}

impl From<reqwest::Error> for SiteError {
    fn from(err: reqwest::Error) -> Self {
        SiteError::Delivery(format!("mail transport: {err}"))
    }
}

impl From<serde_json::Error> for SiteError {
    fn from(err: serde_json::Error) -> Self {
        SiteError::Internal(format!("json: {err}"))
    }
}

/// Result type alias for site operations
pub type SiteResult<T> = std::result::Result<T, SiteError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn storage_context(self, context: &str) -> SiteResult<T>;
    fn internal_context(self, context: &str) -> SiteResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn storage_context(self, context: &str) -> SiteResult<T> {
        self.map_err(|e| SiteError::Storage(format!("{context}: {e}")))
    }

    fn internal_context(self, context: &str) -> SiteResult<T> {
        self.map_err(|e| SiteError::Internal(format!("{context}: {e}")))
    }
}
