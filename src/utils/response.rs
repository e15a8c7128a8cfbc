//! Response builders shared by every handler.
//!
//! API responses use the `{success, message?, data?}` JSON envelope the
//! site's forms and admin pages expect.

use http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

use crate::core::SiteError;

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const TEXT_HTML: &str = "text/html; charset=utf-8";
    pub const APPLICATION_JSON: &str = "application/json";
}

#[derive(Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Build a response with an optional content type
    pub fn http(status: StatusCode, body: Vec<u8>, content_type: Option<&str>) -> Response<Vec<u8>> {
        let mut builder = Response::builder().status(status);

        if let Some(ct) = content_type {
            match HeaderValue::from_str(ct) {
                Ok(header_value) => {
                    builder = builder.header(header::CONTENT_TYPE, header_value);
                }
                Err(e) => {
                    log::error!("Invalid content type '{}': {}", ct, e);
                }
            }
        }

        builder.body(body).unwrap_or_else(|e| {
            log::error!("Failed to build response: {}", e);
            Self::error_http(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        })
    }

    /// Plain text fallback used when JSON cannot be produced
    pub fn error_http(status: StatusCode, message: &str) -> Response<Vec<u8>> {
        let mut resp = Response::new(message.as_bytes().to_vec());
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type::TEXT_PLAIN),
        );
        resp
    }

    pub fn empty(status: StatusCode) -> Response<Vec<u8>> {
        let mut resp = Response::new(Vec::new());
        *resp.status_mut() = status;
        resp
    }

    /// Serialize any value as a JSON response
    pub fn json<T: Serialize>(status: StatusCode, data: &T) -> Response<Vec<u8>> {
        match serde_json::to_vec(data) {
            Ok(json_body) => Self::http(status, json_body, Some(content_type::APPLICATION_JSON)),
            Err(e) => {
                log::error!("Failed to serialize JSON response: {}", e);
                Self::error_http(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "JSON serialization failed",
                )
            }
        }
    }

    /// `{success: true, message?, data?}`
    pub fn success<T: Serialize>(
        status: StatusCode,
        message: Option<&str>,
        data: Option<T>,
    ) -> Response<Vec<u8>> {
        Self::json(
            status,
            &Envelope {
                success: true,
                message,
                data,
                error: None,
            },
        )
    }

    /// `{success: false, message, data?}` with an explicit status
    pub fn failure<T: Serialize>(
        status: StatusCode,
        message: &str,
        data: Option<T>,
    ) -> Response<Vec<u8>> {
        Self::json(
            status,
            &Envelope {
                success: false,
                message: Some(message),
                data,
                error: None,
            },
        )
    }

    /// Maps a handler error to its status and JSON body.
    ///
    /// Server-side failures only carry their details when `expose` is set.
    pub fn site_error(err: &SiteError, expose: bool) -> Response<Vec<u8>> {
        let status = err.status();
        let error = (expose && status.is_server_error()).then(|| err.to_string());
        Self::json(
            status,
            &Envelope::<()> {
                success: false,
                message: Some(err.public_message()),
                data: None,
                error,
            },
        )
    }
}
