use std::collections::HashSet;

use http::{header, HeaderMap, HeaderValue};

use crate::config::{Cors, Deployment};

/// Compiled CORS settings applied to every response.
#[derive(Debug)]
pub struct CorsPolicy {
    any_origin: bool,
    allow_origins: HashSet<String>,
    allow_methods: String,
    allow_headers: String,
    max_age: i32,
    allow_credential: bool,
}

impl CorsPolicy {
    pub fn new(config: &Cors) -> Self {
        let any_origin = config.allow_origins.trim() == "*";
        let allow_origins = if any_origin {
            HashSet::new()
        } else {
            config
                .allow_origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        };

        Self {
            any_origin,
            allow_origins,
            allow_methods: config.allow_methods.clone(),
            allow_headers: config.allow_headers.clone(),
            max_age: config.max_age,
            allow_credential: config.allow_credential,
        }
    }

    /// Configured policy, or the deployment's default.
    pub fn for_deployment(config: Option<&Cors>, deployment: Deployment) -> Self {
        match (config, deployment) {
            (Some(cors), _) => Self::new(cors),
            (None, Deployment::Server) => Self::new(&Cors::server_default()),
            (None, Deployment::Edge) => Self::new(&Cors::edge_default()),
        }
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.any_origin || self.allow_origins.contains(origin)
    }

    pub fn apply(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        let allow_origin = if self.any_origin {
            HeaderValue::from_static("*")
        } else {
            match origin
                .filter(|o| self.is_origin_allowed(o))
                .and_then(|o| HeaderValue::from_str(o).ok())
            {
                Some(value) => value,
                None => return,
            }
        };

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        if self.allow_credential {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if let Ok(methods) = HeaderValue::from_str(&self.allow_methods) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
        }
        if let Ok(allow) = HeaderValue::from_str(&self.allow_headers) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allow);
        }
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(self.max_age));
        if !self.any_origin {
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
    }
}
