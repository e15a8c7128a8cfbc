//! Request classification and the top-level error boundary.
//!
//! Every request ends up in exactly one branch: preflight, a routed API
//! handler, the API not-found answer, or the static responder. CORS and the
//! security headers are added to whatever comes back.

use std::{any::Any, collections::HashMap, panic::AssertUnwindSafe};

use futures::FutureExt;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use matchit::{Match, Router};

use crate::{
    core::{SiteContext, SiteError},
    handler::{
        admin::{ListHandler, StatsHandler, TriageHandler},
        catalog::CatalogHandler,
        health::HealthHandler,
        submission::SubmitHandler,
        Handler, Params,
    },
    model::SubmissionKind,
    utils::{request::SiteRequest, response::ResponseBuilder},
};

use super::{assets::StaticAssets, cors::CorsPolicy};

type Routes = HashMap<Method, Box<dyn Handler + Send + Sync>>;

const SECURITY_HEADERS: [(&str, &str); 3] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-xss-protection", "1; mode=block"),
];

pub struct Dispatcher {
    ctx: SiteContext,
    router: Router<Routes>,
    cors: CorsPolicy,
    assets: StaticAssets,
}

impl Dispatcher {
    pub fn new(ctx: SiteContext, cors: CorsPolicy, assets: StaticAssets) -> Self {
        use SubmissionKind::{Contact, PricingRequest};

        let mut this = Self {
            ctx,
            router: Router::new(),
            cors,
            assets,
        };

        this.route("/health", Method::GET, Box::new(HealthHandler))
            .route("/api/health", Method::GET, Box::new(HealthHandler))
            .route("/api/services", Method::GET, Box::new(CatalogHandler::Services))
            .route("/api/team", Method::GET, Box::new(CatalogHandler::Team));

        for path in ["/api/contacts", "/api/contact"] {
            this.route(path, Method::POST, Box::new(SubmitHandler::new(Contact)));
        }
        for path in ["/api/pricing-requests", "/api/pricing-request"] {
            this.route(path, Method::POST, Box::new(SubmitHandler::new(PricingRequest)));
        }

        for path in ["/api/contacts", "/api/admin/contacts"] {
            this.route(path, Method::GET, Box::new(ListHandler::new(Contact)));
        }
        for path in ["/api/pricing-requests", "/api/admin/pricing-requests"] {
            this.route(path, Method::GET, Box::new(ListHandler::new(PricingRequest)));
        }

        this.route("/api/admin/stats", Method::GET, Box::new(StatsHandler))
            .route(
                "/api/admin/contacts/{id}",
                Method::PATCH,
                Box::new(TriageHandler::new(Contact)),
            )
            .route(
                "/api/admin/pricing-requests/{id}",
                Method::PATCH,
                Box::new(TriageHandler::new(PricingRequest)),
            );

        this
    }

    /// Adds a handler for one method on a path
    fn route(
        &mut self,
        path: &str,
        method: Method,
        handler: Box<dyn Handler + Send + Sync>,
    ) -> &mut Self {
        if let Ok(routes) = self.router.at_mut(path) {
            routes.value.insert(method, handler);
        } else {
            let mut routes = HashMap::new();
            routes.insert(method, handler);
            if let Err(e) = self.router.insert(path, routes) {
                log::error!("Failed to register route {path}: {e}");
            }
        }
        self
    }

    /// Answers one request. `read_error` carries a failure from reading the
    /// body, which is reported without routing.
    pub async fn dispatch(
        &self,
        request: &SiteRequest,
        read_error: Option<SiteError>,
    ) -> Response<Vec<u8>> {
        let mut resp = if request.method == Method::OPTIONS {
            ResponseBuilder::empty(StatusCode::NO_CONTENT)
        } else if let Some(err) = read_error {
            self.error_response(request, &err)
        } else {
            AssertUnwindSafe(self.route_request(request))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    log::error!(
                        "Handler panicked on {} {}: {}",
                        request.method,
                        request.path,
                        panic_message(&*panic)
                    );
                    self.error_response(request, &SiteError::Internal(panic_message(&*panic)))
                })
        };

        self.cors.apply(request.origin(), resp.headers_mut());
        add_security_headers(resp.headers_mut());
        resp
    }

    async fn route_request(&self, request: &SiteRequest) -> Response<Vec<u8>> {
        let routed = match self.router.at(&request.path) {
            Ok(Match { value, params }) => value.get(&request.method).map(|handler| {
                let params: Params = params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                (handler, params)
            }),
            Err(_) => None,
        };

        if let Some((handler, params)) = routed {
            return match handler.handle(&self.ctx, request, params).await {
                Ok(resp) => resp,
                Err(e) => self.error_response(request, &e),
            };
        }

        if is_api_path(&request.path) || !matches!(request.method, Method::GET | Method::HEAD) {
            log::debug!("No route for {} {}", request.method, request.path);
            return ResponseBuilder::failure(StatusCode::NOT_FOUND, "API endpoint not found", None::<()>);
        }

        match self.assets.serve(&request.path).await {
            Ok(resp) => resp,
            Err(e) => self.error_response(request, &e),
        }
    }

    fn error_response(&self, request: &SiteRequest, err: &SiteError) -> Response<Vec<u8>> {
        if err.status().is_server_error() {
            log::error!("{} {} failed: {err}", request.method, request.path);
        } else {
            log::debug!("{} {} rejected: {err}", request.method, request.path);
        }
        ResponseBuilder::site_error(err, self.ctx.expose_errors)
    }
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn add_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use http::header;

    use super::*;
    use crate::{
        config::Deployment,
        core::SiteResult,
        store::{memory::MemoryStore, SubmissionStore},
    };

    fn dispatcher(ctx: SiteContext) -> Dispatcher {
        let deployment = ctx.deployment;
        Dispatcher::new(
            ctx,
            CorsPolicy::for_deployment(None, deployment),
            StaticAssets::new(None),
        )
    }

    fn body(resp: &Response<Vec<u8>>) -> Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn test_preflight_short_circuits_any_path() {
        let d = dispatcher(SiteContext::bare(Deployment::Edge));

        for path in ["/api/contacts", "/api/nope", "/whatever"] {
            let resp = d
                .dispatch(&SiteRequest::new(Method::OPTIONS, path), None)
                .await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
            assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        }
    }

    #[tokio::test]
    async fn test_unknown_api_path_is_not_found() {
        let d = dispatcher(SiteContext::bare(Deployment::Edge));

        let resp = d
            .dispatch(&SiteRequest::new(Method::GET, "/api/unknown"), None)
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&resp)["success"], false);

        let resp = d
            .dispatch(&SiteRequest::new(Method::DELETE, "/api/contacts"), None)
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_catalog_routes_are_served() {
        let d = dispatcher(SiteContext::bare(Deployment::Server));

        for (path, len) in [("/api/services", 7), ("/api/team", 4)] {
            let resp = d.dispatch(&SiteRequest::new(Method::GET, path), None).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body = body(&resp);
            assert_eq!(body["success"], true);
            assert_eq!(body["data"].as_array().unwrap().len(), len);
        }
    }

    #[tokio::test]
    async fn test_security_headers_on_every_response() {
        let d = dispatcher(SiteContext::bare(Deployment::Server));

        let resp = d
            .dispatch(&SiteRequest::new(Method::GET, "/health"), None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
        assert_eq!(resp.headers()["x-frame-options"], "SAMEORIGIN");
        assert_eq!(resp.headers()["x-xss-protection"], "1; mode=block");
    }

    #[tokio::test]
    async fn test_submit_and_list_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let d = dispatcher(SiteContext::bare(Deployment::Server).with_store(store.clone()));

        let submit = SiteRequest::new(Method::POST, "/api/contact")
            .with_json(&json!({"name": "A", "email": "a@b.com", "message": "hi"}));
        let resp = d.dispatch(&submit, None).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let bad = SiteRequest::new(Method::POST, "/api/contacts")
            .with_json(&json!({"name": "A", "email": "bad", "message": "hi"}));
        let resp = d.dispatch(&bad, None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body(&resp),
            json!({"success": false, "message": "Please enter a valid email address"})
        );

        let resp = d
            .dispatch(&SiteRequest::new(Method::GET, "/api/admin/contacts"), None)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp)["data"].as_array().unwrap().len(), 1);
        assert_eq!(store.count(SubmissionKind::Contact), 1);
    }

    #[tokio::test]
    async fn test_patch_route_passes_id() {
        let store = Arc::new(MemoryStore::new());
        let d = dispatcher(SiteContext::bare(Deployment::Server).with_store(store.clone()));

        let submit = SiteRequest::new(Method::POST, "/api/pricing-requests")
            .with_json(&json!({"name": "A", "email": "a@b.com", "message": "hi"}));
        let created = body(&d.dispatch(&submit, None).await);
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let patch = SiteRequest::new(Method::PATCH, format!("/api/admin/pricing-requests/{id}"))
            .with_json(&json!({"priority": "high"}));
        let resp = d.dispatch(&patch, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp)["data"]["priority"], "high");
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        let d = dispatcher(SiteContext::bare(Deployment::Edge));
        let resp = d
            .dispatch(
                &SiteRequest::new(Method::POST, "/api/contacts"),
                Some(SiteError::Validation("Request body too large".into())),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&resp)["message"], "Request body too large");
    }

    #[tokio::test]
    async fn test_static_fallback_for_non_api_paths() {
        let d = dispatcher(SiteContext::bare(Deployment::Edge));

        let resp = d.dispatch(&SiteRequest::new(Method::GET, "/"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");

        let resp = d
            .dispatch(&SiteRequest::new(Method::GET, "/missing"), None)
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    struct PanickingStore;

    #[async_trait]
    impl SubmissionStore for PanickingStore {
        fn backend(&self) -> &'static str {
            "panicking"
        }
        async fn insert(&self, _: &crate::model::Submission) -> SiteResult<()> {
            panic!("store exploded")
        }
        async fn list(&self, _: SubmissionKind) -> SiteResult<Vec<crate::model::Submission>> {
            panic!("store exploded")
        }
        async fn update_triage(
            &self,
            _: SubmissionKind,
            _: &str,
            _: &crate::model::TriageUpdate,
        ) -> SiteResult<Option<crate::model::Submission>> {
            panic!("store exploded")
        }
        async fn record(
            &self,
            _: crate::model::AnalyticsEvent,
        ) -> SiteResult<crate::model::Analytics> {
            panic!("store exploded")
        }
        async fn analytics(&self) -> SiteResult<Option<crate::model::Analytics>> {
            panic!("store exploded")
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_json_500() {
        let d = dispatcher(SiteContext::bare(Deployment::Server).with_store(Arc::new(PanickingStore)));

        let resp = d
            .dispatch(&SiteRequest::new(Method::GET, "/api/contacts"), None)
            .await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(&resp),
            json!({"success": false, "message": "Internal server error"})
        );
        assert_eq!(resp.headers()["x-frame-options"], "SAMEORIGIN");
    }
}
