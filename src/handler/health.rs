use async_trait::async_trait;
use http::{Response, StatusCode};
use serde::Serialize;

use crate::{
    core::{SiteContext, SiteResult},
    model::timestamp,
    utils::{request::SiteRequest, response::ResponseBuilder},
};

use super::{Handler, Params};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    deployment: String,
    store: &'static str,
    notifications: bool,
}

/// Liveness probe. Always answers 200 while the process can serve.
pub struct HealthHandler;

#[async_trait]
impl Handler for HealthHandler {
    async fn handle(
        &self,
        ctx: &SiteContext,
        _request: &SiteRequest,
        _params: Params,
    ) -> SiteResult<Response<Vec<u8>>> {
        let response = HealthResponse {
            status: "ok",
            timestamp: timestamp::format(&timestamp::now()),
            deployment: ctx.deployment.to_string(),
            store: ctx.store_backend(),
            notifications: ctx.notifier.is_some(),
        };
        Ok(ResponseBuilder::json(StatusCode::OK, &response))
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::{config::Deployment, handler::testing::json_body};

    #[tokio::test]
    async fn test_health_without_dependencies() {
        let ctx = SiteContext::bare(Deployment::Edge);
        let req = SiteRequest::new(Method::GET, "/health");

        let resp = HealthHandler.handle(&ctx, &req, Params::new()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(&resp);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["deployment"], "edge");
        assert_eq!(body["store"], "none");
        assert!(timestamp::parse(body["timestamp"].as_str().unwrap()).is_ok());
    }
}
