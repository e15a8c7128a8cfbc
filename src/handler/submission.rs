use async_trait::async_trait;
use http::{Response, StatusCode};
use serde::Serialize;

use crate::{
    config::Deployment,
    core::{SiteContext, SiteError, SiteResult},
    model::{rules, timestamp, AnalyticsEvent, Submission, SubmissionKind},
    utils::{request::SiteRequest, response::ResponseBuilder},
};

use super::{Handler, Params};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PricingReceipt<'a> {
    id: &'a str,
    form_type: &'static str,
}

/// Accepts a form post of one kind.
///
/// The document is persisted first; analytics and the admin email follow
/// in order and can only ever be logged, never fail the request.
pub struct SubmitHandler {
    kind: SubmissionKind,
}

impl SubmitHandler {
    pub fn new(kind: SubmissionKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Handler for SubmitHandler {
    async fn handle(
        &self,
        ctx: &SiteContext,
        request: &SiteRequest,
        _params: Params,
    ) -> SiteResult<Response<Vec<u8>>> {
        let payload = request.json_object()?;
        let fields = rules::normalize(self.kind.rules(), &payload)?;
        let submission = Submission::create(self.kind, &fields, timestamp::now())?;

        persist(ctx, &submission).await?;
        log::info!("Accepted {} {}", self.kind, submission.id());

        notify(ctx, &submission).await;

        Ok(match &submission {
            Submission::Contact(_) => ResponseBuilder::success(
                StatusCode::CREATED,
                Some("Message sent successfully"),
                None::<()>,
            ),
            Submission::Pricing(request) => ResponseBuilder::success(
                StatusCode::CREATED,
                Some("Your pricing request has been submitted successfully. We will get back to you soon!"),
                Some(PricingReceipt {
                    id: submission.id(),
                    form_type: request.form_type.as_str(),
                }),
            ),
        })
    }
}

async fn persist(ctx: &SiteContext, submission: &Submission) -> SiteResult<()> {
    let Some(store) = &ctx.store else {
        return match ctx.deployment {
            Deployment::Edge => {
                log::warn!(
                    "No store configured, {} {} accepted without persisting",
                    submission.kind(),
                    submission.id()
                );
                Ok(())
            }
            Deployment::Server => Err(SiteError::NotConfigured("Database not configured".into())),
        };
    };

    store.insert(submission).await?;

    if let Err(e) = store.record(AnalyticsEvent::Submission).await {
        log::warn!("Failed to update analytics: {e}");
    }
    Ok(())
}

async fn notify(ctx: &SiteContext, submission: &Submission) {
    let Some(notifier) = &ctx.notifier else {
        log::debug!("Notifications disabled, skipping email for {}", submission.id());
        return;
    };

    match notifier.notify_submission(submission).await {
        Ok(receipt) => log::info!(
            "Notification sent for {} (message id {})",
            submission.id(),
            receipt.message_id.as_deref().unwrap_or("unknown")
        ),
        Err(e) => log::error!("Failed to send email notification: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        handler::testing::json_body,
        model::{Priority, Status},
        notify::{fake::*, Notifier},
        store::{memory::MemoryStore, SubmissionStore},
    };

    fn post(path: &str, payload: Value) -> SiteRequest {
        SiteRequest::new(Method::POST, path).with_json(&payload)
    }

    fn server_ctx(store: Arc<MemoryStore>) -> SiteContext {
        SiteContext::bare(Deployment::Server).with_store(store)
    }

    async fn submit(
        ctx: &SiteContext,
        kind: SubmissionKind,
        payload: Value,
    ) -> SiteResult<Response<Vec<u8>>> {
        SubmitHandler::new(kind)
            .handle(ctx, &post("/api/contacts", payload), Params::new())
            .await
    }

    #[tokio::test]
    async fn test_valid_contact_is_stored_with_defaults() {
        let store = Arc::new(MemoryStore::new());
        let ctx = server_ctx(store.clone());

        let resp = submit(
            &ctx,
            SubmissionKind::Contact,
            json!({"name": "A", "email": "A@B.com", "message": "hi"}),
        )
        .await
        .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(json_body(&resp)["success"], true);

        let stored = store.all();
        assert_eq!(stored.len(), 1);
        let base = stored[0].base();
        assert_eq!(base.status, Status::New);
        assert_eq!(base.priority, Priority::Medium);
        assert_eq!(base.email, "a@b.com");
        assert_eq!(base.subject, "No Subject");
        assert_eq!(base.created_at, base.updated_at);

        let analytics = store.analytics().await.unwrap().unwrap();
        assert_eq!(analytics.total_contacts, 1);
    }

    #[tokio::test]
    async fn test_missing_required_fields_are_rejected_and_not_stored() {
        let store = Arc::new(MemoryStore::new());
        let ctx = server_ctx(store.clone());

        for payload in [
            json!({"email": "a@b.com", "message": "hi"}),
            json!({"name": "A", "message": "hi"}),
            json!({"name": "A", "email": "a@b.com"}),
            json!({"name": "  ", "email": "a@b.com", "message": "hi"}),
        ] {
            let res = submit(&ctx, SubmissionKind::Contact, payload.clone()).await;
            assert!(
                matches!(res, Err(SiteError::Validation(_))),
                "payload {payload} should be rejected"
            );
        }
        assert_eq!(store.count(SubmissionKind::Contact), 0);
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let ctx = server_ctx(store.clone());

        for email in ["bad", "a@nodot", "no-at.com"] {
            let res = submit(
                &ctx,
                SubmissionKind::Contact,
                json!({"name": "A", "email": email, "message": "hi"}),
            )
            .await;
            match res {
                Err(SiteError::Validation(msg)) => {
                    assert_eq!(msg, "Please enter a valid email address")
                }
                other => panic!("unexpected result for {email}: {other:?}"),
            }
        }
        assert_eq!(store.count(SubmissionKind::Contact), 0);
    }

    #[tokio::test]
    async fn test_server_managed_fields_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let ctx = server_ctx(store.clone());

        submit(
            &ctx,
            SubmissionKind::Contact,
            json!({
                "name": "A", "email": "a@b.com", "message": "hi",
                "_id": "chosen", "status": "closed", "priority": "high"
            }),
        )
        .await
        .unwrap();

        let stored = store.all();
        assert_ne!(stored[0].id(), "chosen");
        assert_eq!(stored[0].base().status, Status::New);
        assert_eq!(stored[0].base().priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_pricing_response_carries_id_and_form_type() {
        let store = Arc::new(MemoryStore::new());
        let ctx = server_ctx(store.clone());

        let resp = submit(
            &ctx,
            SubmissionKind::PricingRequest,
            json!({
                "name": "A", "email": "a@b.com", "message": "hi",
                "formType": "custom_development", "services": "Web App"
            }),
        )
        .await
        .unwrap();

        let body = json_body(&resp);
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body["data"]["formType"], "custom_development");
        let stored = store.all();
        assert_eq!(body["data"]["id"], stored[0].id());
        match &stored[0] {
            Submission::Pricing(p) => assert_eq!(p.services, vec!["Web App".to_string()]),
            other => panic!("unexpected submission {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_form_type_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let ctx = server_ctx(store.clone());

        let res = submit(
            &ctx,
            SubmissionKind::PricingRequest,
            json!({"name": "A", "email": "a@b.com", "message": "hi", "formType": "other"}),
        )
        .await;
        assert!(matches!(res, Err(SiteError::Validation(_))));
        assert_eq!(store.count(SubmissionKind::PricingRequest), 0);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_submission() {
        let store = Arc::new(MemoryStore::new());
        let ctx = server_ctx(store.clone())
            .with_notifier(Notifier::new(Arc::new(RejectingMailer), "admin@example.com"));

        let resp = submit(
            &ctx,
            SubmissionKind::Contact,
            json!({"name": "A", "email": "a@b.com", "message": "hi"}),
        )
        .await
        .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(json_body(&resp)["success"], true);
        assert_eq!(store.count(SubmissionKind::Contact), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_skips_notification() {
        let mailer = Arc::new(RecordingMailer::default());
        let ctx = SiteContext::bare(Deployment::Server)
            .with_store(Arc::new(MemoryStore::failing()))
            .with_notifier(Notifier::new(mailer.clone(), "admin@example.com"));

        let res = submit(
            &ctx,
            SubmissionKind::Contact,
            json!({"name": "A", "email": "a@b.com", "message": "hi"}),
        )
        .await;

        assert!(matches!(res, Err(SiteError::Storage(_))));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edge_without_store_still_notifies() {
        let mailer = Arc::new(RecordingMailer::default());
        let ctx = SiteContext::bare(Deployment::Edge)
            .with_notifier(Notifier::new(mailer.clone(), "admin@example.com"));

        let resp = submit(
            &ctx,
            SubmissionKind::Contact,
            json!({"name": "A", "email": "a@b.com", "message": "hi"}),
        )
        .await
        .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected() {
        let ctx = server_ctx(Arc::new(MemoryStore::new()));
        let req = SiteRequest::new(Method::POST, "/api/contacts").with_body("{oops");

        let res = SubmitHandler::new(SubmissionKind::Contact)
            .handle(&ctx, &req, Params::new())
            .await;
        assert!(matches!(res, Err(SiteError::Validation(_))));
    }
}
