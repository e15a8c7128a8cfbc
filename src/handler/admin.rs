use std::collections::BTreeMap;

use async_trait::async_trait;
use http::{Response, StatusCode};
use serde::Serialize;

use crate::{
    core::{SiteContext, SiteError, SiteResult},
    model::{Analytics, AnalyticsEvent, Priority, Status, SubmissionKind, TriageUpdate},
    store::SubmissionStore,
    utils::{request::SiteRequest, response::ResponseBuilder},
};

use super::{Handler, Params};

const API_KEY_HEADER: &str = "x-api-key";
const NO_DATABASE: &str = "Database not configured";

/// Rejects the request unless it carries the configured admin key. Without
/// a configured key every request passes.
fn authorize(ctx: &SiteContext, request: &SiteRequest) -> SiteResult<()> {
    let Some(expected) = &ctx.admin_api_key else {
        return Ok(());
    };
    match request.header(API_KEY_HEADER) {
        Some(key) if key == expected => Ok(()),
        _ => Err(SiteError::Unauthorized("Must provide a valid api key".into())),
    }
}

fn require_store(ctx: &SiteContext) -> SiteResult<&dyn SubmissionStore> {
    ctx.store
        .as_deref()
        .ok_or_else(|| SiteError::NotConfigured(NO_DATABASE.into()))
}

/// Lists one kind, newest first. Degrades to 503 with an empty list when
/// no store is configured.
pub struct ListHandler {
    kind: SubmissionKind,
}

impl ListHandler {
    pub fn new(kind: SubmissionKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Handler for ListHandler {
    async fn handle(
        &self,
        ctx: &SiteContext,
        request: &SiteRequest,
        _params: Params,
    ) -> SiteResult<Response<Vec<u8>>> {
        authorize(ctx, request)?;

        let Some(store) = &ctx.store else {
            log::warn!("Listing {} requested but no store is configured", self.kind);
            return Ok(ResponseBuilder::failure(
                StatusCode::SERVICE_UNAVAILABLE,
                NO_DATABASE,
                Some(Vec::<()>::new()),
            ));
        };

        let submissions = store.list(self.kind).await?;
        Ok(ResponseBuilder::success(StatusCode::OK, None, Some(submissions)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    total_contacts: usize,
    total_pricing_requests: usize,
    contacts_by_status: BTreeMap<&'static str, usize>,
    contacts_by_priority: BTreeMap<&'static str, usize>,
    analytics: Option<Analytics>,
}

/// Dashboard counters derived from the stored contacts plus the running
/// analytics record.
pub struct StatsHandler;

#[async_trait]
impl Handler for StatsHandler {
    async fn handle(
        &self,
        ctx: &SiteContext,
        request: &SiteRequest,
        _params: Params,
    ) -> SiteResult<Response<Vec<u8>>> {
        authorize(ctx, request)?;
        let store = require_store(ctx)?;

        let contacts = store.list(SubmissionKind::Contact).await?;
        let pricing = store.list(SubmissionKind::PricingRequest).await?;

        let mut by_status: BTreeMap<_, _> = Status::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        let mut by_priority: BTreeMap<_, _> =
            Priority::ALL.iter().map(|p| (p.as_str(), 0)).collect();
        for contact in &contacts {
            *by_status.entry(contact.base().status.as_str()).or_default() += 1;
            *by_priority.entry(contact.base().priority.as_str()).or_default() += 1;
        }

        let stats = Stats {
            total_contacts: contacts.len(),
            total_pricing_requests: pricing.len(),
            contacts_by_status: by_status,
            contacts_by_priority: by_priority,
            analytics: store.analytics().await?,
        };
        Ok(ResponseBuilder::success(StatusCode::OK, None, Some(stats)))
    }
}

/// Changes status and/or priority of one submission.
pub struct TriageHandler {
    kind: SubmissionKind,
}

impl TriageHandler {
    pub fn new(kind: SubmissionKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Handler for TriageHandler {
    async fn handle(
        &self,
        ctx: &SiteContext,
        request: &SiteRequest,
        params: Params,
    ) -> SiteResult<Response<Vec<u8>>> {
        authorize(ctx, request)?;

        let id = params
            .get("id")
            .ok_or_else(|| SiteError::Validation("Missing submission id".into()))?;
        let update: TriageUpdate = request.json()?;
        if update.is_empty() {
            return Err(SiteError::Validation(
                "Provide a status or priority to update".into(),
            ));
        }

        let store = require_store(ctx)?;
        let updated = store
            .update_triage(self.kind, id, &update)
            .await?
            .ok_or_else(|| SiteError::NotFound(format!("No {} with id {id}", self.kind)))?;

        if update.status.is_some() {
            if let Err(e) = store.record(AnalyticsEvent::StatusChange).await {
                log::warn!("Failed to update analytics: {e}");
            }
        }

        log::info!("Updated {} {}", self.kind, id);
        Ok(ResponseBuilder::success(
            StatusCode::OK,
            Some("Submission updated"),
            Some(updated),
        ))
    }
}
