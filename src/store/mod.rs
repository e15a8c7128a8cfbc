//! Persistence backends for form submissions.
//!
//! Handlers only see [`SubmissionStore`]; the deployment decides which
//! implementation is built at startup (see [`build_store`]).

pub mod kv;
#[cfg(test)]
pub mod memory;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::{Deployment, Site},
    core::SiteResult,
    model::{Analytics, AnalyticsEvent, Submission, SubmissionKind, TriageUpdate},
};

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn insert(&self, submission: &Submission) -> SiteResult<()>;

    /// All submissions of a kind, newest first.
    async fn list(&self, kind: SubmissionKind) -> SiteResult<Vec<Submission>>;

    /// Applies a triage change. `None` when no submission has this id.
    async fn update_triage(
        &self,
        kind: SubmissionKind,
        id: &str,
        update: &TriageUpdate,
    ) -> SiteResult<Option<Submission>>;

    /// Bumps the running totals and returns the new record.
    async fn record(&self, event: AnalyticsEvent) -> SiteResult<Analytics>;

    async fn analytics(&self) -> SiteResult<Option<Analytics>>;
}

/// Builds the store for the configured deployment. `None` means the
/// deployment runs without persistence.
pub fn build_store(site: &Site) -> Option<Arc<dyn SubmissionStore>> {
    match site.deployment {
        Deployment::Server => site.mongodb.as_ref().map(|cfg| {
            log::info!("Using MongoDB store, database '{}'", cfg.database);
            Arc::new(mongo::MongoStore::new(cfg.clone())) as Arc<dyn SubmissionStore>
        }),
        Deployment::Edge => match site.etcd.as_ref() {
            Some(cfg) => {
                log::info!("Using etcd store under prefix '{}'", cfg.prefix);
                Some(Arc::new(kv::KvStore::new(cfg.clone())) as Arc<dyn SubmissionStore>)
            }
            None => {
                log::warn!("No etcd hosts configured, submissions will not be persisted");
                None
            }
        },
    }
}

/// Newest first; equal timestamps fall back to id for a stable order.
pub(crate) fn sort_newest_first(submissions: &mut [Submission]) {
    submissions.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(a.id()))
    });
}
