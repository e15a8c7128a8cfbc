use async_trait::async_trait;

use crate::{
    config::{etcd::EtcdClientWrapper, Etcd},
    core::{ErrorContext, SiteResult},
    model::{
        timestamp, Analytics, AnalyticsEvent, Submission, SubmissionKind, TriageUpdate,
    },
};

use super::{sort_newest_first, SubmissionStore};

const ANALYTICS_KEY: &str = "analytics";

/// Key-value store used by the edge deployment.
///
/// Each submission is one JSON value at `{prefix}/{kind}/{id}`; the
/// running totals sit at `{prefix}/analytics`. Read-modify-write updates
/// are not transactional, which matches the best-effort counters.
pub struct KvStore {
    etcd: EtcdClientWrapper,
}

impl KvStore {
    pub fn new(config: Etcd) -> Self {
        Self {
            etcd: EtcdClientWrapper::new(config),
        }
    }

    fn key(kind: SubmissionKind, id: &str) -> String {
        format!("{}/{}", kind.key_segment(), id)
    }
}

#[async_trait]
impl SubmissionStore for KvStore {
    fn backend(&self) -> &'static str {
        "etcd"
    }

    async fn insert(&self, submission: &Submission) -> SiteResult<()> {
        let key = Self::key(submission.kind(), submission.id());
        self.etcd.put(&key, submission.to_json()?).await?;
        log::debug!("Stored {} at {}", submission.kind(), key);
        Ok(())
    }

    async fn list(&self, kind: SubmissionKind) -> SiteResult<Vec<Submission>> {
        let values = self.etcd.list(kind.key_segment()).await?;

        let mut submissions = Vec::with_capacity(values.len());
        for value in values {
            match Submission::decode(kind, &value) {
                Ok(submission) => submissions.push(submission),
                Err(e) => log::warn!("Skipping undecodable {kind} entry: {e}"),
            }
        }
        sort_newest_first(&mut submissions);
        Ok(submissions)
    }

    async fn update_triage(
        &self,
        kind: SubmissionKind,
        id: &str,
        update: &TriageUpdate,
    ) -> SiteResult<Option<Submission>> {
        let key = Self::key(kind, id);
        let Some(value) = self.etcd.get(&key).await? else {
            return Ok(None);
        };

        let mut submission = Submission::decode(kind, &value)?;
        submission.apply_triage(update, timestamp::now());
        self.etcd.put(&key, submission.to_json()?).await?;
        Ok(Some(submission))
    }

    async fn record(&self, event: AnalyticsEvent) -> SiteResult<Analytics> {
        let now = timestamp::now();
        let mut analytics = match self.etcd.get(ANALYTICS_KEY).await? {
            Some(value) => serde_json::from_slice(&value).storage_context("decode analytics")?,
            None => Analytics::new(now),
        };
        analytics.record(event, now);
        self.etcd
            .put(ANALYTICS_KEY, serde_json::to_vec(&analytics)?)
            .await?;
        Ok(analytics)
    }

    async fn analytics(&self) -> SiteResult<Option<Analytics>> {
        match self.etcd.get(ANALYTICS_KEY).await? {
            Some(value) => Ok(Some(
                serde_json::from_slice(&value).storage_context("decode analytics")?,
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_per_kind() {
        assert_eq!(KvStore::key(SubmissionKind::Contact, "abc"), "contacts/abc");
        assert_eq!(
            KvStore::key(SubmissionKind::PricingRequest, "abc"),
            "pricing_requests/abc"
        );
    }
}
