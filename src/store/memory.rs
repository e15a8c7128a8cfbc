//! In-process store for handler tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    core::{SiteError, SiteResult},
    model::{
        timestamp, Analytics, AnalyticsEvent, Submission, SubmissionKind, TriageUpdate,
    },
};

use super::{sort_newest_first, SubmissionStore};

#[derive(Default)]
pub struct MemoryStore {
    submissions: Mutex<Vec<Submission>>,
    analytics: Mutex<Option<Analytics>>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails with a storage error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with(submissions: Vec<Submission>) -> Self {
        Self {
            submissions: Mutex::new(submissions),
            ..Self::default()
        }
    }

    pub fn count(&self, kind: SubmissionKind) -> usize {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.kind() == kind)
            .count()
    }

    pub fn all(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    fn check(&self) -> SiteResult<()> {
        if self.failing {
            Err(SiteError::Storage("memory store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, submission: &Submission) -> SiteResult<()> {
        self.check()?;
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(())
    }

    async fn list(&self, kind: SubmissionKind) -> SiteResult<Vec<Submission>> {
        self.check()?;
        let mut list: Vec<_> = self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.kind() == kind)
            .cloned()
            .collect();
        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn update_triage(
        &self,
        kind: SubmissionKind,
        id: &str,
        update: &TriageUpdate,
    ) -> SiteResult<Option<Submission>> {
        self.check()?;
        let mut submissions = self.submissions.lock().unwrap();
        Ok(submissions
            .iter_mut()
            .find(|s| s.kind() == kind && s.id() == id)
            .map(|s| {
                s.apply_triage(update, timestamp::now());
                s.clone()
            }))
    }

    async fn record(&self, event: AnalyticsEvent) -> SiteResult<Analytics> {
        self.check()?;
        let now = timestamp::now();
        let mut analytics = self.analytics.lock().unwrap();
        let record = analytics.get_or_insert_with(|| Analytics::new(now));
        record.record(event, now);
        Ok(record.clone())
    }

    async fn analytics(&self) -> SiteResult<Option<Analytics>> {
        self.check()?;
        Ok(self.analytics.lock().unwrap().clone())
    }
}
