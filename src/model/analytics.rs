use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// Id of the single running-totals record.
pub const ANALYTICS_ID: &str = "site";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalyticsEvent {
    Submission,
    StatusChange,
}

impl AnalyticsEvent {
    pub fn field(&self) -> &'static str {
        match self {
            AnalyticsEvent::Submission => "total_contacts",
            AnalyticsEvent::StatusChange => "status_changes",
        }
    }
}

/// Running totals. Counters are bumped opportunistically after the primary
/// write, so they may lag the real document count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub total_contacts: i64,
    #[serde(default)]
    pub status_changes: i64,
    #[serde(with = "timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl Analytics {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: ANALYTICS_ID.to_string(),
            total_contacts: 0,
            status_changes: 0,
            last_updated: now,
        }
    }

    pub fn record(&mut self, event: AnalyticsEvent, now: DateTime<Utc>) {
        match event {
            AnalyticsEvent::Submission => self.total_contacts += 1,
            AnalyticsEvent::StatusChange => self.status_changes += 1,
        }
        self.last_updated = now;
    }
}
