//! Document shapes for form submissions and the analytics counter.

pub mod analytics;
pub mod contact;
pub mod pricing;
pub mod rules;
pub mod timestamp;

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::core::{SiteError, SiteResult};

pub use analytics::{Analytics, AnalyticsEvent, ANALYTICS_ID};
pub use contact::ContactSubmission;
pub use pricing::PricingRequest;
pub use rules::{FieldRule, NormalizedFields, CONTACT_RULES, PRICING_RULES};

/// `local@domain.tld`, no whitespace and a single `@`.
pub static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    New,
    InProgress,
    Completed,
    Closed,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::New,
        Status::InProgress,
        Status::Completed,
        Status::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Closed => "closed",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Which pricing form on the site produced a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    BusinessItSolutions,
    CloudInfrastructure,
    CustomDevelopment,
    #[default]
    General,
}

impl FormType {
    pub const NAMES: &'static [&'static str] = &[
        "business_it_solutions",
        "cloud_infrastructure",
        "custom_development",
        "general",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::BusinessItSolutions => "business_it_solutions",
            FormType::CloudInfrastructure => "cloud_infrastructure",
            FormType::CustomDevelopment => "custom_development",
            FormType::General => "general",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FormType::BusinessItSolutions => "Business IT Solutions",
            FormType::CloudInfrastructure => "Cloud Infrastructure",
            FormType::CustomDevelopment => "Custom Development",
            FormType::General => "General",
        }
    }
}

impl FromStr for FormType {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business_it_solutions" => Ok(FormType::BusinessItSolutions),
            "cloud_infrastructure" => Ok(FormType::CloudInfrastructure),
            "custom_development" => Ok(FormType::CustomDevelopment),
            "general" => Ok(FormType::General),
            other => Err(SiteError::Validation(format!("Invalid formType: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubmissionKind {
    Contact,
    PricingRequest,
}

impl SubmissionKind {
    pub const ALL: [SubmissionKind; 2] = [SubmissionKind::Contact, SubmissionKind::PricingRequest];

    /// MongoDB collection name.
    pub fn collection(&self) -> &'static str {
        match self {
            SubmissionKind::Contact => "contacts",
            SubmissionKind::PricingRequest => "pricingrequests",
        }
    }

    /// Key segment under the KV prefix.
    pub fn key_segment(&self) -> &'static str {
        match self {
            SubmissionKind::Contact => "contacts",
            SubmissionKind::PricingRequest => "pricing_requests",
        }
    }

    pub fn rules(&self) -> &'static [FieldRule] {
        match self {
            SubmissionKind::Contact => CONTACT_RULES,
            SubmissionKind::PricingRequest => PRICING_RULES,
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionKind::Contact => write!(f, "contact"),
            SubmissionKind::PricingRequest => write!(f, "pricing request"),
        }
    }
}

/// Admin triage change. At least one field must be set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriageUpdate {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
}

impl TriageUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none()
    }
}

/// A persisted form submission of either kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Submission {
    Contact(ContactSubmission),
    Pricing(PricingRequest),
}

impl Submission {
    /// Builds a new document from normalized fields. Server-managed fields
    /// (id, status, priority, timestamps) are assigned here and nowhere else.
    pub fn create(
        kind: SubmissionKind,
        fields: &NormalizedFields,
        now: DateTime<Utc>,
    ) -> SiteResult<Self> {
        let id = uuid::Uuid::new_v4().to_string();
        let submission = match kind {
            SubmissionKind::Contact => {
                Submission::Contact(ContactSubmission::from_fields(id, fields, now))
            }
            SubmissionKind::PricingRequest => {
                Submission::Pricing(PricingRequest::from_fields(id, fields, now)?)
            }
        };
        submission.validate()?;
        Ok(submission)
    }

    /// Decodes a stored JSON document of the given kind.
    pub fn decode(kind: SubmissionKind, bytes: &[u8]) -> SiteResult<Self> {
        Ok(match kind {
            SubmissionKind::Contact => Submission::Contact(serde_json::from_slice(bytes)?),
            SubmissionKind::PricingRequest => Submission::Pricing(serde_json::from_slice(bytes)?),
        })
    }

    pub fn kind(&self) -> SubmissionKind {
        match self {
            Submission::Contact(_) => SubmissionKind::Contact,
            Submission::Pricing(_) => SubmissionKind::PricingRequest,
        }
    }

    /// Fields shared by both kinds.
    pub fn base(&self) -> &ContactSubmission {
        match self {
            Submission::Contact(c) => c,
            Submission::Pricing(p) => &p.contact,
        }
    }

    fn base_mut(&mut self) -> &mut ContactSubmission {
        match self {
            Submission::Contact(c) => c,
            Submission::Pricing(p) => &mut p.contact,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.base().created_at
    }

    pub fn apply_triage(&mut self, update: &TriageUpdate, now: DateTime<Utc>) {
        let base = self.base_mut();
        if let Some(status) = update.status {
            base.status = status;
        }
        if let Some(priority) = update.priority {
            base.priority = priority;
        }
        base.updated_at = now;
    }

    pub fn validate(&self) -> SiteResult<()> {
        let result = match self {
            Submission::Contact(c) => c.validate(),
            Submission::Pricing(p) => p.validate(),
        };
        result.map_err(|errors| SiteError::Validation(first_message(&errors)))
    }

    pub fn to_json(&self) -> SiteResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Picks a deterministic, human readable message out of a validator report.
fn first_message(errors: &ValidationErrors) -> String {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in entries {
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    return match &err.message {
                        Some(msg) => msg.to_string(),
                        None => format!("{field} is invalid"),
                    };
                }
            }
            ValidationErrorsKind::Struct(nested) => return first_message(nested),
            ValidationErrorsKind::List(items) => {
                if let Some(nested) = items.values().next() {
                    return first_message(nested);
                }
            }
        }
    }
    "Invalid submission".to_string()
}
