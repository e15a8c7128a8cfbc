use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{timestamp, NormalizedFields, Priority, Status, ANALYTICS_ID, EMAIL_PATTERN};

/// A message sent through the site's contact form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContactSubmission {
    #[serde(rename = "_id")]
    pub id: String,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(regex(path = *EMAIL_PATTERN, message = "Please enter a valid email address"))]
    pub email: String,

    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub service: String,
    #[serde(default = "ContactSubmission::default_subject")]
    pub subject: String,

    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,

    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_id: Option<String>,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl ContactSubmission {
    fn default_subject() -> String {
        "No Subject".to_string()
    }

    pub fn from_fields(id: String, fields: &NormalizedFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.text("name"),
            email: fields.text("email"),
            company: fields.text("company"),
            phone: fields.text("phone"),
            service: fields.text("service"),
            subject: fields.text("subject"),
            message: fields.text("message"),
            status: Status::default(),
            priority: Priority::default(),
            analytics_id: Some(ANALYTICS_ID.to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}
