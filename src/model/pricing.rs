use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::SiteResult;

use super::{ContactSubmission, FormType, NormalizedFields};

/// A quote request from one of the pricing forms. Carries every contact
/// field plus the project details the forms collect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PricingRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub contact: ContactSubmission,

    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub employees: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub challenges: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub additional_info: String,
    #[serde(default)]
    pub infrastructure_type: String,
    #[serde(default)]
    pub current_cloud: String,
    #[serde(default)]
    pub project_type: String,
    #[serde(default)]
    pub form_type: FormType,
}

impl PricingRequest {
    pub fn from_fields(id: String, fields: &NormalizedFields, now: DateTime<Utc>) -> SiteResult<Self> {
        Ok(Self {
            contact: ContactSubmission::from_fields(id, fields, now),
            job_title: fields.text("jobTitle"),
            industry: fields.text("industry"),
            employees: fields.text("employees"),
            services: fields.list("services"),
            challenges: fields.text("challenges"),
            timeline: fields.text("timeline"),
            budget: fields.text("budget"),
            additional_info: fields.text("additionalInfo"),
            infrastructure_type: fields.text("infrastructureType"),
            current_cloud: fields.text("currentCloud"),
            project_type: fields.text("projectType"),
            form_type: fields.text("formType").parse()?,
        })
    }
}
