//! Shared request-handling state
//!
//! One [`SiteContext`] is built at startup and shared by every request. It
//! owns the injected dependencies (store, notifier) and the few settings
//! handlers consult; there is no other process-wide state.

use std::sync::Arc;

use crate::{
    config::{Deployment, Site},
    notify::Notifier,
    store::{self, SubmissionStore},
};

pub struct SiteContext {
    /// Persistence backend; `None` when the deployment runs without one
    pub store: Option<Arc<dyn SubmissionStore>>,

    /// Admin mail notifications; `None` when mail is not configured
    pub notifier: Option<Notifier>,

    pub deployment: Deployment,

    /// Required value of the `x-api-key` header on admin routes
    pub admin_api_key: Option<String>,

    /// Include error details in 500 bodies
    pub expose_errors: bool,
}

impl SiteContext {
    pub fn from_site(site: &Site) -> Self {
        let notifier = site.sendgrid.as_ref().map(Notifier::from_config);
        if notifier.is_none() {
            log::warn!("Email notifications are disabled");
        }

        let admin_api_key = site.admin.as_ref().map(|a| a.api_key.clone());
        if admin_api_key.is_none() {
            log::warn!("No admin API key configured, admin routes are open to anyone");
        }

        Self {
            store: store::build_store(site),
            notifier,
            deployment: site.deployment,
            admin_api_key,
            expose_errors: site.is_development(),
        }
    }

    /// Context with every optional dependency absent.
    pub fn bare(deployment: Deployment) -> Self {
        Self {
            store: None,
            notifier: None,
            deployment,
            admin_api_key: None,
            expose_errors: false,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SubmissionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_admin_api_key(mut self, key: impl Into<String>) -> Self {
        self.admin_api_key = Some(key.into());
        self
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.as_ref().map_or("none", |s| s.backend())
    }
}
