//! Transactional email to the site administrator.

pub mod sendgrid;
pub mod template;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{config::SendGrid, core::SiteResult, model::Submission};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> SiteResult<DeliveryReceipt>;
}

/// Renders submissions and hands them to the configured [`Mailer`].
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    admin_email: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, admin_email: impl Into<String>) -> Self {
        Self {
            mailer,
            admin_email: admin_email.into(),
        }
    }

    pub fn from_config(config: &SendGrid) -> Self {
        Self::new(
            Arc::new(sendgrid::SendGridMailer::new(config.clone())),
            config.admin_email.clone(),
        )
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    pub async fn notify_submission(&self, submission: &Submission) -> SiteResult<DeliveryReceipt> {
        let message = EmailMessage {
            to: self.admin_email.clone(),
            subject: template::subject(submission),
            html: template::body(submission),
        };
        self.mailer.send(&message).await
    }

    /// Fixed message used by the `send-test-email` utility.
    pub async fn send_test_email(&self) -> SiteResult<DeliveryReceipt> {
        let message = EmailMessage {
            to: self.admin_email.clone(),
            subject: "Test email from the site backend".to_string(),
            html: concat!(
                "<h2>Test Email</h2>\n",
                "<p>If you can read this, SendGrid delivery is configured correctly.</p>\n"
            )
            .to_string(),
        };
        self.mailer.send(&message).await
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::Mutex;

    use super::*;
    use crate::core::SiteError;

    /// Records every message instead of sending it.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> SiteResult<DeliveryReceipt> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(DeliveryReceipt {
                message_id: Some("test-id".to_string()),
            })
        }
    }

    /// Behaves like an upstream API that refuses every message.
    pub struct RejectingMailer;

    #[async_trait]
    impl Mailer for RejectingMailer {
        async fn send(&self, _message: &EmailMessage) -> SiteResult<DeliveryReceipt> {
            Err(SiteError::Delivery("status=401 body=unauthorized".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{fake::*, *};
    use crate::{
        core::SiteError,
        model::{rules, timestamp, SubmissionKind},
    };

    #[tokio::test]
    async fn test_notify_submission_addresses_admin() {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(mailer.clone(), "admin@example.com");
        let payload = json!({"name": "A", "email": "a@b.com", "message": "hi"});
        let fields =
            rules::normalize(SubmissionKind::Contact.rules(), payload.as_object().unwrap()).unwrap();
        let submission =
            Submission::create(SubmissionKind::Contact, &fields, timestamp::now()).unwrap();

        let receipt = notifier.notify_submission(&submission).await.unwrap();

        assert_eq!(receipt.message_id.as_deref(), Some("test-id"));
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "admin@example.com");
        assert_eq!(sent[0].subject, "New Contact Form: A");
    }

    #[tokio::test]
    async fn test_test_email_surfaces_delivery_error() {
        let notifier = Notifier::new(Arc::new(RejectingMailer), "admin@example.com");
        assert!(matches!(
            notifier.send_test_email().await,
            Err(SiteError::Delivery(_))
        ));
    }
}
