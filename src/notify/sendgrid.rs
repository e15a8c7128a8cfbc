use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client};
use serde::Serialize;

use crate::{
    config::SendGrid,
    core::{SiteError, SiteResult},
};

use super::{DeliveryReceipt, EmailMessage, Mailer};

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct MailSend<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

/// SendGrid v3 transport. One attempt per message.
pub struct SendGridMailer {
    client: Client,
    config: SendGrid,
}

impl SendGridMailer {
    pub fn new(config: SendGrid) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn payload<'a>(&'a self, message: &'a EmailMessage) -> MailSend<'a> {
        MailSend {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &message.to,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.config.from,
                name: Some(&self.config.from_name),
            },
            subject: &message.subject,
            content: vec![Content {
                kind: "text/html",
                value: &message.html,
            }],
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &EmailMessage) -> SiteResult<DeliveryReceipt> {
        log::debug!("Sending email to {}", message.to);

        let resp = self
            .client
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&self.payload(message))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SiteError::Delivery(format!(
                "sendgrid rejected message status={status} body={body}"
            )));
        }

        let message_id = resp
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        Ok(DeliveryReceipt { message_id })
    }
}
