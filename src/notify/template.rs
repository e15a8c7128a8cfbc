//! HTML bodies for the admin notification emails.

use crate::model::{ContactSubmission, PricingRequest, Submission};

/// Escapes text for interpolation into HTML element content.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escaped text with line breaks kept as `<br>`.
fn multiline(raw: &str) -> String {
    escape_html(raw).replace("\r\n", "\n").replace('\n', "<br>")
}

struct Body {
    html: String,
}

impl Body {
    fn new(heading: &str) -> Self {
        Self {
            html: format!("<h2>{}</h2>\n", escape_html(heading)),
        }
    }

    /// One labelled line; skipped when the value is empty.
    fn field(&mut self, label: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.html.push_str(&format!(
                "<p><strong>{label}:</strong> {}</p>\n",
                escape_html(value)
            ));
        }
        self
    }

    /// A labelled block whose newlines survive.
    fn block(&mut self, label: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.html.push_str(&format!(
                "<p><strong>{label}:</strong></p>\n<p>{}</p>\n",
                multiline(value)
            ));
        }
        self
    }

    fn footer(&mut self, origin: &str) -> String {
        self.html.push_str(&format!(
            "<p><em>This message was sent from the {origin} on your website.</em></p>\n"
        ));
        std::mem::take(&mut self.html)
    }
}

fn contact_fields(body: &mut Body, contact: &ContactSubmission) {
    body.field("Name", &contact.name)
        .field("Email", &contact.email)
        .field("Company", &contact.company)
        .field("Phone", &contact.phone)
        .field("Service", &contact.service)
        .field("Subject", &contact.subject);
}

fn contact_body(contact: &ContactSubmission) -> String {
    let mut body = Body::new("New Contact Form Submission");
    contact_fields(&mut body, contact);
    body.block("Message", &contact.message).footer("contact form")
}

fn pricing_body(request: &PricingRequest) -> String {
    let mut body = Body::new("New Pricing Request");
    body.field("Form", request.form_type.title());
    contact_fields(&mut body, &request.contact);
    body.field("Job Title", &request.job_title)
        .field("Industry", &request.industry)
        .field("Employees", &request.employees)
        .field("Services", &request.services.join(", "))
        .field("Infrastructure Type", &request.infrastructure_type)
        .field("Current Cloud", &request.current_cloud)
        .field("Project Type", &request.project_type)
        .field("Timeline", &request.timeline)
        .field("Budget", &request.budget)
        .block("Challenges", &request.challenges)
        .block("Message", &request.contact.message)
        .block("Additional Info", &request.additional_info)
        .footer("pricing form")
}

pub fn subject(submission: &Submission) -> String {
    match submission {
        Submission::Contact(c) => format!("New Contact Form: {}", c.name),
        Submission::Pricing(p) => format!("New Pricing Request: {}", p.contact.name),
    }
}

pub fn body(submission: &Submission) -> String {
    match submission {
        Submission::Contact(c) => contact_body(c),
        Submission::Pricing(p) => pricing_body(p),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{rules, timestamp, SubmissionKind};

    fn submission(kind: SubmissionKind, value: serde_json::Value) -> Submission {
        let fields = rules::normalize(kind.rules(), value.as_object().unwrap()).unwrap();
        Submission::create(kind, &fields, timestamp::now()).unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_contact_omits_absent_fields() {
        let s = submission(
            SubmissionKind::Contact,
            json!({"name": "Ada", "email": "ada@example.com", "message": "line one\nline two"}),
        );
        let html = body(&s);

        assert!(html.starts_with("<h2>New Contact Form Submission</h2>"));
        assert!(html.contains("<p><strong>Name:</strong> Ada</p>"));
        assert!(html.contains("line one<br>line two"));
        assert!(!html.contains("Company"));
        assert!(!html.contains("Phone"));
        assert_eq!(subject(&s), "New Contact Form: Ada");
    }

    #[test]
    fn test_values_are_escaped() {
        let s = submission(
            SubmissionKind::Contact,
            json!({"name": "<b>Eve</b>", "email": "eve@example.com", "message": "<img src=x>"}),
        );
        let html = body(&s);
        assert!(html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(html.contains("&lt;img src=x&gt;"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_pricing_includes_extras() {
        let s = submission(
            SubmissionKind::PricingRequest,
            json!({
                "name": "Bo", "email": "bo@example.com", "message": "quote please",
                "formType": "cloud_infrastructure",
                "services": ["Migration", "Monitoring"],
                "budget": "$10k"
            }),
        );
        let html = body(&s);

        assert!(html.starts_with("<h2>New Pricing Request</h2>"));
        assert!(html.contains("<p><strong>Form:</strong> Cloud Infrastructure</p>"));
        assert!(html.contains("<p><strong>Services:</strong> Migration, Monitoring</p>"));
        assert!(html.contains("<p><strong>Budget:</strong> $10k</p>"));
        assert!(html.contains("<p><strong>Subject:</strong> Pricing Request</p>"));
        assert!(!html.contains("Job Title"));
        assert_eq!(subject(&s), "New Pricing Request: Bo");
    }
}
