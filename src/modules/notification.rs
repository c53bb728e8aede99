//! Booking notifications sent to the business owner.
//!
//! Both notifications are rendered from tera templates embedded with
//! `include_str!`, once as `.txt` and once as `.html`. Tera autoescapes the
//! `.html` flavour, so customer input is verbatim in the text body and escaped
//! in the HTML body.

use std::sync::Arc;
use std::time::Duration;

use tera::{Context, Tera};
use thiserror::Error;

use crate::modules::mailer::{Mailer, OutgoingEmail};
use crate::schemas::booking::{BookingRequest, QuickBookingRequest};

pub const SENDER_NAME: &str = "Gold Star Bond Cleaning";
pub const NOT_PROVIDED: &str = "Not provided";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Delivery(String),
    #[error("mail submission timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to render notification: {0}")]
    Template(String),
}

pub struct NotificationTemplates {
    engine: Tera,
}

impl NotificationTemplates {
    pub fn new() -> Result<Self, NotifyError> {
        let mut engine = Tera::default();
        engine
            .add_raw_templates(vec![
                ("booking.html", include_str!("../../templates/notifications/booking.html")),
                ("booking.txt", include_str!("../../templates/notifications/booking.txt")),
                (
                    "quick_booking.html",
                    include_str!("../../templates/notifications/quick_booking.html"),
                ),
                (
                    "quick_booking.txt",
                    include_str!("../../templates/notifications/quick_booking.txt"),
                ),
            ])
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(Self { engine })
    }

    fn render(&self, template_name: &str, context: &Context) -> Result<(String, String), NotifyError> {
        let html_body = self
            .engine
            .render(&format!("{template_name}.html"), context)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        let text_body = self
            .engine
            .render(&format!("{template_name}.txt"), context)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok((html_body, text_body))
    }

    pub fn booking(&self, booking: &BookingRequest, recipient: &str) -> Result<OutgoingEmail, NotifyError> {
        let reply_to = booking.email.as_deref().map(checked_address).transpose()?;
        let suburb = or_not_provided(&booking.suburb);
        let property_type = or_not_provided(&booking.property_type);

        let mut context = Context::new();
        context.insert("sender_name", SENDER_NAME);
        context.insert("name", or_not_provided(&booking.name));
        context.insert("email", or_not_provided(&booking.email));
        context.insert("contact_number", or_not_provided(&booking.contact_number));
        context.insert("suburb", suburb);
        context.insert("property_type", property_type);
        context.insert("bedrooms", or_not_provided(&booking.bedrooms));
        context.insert("bathrooms", or_not_provided(&booking.bathrooms));
        context.insert("furnished", or_not_provided(&booking.furnished));
        context.insert("carpet_cleaning", or_not_provided(&booking.carpet_cleaning));
        context.insert("pest_control", or_not_provided(&booking.pest_control));
        context.insert("date", or_not_provided(&booking.date));
        context.insert("message", or_not_provided(&booking.message));
        context.insert("has_message", &booking.message.is_some());

        let (html_body, text_body) = self.render("booking", &context)?;
        Ok(OutgoingEmail {
            from_name: SENDER_NAME.to_string(),
            to: recipient.to_string(),
            reply_to,
            subject: single_line(&format!("🏠 New Booking Request from {suburb} for {property_type}")),
            text_body,
            html_body,
        })
    }

    pub fn quick_booking(&self, request: &QuickBookingRequest, recipient: &str) -> Result<OutgoingEmail, NotifyError> {
        let email = request
            .email
            .as_deref()
            .ok_or_else(|| NotifyError::Validation("Email is required".to_string()))?;
        let email = checked_address(email)?;

        let mut context = Context::new();
        context.insert("sender_name", SENDER_NAME);
        context.insert("email", &email);
        context.insert("phone", or_not_provided(&request.phone));

        let (html_body, text_body) = self.render("quick_booking", &context)?;
        Ok(OutgoingEmail {
            from_name: SENDER_NAME.to_string(),
            to: recipient.to_string(),
            reply_to: Some(email),
            subject: "⚡ Quick Booking Request".to_string(),
            text_body,
            html_body,
        })
    }
}

pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    templates: NotificationTemplates,
    recipient: String,
    timeout: Duration,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>, recipient: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        Ok(NotificationService {
            mailer,
            templates: NotificationTemplates::new()?,
            recipient: recipient.into(),
            timeout,
        })
    }

    pub async fn send_booking_notification(&self, booking: &BookingRequest) -> Result<(), NotifyError> {
        let email = self.templates.booking(booking, &self.recipient)?;
        self.submit(email).await
    }

    pub async fn send_quick_booking_notification(&self, request: &QuickBookingRequest) -> Result<(), NotifyError> {
        let email = self.templates.quick_booking(request, &self.recipient)?;
        self.submit(email).await
    }

    async fn submit(&self, email: OutgoingEmail) -> Result<(), NotifyError> {
        tokio::time::timeout(self.timeout, self.mailer.send(email))
            .await
            .map_err(|_| NotifyError::Timeout(self.timeout))?
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

fn or_not_provided(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_PROVIDED)
}

/// Header values must stay on one line.
fn single_line(input: &str) -> String {
    input.replace(['\r', '\n'], " ")
}

/// The customer address ends up in `Reply-To`, so it has to be a single
/// `local@domain.tld` token.
fn checked_address(raw: &str) -> Result<String, NotifyError> {
    let address = raw.trim();
    let plausible = match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !address.chars().any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | ',' | ';' | '"'))
        }
        None => false,
    };
    if plausible {
        Ok(address.to_string())
    } else {
        Err(NotifyError::Validation("Invalid email address".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::mailer::MailError;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<OutgoingEmail>>);

    #[async_trait]
    impl Mailer for Outbox {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            self.0.lock().await.push(email);
            Ok(())
        }
    }

    struct Rejecting;

    #[async_trait]
    impl Mailer for Rejecting {
        async fn send(&self, _: OutgoingEmail) -> Result<(), MailError> {
            Err(MailError("550 mailbox unavailable".into()))
        }
    }

    struct Hanging;

    #[async_trait]
    impl Mailer for Hanging {
        async fn send(&self, _: OutgoingEmail) -> Result<(), MailError> {
            std::future::pending().await
        }
    }

    fn templates() -> NotificationTemplates {
        NotificationTemplates::new().unwrap()
    }

    fn full_booking() -> BookingRequest {
        BookingRequest {
            name: Some("Jane Citizen".into()),
            email: Some("jane@example.com".into()),
            contact_number: Some("0400 000 000".into()),
            suburb: Some("Parramatta".into()),
            bedrooms: Some("3".into()),
            bathrooms: Some("2".into()),
            carpet_cleaning: Some("Yes".into()),
            furnished: Some("Unfurnished".into()),
            property_type: Some("Apartment".into()),
            pest_control: Some("No".into()),
            date: Some("2024-02-01".into()),
            message: Some("Please bring a ladder".into()),
        }
    }

    #[test]
    fn templates_load() {
        assert!(NotificationTemplates::new().is_ok());
    }

    #[test]
    fn booking_text_contains_every_supplied_value() {
        let booking = full_booking();
        let email = templates().booking(&booking, "owner@example.com").unwrap();
        for value in [
            "Jane Citizen",
            "jane@example.com",
            "0400 000 000",
            "Parramatta",
            "3",
            "2",
            "Yes",
            "Unfurnished",
            "Apartment",
            "No",
            "2024-02-01",
            "Please bring a ladder",
        ] {
            assert!(email.text_body.contains(value), "missing {value}");
            assert!(email.html_body.contains(value), "missing {value} in html");
        }
        assert_eq!(email.subject, "🏠 New Booking Request from Parramatta for Apartment");
        assert_eq!(email.reply_to.as_deref(), Some("jane@example.com"));
        assert_eq!(email.to, "owner@example.com");
        assert_eq!(email.from_name, SENDER_NAME);
    }

    #[test]
    fn empty_booking_uses_placeholders() {
        let email = templates().booking(&BookingRequest::default(), "owner@example.com").unwrap();
        assert!(!email.text_body.contains("undefined"));
        assert!(email.text_body.contains("• Name: Not provided"));
        assert!(email.html_body.contains("No additional message provided."));
        assert_eq!(email.reply_to, None);
    }

    #[test]
    fn markup_is_escaped_in_html_only() {
        let booking = BookingRequest {
            name: Some("<script>alert(1)</script>".into()),
            suburb: Some("Evil\r\nBcc: x@y.com".into()),
            ..BookingRequest::default()
        };
        let email = templates().booking(&booking, "owner@example.com").unwrap();
        assert!(email.text_body.contains("<script>alert(1)</script>"));
        assert!(!email.html_body.contains("<script>"));
        assert!(email.html_body.contains("&lt;script&gt;alert(1)"));
        assert!(!email.subject.contains('\n'));
    }

    #[test]
    fn header_breaking_addresses_are_rejected() {
        for address in ["a@b.com\r\nBcc: x@y.com", "a@b.com, c@d.com", "not-an-address", "a@b", "<a@b.com>"] {
            let booking = BookingRequest {
                email: Some(address.into()),
                ..BookingRequest::default()
            };
            let err = templates().booking(&booking, "owner@example.com").unwrap_err();
            assert!(matches!(err, NotifyError::Validation(ref m) if m == "Invalid email address"), "{address:?}");

            let request = QuickBookingRequest {
                email: Some(address.into()),
                phone: None,
            };
            let err = templates().quick_booking(&request, "owner@example.com").unwrap_err();
            assert!(matches!(err, NotifyError::Validation(_)), "{address:?}");
        }
    }

    #[test]
    fn quick_booking_defaults_phone() {
        let request = QuickBookingRequest {
            email: Some("x@y.com".into()),
            phone: None,
        };
        let email = templates().quick_booking(&request, "owner@example.com").unwrap();
        assert!(email.text_body.contains("• Contact: Not provided"));
        assert!(email.html_body.contains("Not provided"));
        assert_eq!(email.reply_to.as_deref(), Some("x@y.com"));
        assert_eq!(email.subject, "⚡ Quick Booking Request");
    }

    #[test]
    fn quick_booking_requires_email() {
        let err = templates()
            .quick_booking(&QuickBookingRequest::default(), "owner@example.com")
            .unwrap_err();
        assert!(matches!(err, NotifyError::Validation(ref m) if m == "Email is required"));
    }

    #[tokio::test]
    async fn service_hands_message_to_mailer() {
        let outbox = Arc::new(Outbox::default());
        let service = NotificationService::new(outbox.clone(), "owner@example.com", Duration::from_secs(5)).unwrap();
        service.send_booking_notification(&full_booking()).await.unwrap();

        let sent = outbox.0.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "owner@example.com");
    }

    #[tokio::test]
    async fn rejected_submission_is_a_delivery_error() {
        let service = NotificationService::new(Arc::new(Rejecting), "owner@example.com", Duration::from_secs(5)).unwrap();
        let err = service.send_booking_notification(&full_booking()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Delivery(ref m) if m.contains("550")));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_submission_times_out() {
        let service = NotificationService::new(Arc::new(Hanging), "owner@example.com", Duration::from_secs(5)).unwrap();
        let request = QuickBookingRequest {
            email: Some("x@y.com".into()),
            phone: None,
        };
        let err = service.send_quick_booking_notification(&request).await.unwrap_err();
        assert!(matches!(err, NotifyError::Timeout(_)));
    }
}
