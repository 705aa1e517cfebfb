pub mod templates;

use askama::Template;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::email::templates::{ContactNotification, ContactReceipt};

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("System SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    pub async fn send_contact_notification(
        &self,
        to_email: &str,
        message: &ContactNotification<'_>,
    ) -> Result<(), String> {
        let html = message
            .render()
            .map_err(|e| format!("Failed to render contact notification: {e}"))?;
        let subject = match message.subject {
            Some(subject) => format!("[HUMANIKA] {subject}"),
            None => format!("[HUMANIKA] Message from {}", message.name),
        };
        self.send(to_email, Some(message.email), &subject, &html)
            .await
    }

    pub async fn send_contact_receipt(&self, to_email: &str, name: &str) -> Result<(), String> {
        let html = ContactReceipt { name }
            .render()
            .map_err(|e| format!("Failed to render contact receipt: {e}"))?;
        self.send(to_email, None, "We received your message - HUMANIKA", &html)
            .await
    }

    /// `reply_to` lets staff answer the visitor straight from the notification.
    async fn send(
        &self,
        to: &str,
        reply_to: Option<&str>,
        subject: &str,
        html_body: &str,
    ) -> Result<(), String> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| format!("Invalid from address: {e}"))?;
        let to: Mailbox = to.parse().map_err(|e| format!("Invalid to address: {e}"))?;

        let mut builder = Message::builder().from(from).to(to).subject(subject);
        if let Some(addr) = reply_to {
            match addr.parse::<Mailbox>() {
                Ok(mailbox) => builder = builder.reply_to(mailbox),
                Err(e) => tracing::warn!("Skipping invalid reply-to address: {e}"),
            }
        }

        let message = builder
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to send '{subject}': {e}"))
    }
}
