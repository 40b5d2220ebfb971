use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{require, DeliveryReceipt, MailError, Mailer, OutgoingEmail};
use crate::config::MailConfig;

/// Sends mail through an authenticated STARTTLS relay.
#[derive(Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    username: String,
    password: String,
    sender: String,
}

impl SmtpMailer {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            sender: sender.into(),
        }
    }

    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let username = require(&config.smtp.username, "OPSFORMS_SMTP_USERNAME")?;
        Ok(Self::new(
            require(&config.smtp.host, "OPSFORMS_SMTP_HOST")?,
            config.smtp.port,
            username,
            require(&config.smtp.password, "OPSFORMS_SMTP_PASSWORD")?,
            config.sender.as_deref().unwrap_or(username),
        ))
    }

    /// Plain-text body with the PDF as the only attachment.
    pub fn build_message(&self, email: &OutgoingEmail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.sender)?)
            .subject(email.subject.as_str());
        for address in &email.to {
            builder = builder.to(parse_mailbox(address)?);
        }
        for address in &email.cc {
            builder = builder.cc(parse_mailbox(address)?);
        }

        let content_type = ContentType::parse(mime::APPLICATION_PDF.as_ref())
            .map_err(|err| MailError::Smtp(err.to_string()))?;
        let attachment = Attachment::new(email.attachment.file_name.clone())
            .body(email.attachment.bytes.clone(), content_type);

        builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(email.body.clone()))
                    .singlepart(attachment),
            )
            .map_err(|err| MailError::Smtp(err.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|err| MailError::Configuration(format!("invalid address '{address}': {err}")))
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, MailError> {
        let message = self.build_message(email)?;
        let transport = SmtpTransport::starttls_relay(&self.host)
            .map_err(|err| MailError::Smtp(err.to_string()))?
            .port(self.port)
            .credentials(Credentials::new(self.username.clone(), self.password.clone()))
            .build();

        let response = transport
            .send(&message)
            .map_err(|err| MailError::Smtp(err.to_string()))?;
        Ok(DeliveryReceipt {
            transport: self.transport(),
            detail: format!("relay answered {}", response.code()),
        })
    }

    fn transport(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::fixtures::sample_email;

    fn mailer(sender: &str) -> SmtpMailer {
        SmtpMailer::new("smtp.example.com", 587, "forms", "secret", sender)
    }

    #[test]
    fn message_carries_subject_recipients_and_pdf() {
        let message = mailer("Ops Forms <forms@example.com>")
            .build_message(&sample_email())
            .expect("message builds");
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Subject: Pay Exception Form: Priya Raman on 2025-05-09"));
        assert!(raw.contains("To: payroll@example.com"));
        assert!(raw.contains("Cc: ops@example.com"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("pay_exception_Priya Raman_2025-05-09.pdf"));
    }

    #[test]
    fn invalid_sender_is_a_configuration_error() {
        let err = mailer("not an address")
            .build_message(&sample_email())
            .expect_err("invalid sender");
        assert!(matches!(err, MailError::Configuration(_)));
    }
}
