//! E-mail delivery of rendered submissions.
//!
//! One [`Mailer`] is chosen at deployment time from [`MailConfig`]. An
//! incomplete transport configuration still yields a mailer; it reports the
//! problem on every delivery attempt so the forms keep accepting submissions.

pub mod graph;
pub mod log;
pub mod smtp;

use std::fmt::Debug;
use std::sync::Arc;

use crate::config::{MailConfig, MailTransport};

pub use graph::GraphMailer;
pub use log::LogMailer;
pub use smtp::SmtpMailer;

/// The PDF copy attached to every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfAttachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub body: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub attachment: PdfAttachment,
}

/// What the transport reported on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub transport: &'static str,
    pub detail: String,
}

pub trait Mailer: Send + Sync + Debug {
    fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, MailError>;

    fn transport(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport not configured: {0}")]
    Configuration(String),
    #[error("failed to acquire access token: {0}")]
    Authentication(String),
    #[error("API Error (Status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
}

/// Stands in for a transport whose credentials are incomplete.
#[derive(Debug, Clone)]
pub struct UnconfiguredMailer {
    transport: &'static str,
    reason: String,
}

impl UnconfiguredMailer {
    pub fn new(transport: &'static str, reason: impl Into<String>) -> Self {
        Self {
            transport,
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Mailer for UnconfiguredMailer {
    fn send(&self, _email: &OutgoingEmail) -> Result<DeliveryReceipt, MailError> {
        Err(MailError::Configuration(self.reason.clone()))
    }

    fn transport(&self) -> &'static str {
        self.transport
    }
}

/// Build the configured transport. Incomplete credentials produce an
/// [`UnconfiguredMailer`] and a startup warning.
pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    let built: Result<Arc<dyn Mailer>, MailError> = match config.transport {
        MailTransport::Graph => {
            GraphMailer::from_config(config).map(|mailer| Arc::new(mailer) as Arc<dyn Mailer>)
        }
        MailTransport::Smtp => {
            SmtpMailer::from_config(config).map(|mailer| Arc::new(mailer) as Arc<dyn Mailer>)
        }
        MailTransport::Log => Ok(Arc::new(LogMailer)),
    };

    match built {
        Ok(mailer) => mailer,
        Err(err) => {
            tracing::warn!(
                transport = config.transport.label(),
                error = %err,
                "mail transport incomplete; deliveries will fail until configured"
            );
            Arc::new(UnconfiguredMailer::new(
                config.transport.label(),
                err.to_string(),
            ))
        }
    }
}

pub(crate) fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, MailError> {
    value
        .as_deref()
        .ok_or_else(|| MailError::Configuration(format!("{name} is not set")))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn sample_email() -> OutgoingEmail {
        OutgoingEmail {
            subject: "Pay Exception Form: Priya Raman on 2025-05-09".to_string(),
            body: "A pay exception form has been submitted.\n\nOperator: Priya Raman".to_string(),
            to: vec!["payroll@example.com".to_string()],
            cc: vec!["ops@example.com".to_string()],
            attachment: PdfAttachment {
                file_name: "pay_exception_Priya Raman_2025-05-09.pdf".to_string(),
                bytes: b"%PDF-1.5 fake".to_vec(),
            },
        }
    }
}
