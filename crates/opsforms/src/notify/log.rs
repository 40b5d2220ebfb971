use tracing::info;

use super::{DeliveryReceipt, MailError, Mailer, OutgoingEmail};

/// Development transport: records the message in the log and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, MailError> {
        info!(
            subject = %email.subject,
            to = ?email.to,
            cc = ?email.cc,
            attachment = %email.attachment.file_name,
            attachment_bytes = email.attachment.bytes.len(),
            "email logged instead of sent"
        );
        Ok(DeliveryReceipt {
            transport: self.transport(),
            detail: format!("logged for {} recipient(s)", email.to.len() + email.cc.len()),
        })
    }

    fn transport(&self) -> &'static str {
        "log"
    }
}
