use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::receipt::{StepOutcome, SubmissionId, SubmissionReceipt};
use crate::forms::{validate, FieldMap, FormRecord, MissingFields};
use crate::notify::{Mailer, OutgoingEmail, PdfAttachment};
use crate::render::render_submission_pdf;
use crate::storage::{SheetRow, WorksheetStore};

/// Distribution list every submission is sent to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    pub to: Vec<String>,
    pub cc: Vec<String>,
}

/// Service sequencing validation, spreadsheet persistence, PDF rendering and
/// e-mail delivery for one submission.
///
/// All I/O is blocking; async callers run [`SubmissionService::submit`] on
/// the blocking pool.
#[derive(Debug)]
pub struct SubmissionService {
    store: Arc<dyn WorksheetStore>,
    mailer: Arc<dyn Mailer>,
    recipients: Recipients,
    output_dir: PathBuf,
}

static SUBMISSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_submission_id() -> SubmissionId {
    let id = SUBMISSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SubmissionId(format!("sub-{id:06}"))
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn WorksheetStore>,
        mailer: Arc<dyn Mailer>,
        recipients: Recipients,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            mailer,
            recipients,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn mail_transport(&self) -> &'static str {
        self.mailer.transport()
    }

    /// Validate and, when complete, persist, render and deliver the record.
    ///
    /// A record with missing required entries is rejected before any I/O.
    pub fn submit<F: FormRecord + ?Sized>(
        &self,
        record: &F,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let missing = validate(&record.required_entries());
        if !missing.is_empty() {
            info!(
                form = %record.kind(),
                missing = ?missing.keys(),
                "submission rejected: required fields missing"
            );
            return Err(SubmissionError::Validation(missing));
        }

        let submission_id = next_submission_id();
        let fields = record.field_map();
        let pdf_file_name = record.pdf_file_name();

        let persistence = self.persist(&submission_id, record, &fields);
        let (rendering, pdf) = self.render(&submission_id, record, &fields, &pdf_file_name);
        let delivery = match pdf {
            Some(bytes) => self.deliver(&submission_id, record, &pdf_file_name, bytes),
            None => StepOutcome::skipped("Email not sent: no PDF was generated"),
        };

        Ok(SubmissionReceipt {
            submission_id,
            form: record.kind(),
            pdf_file_name,
            persistence,
            rendering,
            delivery,
        })
    }

    fn persist<F: FormRecord + ?Sized>(
        &self,
        submission_id: &SubmissionId,
        record: &F,
        fields: &FieldMap,
    ) -> StepOutcome {
        let row = SheetRow::from_fields(record.definition(), fields);
        match self.store.append_row(&row) {
            Ok(()) => {
                info!(
                    submission_id = %submission_id,
                    form = %record.kind(),
                    backend = self.store.backend(),
                    worksheet = row.worksheet,
                    "row appended"
                );
                StepOutcome::completed(format!("Saved to worksheet '{}'", row.worksheet))
            }
            Err(err) => {
                warn!(
                    submission_id = %submission_id,
                    form = %record.kind(),
                    backend = self.store.backend(),
                    error = %err,
                    "row append failed"
                );
                StepOutcome::failed(format!("Failed to save to spreadsheet: {err}"))
            }
        }
    }

    /// Render and save the PDF. The bytes are returned whenever rendering
    /// succeeded, even if saving the file did not.
    fn render<F: FormRecord + ?Sized>(
        &self,
        submission_id: &SubmissionId,
        record: &F,
        fields: &FieldMap,
        file_name: &str,
    ) -> (StepOutcome, Option<Vec<u8>>) {
        let definition = record.definition();
        let bytes = match render_submission_pdf(
            fields,
            definition.fields,
            definition.title,
            record.operator_signature(),
            record.supervisor_signature(),
        ) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(submission_id = %submission_id, error = %err, "pdf rendering failed");
                return (
                    StepOutcome::failed(format!("Failed to generate PDF: {err}")),
                    None,
                );
            }
        };

        let path = self.output_dir.join(file_name);
        let saved = fs::create_dir_all(&self.output_dir).and_then(|()| fs::write(&path, &bytes));
        let outcome = match saved {
            Ok(()) => {
                info!(
                    submission_id = %submission_id,
                    path = %path.display(),
                    bytes = bytes.len(),
                    "pdf saved"
                );
                StepOutcome::completed(format!("PDF generated: {file_name}"))
            }
            Err(err) => {
                warn!(
                    submission_id = %submission_id,
                    path = %path.display(),
                    error = %err,
                    "pdf rendered but not saved"
                );
                StepOutcome::failed(format!("PDF generated but could not be saved: {err}"))
            }
        };
        (outcome, Some(bytes))
    }

    fn deliver<F: FormRecord + ?Sized>(
        &self,
        submission_id: &SubmissionId,
        record: &F,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> StepOutcome {
        if self.recipients.to.is_empty() {
            warn!(submission_id = %submission_id, "no recipients configured; email not sent");
            return StepOutcome::failed(
                "Failed to send email: no recipients configured (OPSFORMS_MAIL_TO)",
            );
        }

        let template = record.email_template();
        let email = OutgoingEmail {
            subject: template.subject,
            body: template.body,
            to: self.recipients.to.clone(),
            cc: self.recipients.cc.clone(),
            attachment: PdfAttachment {
                file_name: file_name.to_string(),
                bytes,
            },
        };

        match self.mailer.send(&email) {
            Ok(receipt) => {
                info!(
                    submission_id = %submission_id,
                    transport = receipt.transport,
                    detail = %receipt.detail,
                    "email delivered"
                );
                StepOutcome::completed(format!("Email sent ({})", receipt.detail))
            }
            Err(err) => {
                warn!(
                    submission_id = %submission_id,
                    transport = self.mailer.transport(),
                    error = %err,
                    "email delivery failed"
                );
                StepOutcome::failed(format!("Failed to send email: {err}"))
            }
        }
    }
}

/// Error raised by the submission service.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{}", .0.banner())]
    Validation(MissingFields),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::incident::fixtures::completed_report;
    use crate::forms::pay_exception::fixtures::completed_claim;
    use crate::forms::PayExceptionReport;
    use crate::notify::{DeliveryReceipt, MailError};
    use crate::storage::MemoryWorksheetStore;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, MailError> {
            self.sent.lock().expect("mailer mutex poisoned").push(email.clone());
            Ok(DeliveryReceipt {
                transport: "recording",
                detail: "recorded".to_string(),
            })
        }

        fn transport(&self) -> &'static str {
            "recording"
        }
    }

    fn service(
        store: MemoryWorksheetStore,
        output_dir: &Path,
    ) -> (SubmissionService, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::default());
        let recipients = Recipients {
            to: vec!["safety@example.com".to_string()],
            cc: vec!["ops@example.com".to_string()],
        };
        let service = SubmissionService::new(
            Arc::new(store),
            mailer.clone(),
            recipients,
            output_dir,
        );
        (service, mailer)
    }

    #[test]
    fn submission_ids_are_sequential_and_prefixed() {
        let first = next_submission_id();
        let second = next_submission_id();
        assert!(first.0.starts_with("sub-"));
        assert_eq!(first.0.len(), "sub-000000".len());
        assert_ne!(first, second);
    }

    #[test]
    fn incomplete_claim_performs_no_io() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MemoryWorksheetStore::new();
        let (service, mailer) = service(store.clone(), dir.path());
        let claim = PayExceptionReport {
            pay_explanation: String::new(),
            ..completed_claim()
        };

        let err = service.submit(&claim).expect_err("rejected");
        let SubmissionError::Validation(missing) = err;
        assert_eq!(missing.keys(), vec!["pay_explanation"]);
        assert!(store.rows().is_empty());
        assert!(mailer.sent.lock().expect("mailer").is_empty());
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }

    #[test]
    fn complete_report_is_persisted_rendered_and_sent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MemoryWorksheetStore::new();
        let (service, mailer) = service(store.clone(), dir.path());

        let receipt = service.submit(&completed_report()).expect("accepted");
        assert!(receipt.all_completed(), "{receipt:?}");

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells.len(), 32);

        let pdf = dir.path().join(&receipt.pdf_file_name);
        assert!(fs::read(&pdf).expect("pdf written").starts_with(b"%PDF"));

        let sent = mailer.sent.lock().expect("mailer");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachment.file_name, receipt.pdf_file_name);
        assert_eq!(sent[0].cc, vec!["ops@example.com".to_string()]);
    }

    #[test]
    fn store_failure_does_not_block_pdf_or_email() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (service, mailer) = service(MemoryWorksheetStore::failing("quota exceeded"), dir.path());

        let receipt = service.submit(&completed_claim()).expect("accepted");
        assert!(matches!(receipt.persistence, StepOutcome::Failed(ref message) if message.contains("quota exceeded")));
        assert!(receipt.rendering.is_completed());
        assert!(receipt.delivery.is_completed());
        assert_eq!(mailer.sent.lock().expect("mailer").len(), 1);
    }

    #[test]
    fn missing_recipients_fail_the_delivery_step() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mailer = Arc::new(RecordingMailer::default());
        let service = SubmissionService::new(
            Arc::new(MemoryWorksheetStore::new()),
            mailer.clone(),
            Recipients::default(),
            dir.path(),
        );

        let receipt = service.submit(&completed_claim()).expect("accepted");
        assert!(matches!(receipt.delivery, StepOutcome::Failed(_)));
        assert!(receipt.delivery.message().contains("OPSFORMS_MAIL_TO"));
        assert!(mailer.sent.lock().expect("mailer").is_empty());
    }

    #[test]
    fn unwritable_output_still_emails_the_rendered_pdf() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file in the way").expect("seed");
        let (service, mailer) = service(MemoryWorksheetStore::new(), &blocker);

        let receipt = service.submit(&completed_report()).expect("accepted");
        assert_eq!(receipt.rendering.label(), "failed");
        assert!(receipt.delivery.is_completed());
        assert_eq!(mailer.sent.lock().expect("mailer").len(), 1);
    }
}
