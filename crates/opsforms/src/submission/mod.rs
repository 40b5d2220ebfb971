//! Submission pipeline: validate, append the spreadsheet row, render and save
//! the PDF, then e-mail it.

pub mod receipt;
pub mod router;
pub mod service;

pub use receipt::{StepOutcome, SubmissionId, SubmissionReceipt};
pub use router::forms_router;
pub use service::{Recipients, SubmissionError, SubmissionService};
