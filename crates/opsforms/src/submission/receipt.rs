use std::fmt;

use serde::Serialize;

use crate::forms::FormKind;

/// Process-unique identifier assigned to each accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one downstream step, with the message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed(String),
    Failed(String),
    Skipped(String),
}

impl StepOutcome {
    pub fn completed(message: impl Into<String>) -> Self {
        StepOutcome::Completed(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        StepOutcome::Failed(message.into())
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        StepOutcome::Skipped(message.into())
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Completed(_) => "completed",
            StepOutcome::Failed(_) => "failed",
            StepOutcome::Skipped(_) => "skipped",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StepOutcome::Completed(message)
            | StepOutcome::Failed(message)
            | StepOutcome::Skipped(message) => message,
        }
    }
}

/// Per-step report for an accepted submission. Steps are independent: a
/// failed spreadsheet append does not stop rendering or delivery.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub submission_id: SubmissionId,
    pub form: FormKind,
    pub pdf_file_name: String,
    pub persistence: StepOutcome,
    pub rendering: StepOutcome,
    pub delivery: StepOutcome,
}

impl SubmissionReceipt {
    pub fn all_completed(&self) -> bool {
        self.steps().iter().all(|(_, outcome)| outcome.is_completed())
    }

    /// Steps in execution order with their display names.
    pub fn steps(&self) -> [(&'static str, &StepOutcome); 3] {
        [
            ("Spreadsheet", &self.persistence),
            ("PDF", &self.rendering),
            ("Email", &self.delivery),
        ]
    }
}
