//! Printable PDF copies of submitted forms.

pub mod fonts;
pub mod layout;
pub mod pdf;

pub use layout::wrap_text;
pub use pdf::{render_form, render_submission_pdf};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to encode PDF content: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to write PDF: {0}")]
    Io(#[from] std::io::Error),
}
