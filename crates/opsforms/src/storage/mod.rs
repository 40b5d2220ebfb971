//! Append-only spreadsheet persistence for accepted submissions.

pub mod csv;
pub mod memory;
pub mod sheets;

use std::fmt::Debug;

use crate::forms::{FieldMap, FieldValue, FormDefinition};

pub use self::csv::CsvWorksheetStore;
pub use memory::MemoryWorksheetStore;
pub use sheets::GoogleSheetsStore;

/// One row destined for a named worksheet, cells in the worksheet's column
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub worksheet: &'static str,
    pub columns: &'static [&'static str],
    pub cells: Vec<FieldValue>,
}

impl SheetRow {
    pub fn from_fields(definition: &'static FormDefinition, fields: &FieldMap) -> Self {
        Self {
            worksheet: definition.worksheet,
            columns: definition.columns,
            cells: fields.row(definition.columns),
        }
    }

    pub fn text_cells(&self) -> Vec<String> {
        self.cells.iter().map(FieldValue::cell_text).collect()
    }

    pub fn json_cells(&self) -> Vec<serde_json::Value> {
        self.cells.iter().map(FieldValue::cell_json).collect()
    }
}

/// Storage abstraction so the submission flow can run against a local file,
/// Google Sheets, or an in-memory recorder.
pub trait WorksheetStore: Send + Sync + Debug {
    fn append_row(&self, row: &SheetRow) -> Result<(), StoreError>;

    /// Short backend name used in logs and step messages.
    fn backend(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("worksheet file unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("worksheet file malformed: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("worksheet '{worksheet}' has columns that do not match this form")]
    SchemaMismatch { worksheet: String },
    #[error("spreadsheet operation failed: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::incident::fixtures::completed_report;
    use crate::forms::FormRecord;

    #[test]
    fn incident_row_has_thirty_two_cells_in_column_order() {
        let report = completed_report();
        let row = SheetRow::from_fields(report.definition(), &report.field_map());
        assert_eq!(row.worksheet, "Incident Reports");
        assert_eq!(row.cells.len(), 32);
        let text = row.text_cells();
        assert_eq!(text[0], "2025-04-18");
        assert_eq!(text[4], "Dana Whitfield");
        assert_eq!(text[6], "North");
        assert_eq!(text[7], "1187");
        assert_eq!(text[25], "FALSE");
        assert_eq!(row.json_cells()[25], serde_json::json!(false));
    }
}
