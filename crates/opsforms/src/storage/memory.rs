use std::sync::{Arc, Mutex};

use super::{SheetRow, StoreError, WorksheetStore};

/// Keeps appended rows in memory; used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryWorksheetStore {
    rows: Arc<Mutex<Vec<SheetRow>>>,
    failure: Option<String>,
}

impl MemoryWorksheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every append fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<SheetRow> {
        self.rows.lock().expect("worksheet mutex poisoned").clone()
    }
}

impl WorksheetStore for MemoryWorksheetStore {
    fn append_row(&self, row: &SheetRow) -> Result<(), StoreError> {
        if let Some(message) = &self.failure {
            return Err(StoreError::Backend(message.clone()));
        }
        self.rows
            .lock()
            .expect("worksheet mutex poisoned")
            .push(row.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
