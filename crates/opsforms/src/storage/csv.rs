use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{SheetRow, StoreError, WorksheetStore};

/// Local worksheet backend: one append-only CSV file per worksheet.
///
/// The header row is written when a worksheet file is created; later appends
/// verify it still matches the form's columns before writing.
#[derive(Debug)]
pub struct CsvWorksheetStore {
    directory: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvWorksheetStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `Incident Reports` is stored as `incident_reports.csv`.
    pub fn worksheet_path(&self, worksheet: &str) -> PathBuf {
        let stem: String = worksheet
            .trim()
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() {
                    ch.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{stem}.csv"))
    }

    /// Data rows of a worksheet, header excluded. Missing worksheets are empty.
    pub fn read_rows(&self, worksheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let path = self.worksheet_path(worksheet);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = ::csv::Reader::from_path(&path)?;
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn verify_header(path: &Path, row: &SheetRow) -> Result<(), StoreError> {
        let mut reader = ::csv::Reader::from_path(path)?;
        let header = reader.headers()?;
        if header.iter().eq(row.columns.iter().copied()) {
            Ok(())
        } else {
            Err(StoreError::SchemaMismatch {
                worksheet: row.worksheet.to_string(),
            })
        }
    }
}

impl WorksheetStore for CsvWorksheetStore {
    fn append_row(&self, row: &SheetRow) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("worksheet mutex poisoned");
        fs::create_dir_all(&self.directory)?;

        let path = self.worksheet_path(row.worksheet);
        let has_header = fs::metadata(&path)
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if has_header {
            Self::verify_header(&path, row)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = ::csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !has_header {
            writer.write_record(row.columns)?;
        }
        writer.write_record(row.text_cells())?;
        writer.flush()?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FieldValue;

    static COLUMNS: [&str; 3] = ["date", "name", "late_report"];

    fn row(name: &str) -> SheetRow {
        SheetRow {
            worksheet: "Incident Reports",
            columns: &COLUMNS,
            cells: vec![
                FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2025, 2, 3)),
                FieldValue::text(name),
                FieldValue::Flag(true),
            ],
        }
    }

    #[test]
    fn first_append_writes_header_then_rows_accumulate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CsvWorksheetStore::new(dir.path().join("sheets"));

        store.append_row(&row("A. Moreno")).expect("first append");
        store.append_row(&row("B. Chen, Jr.")).expect("second append");

        let path = store.worksheet_path("Incident Reports");
        assert!(path.ends_with("incident_reports.csv"));
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.starts_with("date,name,late_report\n"));

        let rows = store.read_rows("Incident Reports").expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["2025-02-03", "A. Moreno", "TRUE"]);
        assert_eq!(rows[1][1], "B. Chen, Jr.");
    }

    #[test]
    fn mismatched_header_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CsvWorksheetStore::new(dir.path());
        fs::write(store.worksheet_path("Incident Reports"), "date,brief\n").expect("seed");

        let err = store.append_row(&row("A. Moreno")).expect_err("schema mismatch");
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn missing_worksheet_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CsvWorksheetStore::new(dir.path());
        assert!(store.read_rows("Pay Exception Forms").expect("rows").is_empty());
    }
}
