use std::fmt;
use std::path::Path;

use google_sheets4::api::{Scope, ValueRange};
use google_sheets4::hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use google_sheets4::hyper_util::client::legacy::connect::HttpConnector;
use google_sheets4::hyper_util::client::legacy::Client;
use google_sheets4::hyper_util::rt::TokioExecutor;
use google_sheets4::{yup_oauth2, Sheets};
use tokio::runtime::Handle;

use super::{SheetRow, StoreError, WorksheetStore};

/// Thin wrapper around the generated google-sheets4 client so the blocking
/// submission flow can append rows without exposing async details.
///
/// Appends block on the runtime the hub was built on, so they must be called
/// from a blocking context (`spawn_blocking` or a plain thread), never from an
/// async task.
pub struct GoogleSheetsStore<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    hub: Sheets<C>,
    runtime: Handle,
    spreadsheet_id: String,
}

impl<C> GoogleSheetsStore<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: Sheets<C>, runtime: Handle, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            hub,
            runtime,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn map_error<E: fmt::Display>(err: E) -> StoreError {
        StoreError::Backend(err.to_string())
    }
}

impl GoogleSheetsStore<HttpsConnector<HttpConnector>> {
    /// Build a store authenticated with a service-account key file.
    pub async fn connect(
        credentials_path: &Path,
        spreadsheet_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let key = yup_oauth2::read_service_account_key(credentials_path).await?;
        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await?;

        let connector = HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self::new(
            Sheets::new(client, auth),
            Handle::current(),
            spreadsheet_id,
        ))
    }
}

/// A1 range addressing the first cell of a worksheet; the title is quoted so
/// names with spaces resolve.
pub fn worksheet_range(worksheet: &str) -> String {
    format!("'{}'!A1", worksheet.replace('\'', "''"))
}

impl<C> fmt::Debug for GoogleSheetsStore<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSheetsStore")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

impl<C> WorksheetStore for GoogleSheetsStore<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn append_row(&self, row: &SheetRow) -> Result<(), StoreError> {
        let request = ValueRange {
            major_dimension: Some("ROWS".to_string()),
            values: Some(vec![row.json_cells()]),
            ..ValueRange::default()
        };
        let range = worksheet_range(row.worksheet);

        let result = self.runtime.block_on(async {
            self.hub
                .spreadsheets()
                .values_append(request, &self.spreadsheet_id, &range)
                .value_input_option("RAW")
                .insert_data_option("INSERT_ROWS")
                .add_scope(Scope::Spreadsheet)
                .doit()
                .await
        });

        result.map(|_| ()).map_err(Self::map_error)
    }

    fn backend(&self) -> &'static str {
        "google-sheets"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_quote_worksheet_titles() {
        assert_eq!(worksheet_range("Incident Reports"), "'Incident Reports'!A1");
        assert_eq!(worksheet_range("Ops' Log"), "'Ops'' Log'!A1");
    }
}
