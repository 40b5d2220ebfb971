use metrics_exporter_prometheus::PrometheusHandle;
use opsforms::config::{AppConfig, ConfigError, SheetBackend, SheetsConfig};
use opsforms::error::AppError;
use opsforms::forms::FormKind;
use opsforms::notify::mailer_from_config;
use opsforms::storage::{CsvWorksheetStore, GoogleSheetsStore, WorksheetStore};
use opsforms::submission::{Recipients, SubmissionService};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Open the configured spreadsheet backend.
pub(crate) async fn build_store(config: &SheetsConfig) -> Result<Arc<dyn WorksheetStore>, AppError> {
    match config.backend {
        SheetBackend::Csv => {
            info!(directory = %config.csv_dir.display(), "using CSV worksheets");
            Ok(Arc::new(CsvWorksheetStore::new(config.csv_dir.clone())))
        }
        SheetBackend::Google => {
            let spreadsheet_id = config
                .spreadsheet_id
                .clone()
                .ok_or(ConfigError::MissingSetting("OPSFORMS_SPREADSHEET_ID"))?;
            let credentials = config
                .credentials_path
                .as_deref()
                .ok_or(ConfigError::MissingSetting("OPSFORMS_GOOGLE_CREDENTIALS"))?;
            let store = GoogleSheetsStore::connect(credentials, spreadsheet_id).await?;
            info!(spreadsheet_id = store.spreadsheet_id(), "using Google Sheets");
            Ok(Arc::new(store))
        }
    }
}

pub(crate) async fn build_service(config: &AppConfig) -> Result<SubmissionService, AppError> {
    let store = build_store(&config.sheets).await?;
    let mailer = mailer_from_config(&config.mail);
    Ok(SubmissionService::new(
        store,
        mailer,
        Recipients {
            to: config.mail.to.clone(),
            cc: config.mail.cc.clone(),
        },
        config.output.pdf_dir.clone(),
    ))
}

pub(crate) fn parse_form_kind(raw: &str) -> Result<FormKind, String> {
    FormKind::from_slug(raw)
        .ok_or_else(|| format!("unknown form '{raw}' (expected 'incident' or 'pay-exception')"))
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
