use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub output: OutputConfig,
    pub sheets: SheetsConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let pdf_dir = PathBuf::from(var_or("OPSFORMS_OUTPUT_DIR", "submissions"));

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            output: OutputConfig { pdf_dir },
            sheets: SheetsConfig::from_env()?,
            mail: MailConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Where rendered PDFs are written.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub pdf_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetBackend {
    Csv,
    Google,
}

/// Spreadsheet persistence settings.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub backend: SheetBackend,
    pub csv_dir: PathBuf,
    pub spreadsheet_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
}

impl SheetsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = var_or("OPSFORMS_SHEET_BACKEND", "csv");
        let backend = match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => SheetBackend::Csv,
            "google" | "gsheets" => SheetBackend::Google,
            _ => return Err(ConfigError::InvalidSheetBackend(raw)),
        };

        Ok(Self {
            backend,
            csv_dir: PathBuf::from(var_or("OPSFORMS_SHEET_DIR", "submissions/sheets")),
            spreadsheet_id: optional_var("OPSFORMS_SPREADSHEET_ID"),
            credentials_path: optional_var("OPSFORMS_GOOGLE_CREDENTIALS").map(PathBuf::from),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    Graph,
    Smtp,
    Log,
}

impl MailTransport {
    pub fn label(&self) -> &'static str {
        match self {
            MailTransport::Graph => "graph",
            MailTransport::Smtp => "smtp",
            MailTransport::Log => "log",
        }
    }
}

/// Distribution list and transport credentials.
///
/// Credentials are optional here; an incomplete set is reported when a
/// delivery is attempted rather than at startup, so the forms stay usable.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub sender: Option<String>,
    pub graph: GraphCredentials,
    pub smtp: SmtpCredentials,
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = var_or("OPSFORMS_MAIL_TRANSPORT", "log");
        let transport = match raw.trim().to_ascii_lowercase().as_str() {
            "graph" | "msgraph" => MailTransport::Graph,
            "smtp" => MailTransport::Smtp,
            "log" | "none" => MailTransport::Log,
            _ => return Err(ConfigError::InvalidMailTransport(raw)),
        };

        let port = match optional_var("OPSFORMS_SMTP_PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidSmtpPort)?,
            None => 587,
        };

        Ok(Self {
            transport,
            to: split_addresses(&var_or("OPSFORMS_MAIL_TO", "")),
            cc: split_addresses(&var_or("OPSFORMS_MAIL_CC", "")),
            sender: optional_var("OPSFORMS_MAIL_SENDER"),
            graph: GraphCredentials {
                tenant_id: optional_var("OPSFORMS_GRAPH_TENANT_ID"),
                client_id: optional_var("OPSFORMS_GRAPH_CLIENT_ID"),
                client_secret: optional_var("OPSFORMS_GRAPH_CLIENT_SECRET"),
            },
            smtp: SmtpCredentials {
                host: optional_var("OPSFORMS_SMTP_HOST"),
                port,
                username: optional_var("OPSFORMS_SMTP_USERNAME"),
                password: optional_var("OPSFORMS_SMTP_PASSWORD"),
            },
        })
    }
}

#[derive(Clone, Default)]
pub struct GraphCredentials {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct SmtpCredentials {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Split a comma-separated address list, dropping blanks.
pub fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSheetBackend(String),
    InvalidMailTransport(String),
    InvalidSmtpPort,
    MissingSetting(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSheetBackend(value) => write!(
                f,
                "OPSFORMS_SHEET_BACKEND must be 'csv' or 'google' (got '{value}')"
            ),
            ConfigError::InvalidMailTransport(value) => write!(
                f,
                "OPSFORMS_MAIL_TRANSPORT must be 'graph', 'smtp' or 'log' (got '{value}')"
            ),
            ConfigError::InvalidSmtpPort => write!(f, "OPSFORMS_SMTP_PORT must be a valid u16"),
            ConfigError::MissingSetting(name) => {
                write!(f, "{name} must be set for the selected backend")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSheetBackend(_)
            | ConfigError::InvalidMailTransport(_)
            | ConfigError::InvalidSmtpPort
            | ConfigError::MissingSetting(_) => None,
        }
    }
}
