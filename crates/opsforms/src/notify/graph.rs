use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{require, DeliveryReceipt, MailError, Mailer, OutgoingEmail};
use crate::config::MailConfig;

pub const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends mail through Microsoft Graph using the OAuth client-credentials flow.
///
/// A fresh blocking client is built per delivery; deliveries run on the
/// blocking pool and are infrequent.
#[derive(Clone)]
pub struct GraphMailer {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    sender: String,
    login_base: String,
    graph_base: String,
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl GraphMailer {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            sender: sender.into(),
            login_base: LOGIN_BASE_URL.to_string(),
            graph_base: GRAPH_BASE_URL.to_string(),
        }
    }

    /// Point the token and sendMail requests at other hosts.
    pub fn with_endpoints(mut self, login_base: impl Into<String>, graph_base: impl Into<String>) -> Self {
        self.login_base = login_base.into().trim_end_matches('/').to_string();
        self.graph_base = graph_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        Ok(Self::new(
            require(&config.graph.tenant_id, "OPSFORMS_GRAPH_TENANT_ID")?,
            require(&config.graph.client_id, "OPSFORMS_GRAPH_CLIENT_ID")?,
            require(&config.graph.client_secret, "OPSFORMS_GRAPH_CLIENT_SECRET")?,
            require(&config.sender, "OPSFORMS_MAIL_SENDER")?,
        ))
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login_base, self.tenant_id)
    }

    fn send_mail_url(&self) -> String {
        format!("{}/users/{}/sendMail", self.graph_base, self.sender)
    }

    fn acquire_token(&self, client: &Client) -> Result<String, MailError> {
        let response = client
            .post(self.token_url())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()?;
        let status = response.status();
        let body: TokenResponse = response.json().unwrap_or_default();

        match body.access_token {
            Some(token) if status.is_success() => Ok(token),
            _ => Err(MailError::Authentication(
                body.error_description
                    .or(body.error)
                    .unwrap_or_else(|| format!("token endpoint returned {status}")),
            )),
        }
    }

    /// Graph `sendMail` request body.
    pub fn payload(&self, email: &OutgoingEmail) -> Value {
        let recipients = |addresses: &[String]| -> Vec<Value> {
            addresses
                .iter()
                .map(|address| json!({ "emailAddress": { "address": address } }))
                .collect()
        };

        json!({
            "message": {
                "subject": email.subject,
                "body": {
                    "contentType": "HTML",
                    "content": html_body(&email.body),
                },
                "toRecipients": recipients(&email.to),
                "ccRecipients": recipients(&email.cc),
                "from": { "emailAddress": { "address": self.sender } },
                "attachments": [{
                    "@odata.type": "#microsoft.graph.fileAttachment",
                    "name": email.attachment.file_name,
                    "contentType": mime::APPLICATION_PDF.as_ref(),
                    "contentBytes": STANDARD.encode(&email.attachment.bytes),
                }],
            },
            "saveToSentItems": true,
        })
    }
}

impl std::fmt::Debug for GraphMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphMailer")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl Mailer for GraphMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, MailError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let token = self.acquire_token(&client)?;

        let response = client
            .post(self.send_mail_url())
            .bearer_auth(token)
            .json(&self.payload(email))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message: graph_error_message(&body),
            });
        }

        Ok(DeliveryReceipt {
            transport: self.transport(),
            detail: format!("API returned status {}", status.as_u16()),
        })
    }

    fn transport(&self) -> &'static str {
        "graph"
    }
}

/// `error.message` from a Graph error body, or the raw body.
fn graph_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn html_body(text: &str) -> String {
    let mut html = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => html.push_str("&amp;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            '"' => html.push_str("&quot;"),
            '\n' => html.push_str("<br>"),
            '\r' => {}
            other => html.push(other),
        }
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::fixtures::sample_email;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured {
        token_form: Arc<Mutex<Option<String>>>,
        authorization: Arc<Mutex<Option<String>>>,
        payload: Arc<Mutex<Option<Value>>>,
    }

    async fn token(
        State(captured): State<Captured>,
        Path(tenant): Path<String>,
        body: String,
    ) -> (StatusCode, Json<Value>) {
        *captured.token_form.lock().expect("capture") = Some(body);
        if tenant == "bad-tenant" {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_client", "error_description": "AADSTS7000215: Invalid client secret" })),
            );
        }
        (StatusCode::OK, Json(json!({ "access_token": "token-123", "token_type": "Bearer" })))
    }

    async fn send_mail(
        State(captured): State<Captured>,
        Path(sender): Path<String>,
        headers: HeaderMap,
        Json(payload): Json<Value>,
    ) -> (StatusCode, String) {
        *captured.authorization.lock().expect("capture") = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        *captured.payload.lock().expect("capture") = Some(payload);
        if sender == "blocked@example.com" {
            return (
                StatusCode::FORBIDDEN,
                json!({ "error": { "code": "ErrorAccessDenied", "message": "Access is denied." } })
                    .to_string(),
            );
        }
        (StatusCode::ACCEPTED, String::new())
    }

    async fn fake_graph() -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/login/:tenant/oauth2/v2.0/token", post(token))
            .route("/graph/users/:sender/sendMail", post(send_mail))
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        (format!("http://{addr}"), captured)
    }

    fn mailer(base: &str, tenant: &str, sender: &str) -> GraphMailer {
        GraphMailer::new(tenant, "client-1", "secret-1", sender)
            .with_endpoints(format!("{base}/login"), format!("{base}/graph"))
    }

    #[test]
    fn payload_carries_recipients_html_body_and_attachment() {
        let email = sample_email();
        let payload = mailer("http://unused", "tenant", "forms@example.com").payload(&email);
        let message = &payload["message"];
        assert_eq!(message["subject"], email.subject.as_str());
        assert_eq!(
            message["body"]["content"],
            "A pay exception form has been submitted.<br><br>Operator: Priya Raman"
        );
        assert_eq!(
            message["toRecipients"][0]["emailAddress"]["address"],
            "payroll@example.com"
        );
        assert_eq!(message["ccRecipients"][0]["emailAddress"]["address"], "ops@example.com");
        let attachment = &message["attachments"][0];
        assert_eq!(attachment["contentType"], "application/pdf");
        assert_eq!(attachment["contentBytes"], STANDARD.encode(b"%PDF-1.5 fake"));
        assert_eq!(payload["saveToSentItems"], true);
    }

    #[test]
    fn html_body_escapes_markup() {
        assert_eq!(html_body("a < b & c\r\nd"), "a &lt; b &amp; c<br>d");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delivers_with_bearer_token() {
        let (base, captured) = fake_graph().await;
        let graph = mailer(&base, "tenant-1", "forms@example.com");
        let receipt = tokio::task::spawn_blocking(move || graph.send(&sample_email()))
            .await
            .expect("join")
            .expect("delivered");
        assert_eq!(receipt.detail, "API returned status 202");

        let form = captured.token_form.lock().expect("capture").clone().expect("token request");
        assert!(form.contains("grant_type=client_credentials"));
        assert!(form.contains("client_id=client-1"));
        assert_eq!(
            captured.authorization.lock().expect("capture").as_deref(),
            Some("Bearer token-123")
        );
        assert!(captured.payload.lock().expect("capture").is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn surfaces_graph_error_message() {
        let (base, _captured) = fake_graph().await;
        let graph = mailer(&base, "tenant-1", "blocked@example.com");
        let err = tokio::task::spawn_blocking(move || graph.send(&sample_email()))
            .await
            .expect("join")
            .expect_err("forbidden");
        match err {
            MailError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Access is denied.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn token_failure_reports_description() {
        let (base, captured) = fake_graph().await;
        let graph = mailer(&base, "bad-tenant", "forms@example.com");
        let err = tokio::task::spawn_blocking(move || graph.send(&sample_email()))
            .await
            .expect("join")
            .expect_err("token rejected");
        assert!(matches!(err, MailError::Authentication(ref message) if message.contains("AADSTS7000215")));
        assert!(captured.payload.lock().expect("capture").is_none());
    }
}
