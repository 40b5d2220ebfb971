use crate::infra::AppState;
use crate::pages::pages_router;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use opsforms::submission::{forms_router, SubmissionService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_form_routes(service: Arc<SubmissionService>) -> axum::Router {
    forms_router(service.clone())
        .merge(pages_router(service))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use opsforms::notify::LogMailer;
    use opsforms::storage::MemoryWorksheetStore;
    use opsforms::submission::Recipients;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool, output_dir: &std::path::Path) -> axum::Router {
        let service = SubmissionService::new(
            Arc::new(MemoryWorksheetStore::new()),
            Arc::new(LogMailer),
            Recipients::default(),
            output_dir,
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_form_routes(Arc::new(service)).layer(Extension(state))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (status, body) = get(app(false, dir.path()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"ok\""));
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (status, body) = get(app(false, dir.path()), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("initializing"));

        let (status, _) = get(app(true, dir.path()), "/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn pages_and_api_share_one_router() {
        let dir = tempfile::tempdir().expect("tempdir");
        let router = app(true, dir.path());

        let (status, body) = get(router.clone(), "/forms/pay-exception").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Operator Pay Exception Form"));

        let (status, body) = get(router, "/api/v1/forms/pay-exception/fields").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"worksheet\":\"Pay Exception Forms\""));
    }
}
