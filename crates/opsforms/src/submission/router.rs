use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::service::{SubmissionError, SubmissionService};
use crate::forms::{FormKind, FormRecord, IncidentReport, PayExceptionReport};

/// JSON endpoints for both forms plus their schema descriptions.
pub fn forms_router(service: Arc<SubmissionService>) -> Router {
    Router::new()
        .route("/api/v1/forms/incident", post(submit_form::<IncidentReport>))
        .route(
            "/api/v1/forms/pay-exception",
            post(submit_form::<PayExceptionReport>),
        )
        .route("/api/v1/forms/:form/fields", get(form_fields))
        .with_state(service)
}

async fn submit_form<F>(
    State(service): State<Arc<SubmissionService>>,
    payload: Result<axum::Json<F>, JsonRejection>,
) -> Response
where
    F: FormRecord + DeserializeOwned + 'static,
{
    let record = match payload {
        Ok(axum::Json(record)) => record,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({ "error": rejection.body_text() })),
            )
                .into_response()
        }
    };

    match tokio::task::spawn_blocking(move || service.submit(&record)).await {
        Ok(Ok(receipt)) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Ok(Err(SubmissionError::Validation(missing))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({ "error": missing.banner(), "missing": missing })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn form_fields(Path(form): Path<String>) -> Response {
    match FormKind::from_slug(&form) {
        Some(kind) => axum::Json(kind.definition()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": format!("unknown form '{form}'") })),
        )
            .into_response(),
    }
}
