//! Browser-facing forms.
//!
//! Each page is rendered from the form's [`FormDefinition`]: the field list
//! decides the order, the current [`FieldMap`] decides the widget and the
//! value, and the required entries decide where the "THIS FIELD IS REQUIRED"
//! markers go after a rejected post.

use crate::infra::escape_html;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use chrono::Local;
use opsforms::forms::signature::{CANVAS_HEIGHT, CANVAS_WIDTH};
use opsforms::forms::{
    FieldMap, FieldSpec, FieldValue, FormDefinition, FormKind, FormRecord, IncidentReport,
    IncidentType, Meridiem, MissingFields, PayExceptionReport, ReportRecipient, Signature, YesNo,
};
use opsforms::submission::{SubmissionError, SubmissionReceipt, SubmissionService};
use serde::de::DeserializeOwned;
use std::fmt::Write;
use std::sync::Arc;

const STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;max-width:760px;margin:2em auto;padding:0 1em}\
label{display:block;font-weight:bold;margin-top:1em}\
input[type=text],input[type=date],textarea{width:100%;padding:.4em;box-sizing:border-box}\
.required{background:#fdd;color:#a00;display:inline-block;padding:.1em .4em;margin-top:1em}\
.banner{background:#a00;color:#fff;padding:.6em;margin:1em 0}\
.step{padding:.4em;margin:.4em 0}.completed{background:#e6f4ea}.failed{background:#fdd}.skipped{background:#fff4d6}\
canvas{border:1px solid #444;touch-action:none;display:block;margin-top:.4em}";

const SIGNATURE_SCRIPT: &str = r#"<script>
document.querySelectorAll('canvas[data-signature]').forEach(function (canvas) {
  var input = document.getElementById(canvas.dataset.signature);
  var ctx = canvas.getContext('2d');
  var drawing = false;
  ctx.lineWidth = 3; ctx.lineCap = 'round'; ctx.strokeStyle = '#000';
  if (input.value) {
    var img = new Image();
    img.onload = function () { ctx.drawImage(img, 0, 0); };
    img.src = input.value;
  }
  function point(e) { var r = canvas.getBoundingClientRect(); return [e.clientX - r.left, e.clientY - r.top]; }
  canvas.addEventListener('pointerdown', function (e) { drawing = true; var p = point(e); ctx.beginPath(); ctx.moveTo(p[0], p[1]); });
  canvas.addEventListener('pointermove', function (e) { if (!drawing) return; var p = point(e); ctx.lineTo(p[0], p[1]); ctx.stroke(); });
  ['pointerup', 'pointerleave'].forEach(function (name) {
    canvas.addEventListener(name, function () { if (drawing) { drawing = false; input.value = canvas.toDataURL('image/png'); } });
  });
  document.querySelector('[data-clear="' + canvas.dataset.signature + '"]').addEventListener('click', function () {
    ctx.clearRect(0, 0, canvas.width, canvas.height); input.value = '';
  });
});
</script>"#;

pub(crate) fn pages_router(service: Arc<SubmissionService>) -> Router {
    Router::new()
        .route("/", get(home))
        .route(
            "/forms/incident",
            get(blank_form::<IncidentReport>).post(submit_page::<IncidentReport>),
        )
        .route(
            "/forms/pay-exception",
            get(blank_form::<PayExceptionReport>).post(submit_page::<PayExceptionReport>),
        )
        .with_state(service)
}

async fn home() -> Html<String> {
    let mut body = String::from("<h1>Welcome</h1>\n<ul>\n");
    for kind in FormKind::ALL {
        writeln!(
            body,
            "<li><a href=\"/forms/{}\">{}</a></li>",
            kind.slug(),
            escape_html(kind.definition().title)
        )
        .expect("form link");
    }
    body.push_str("</ul>\n");
    Html(layout("Operator Forms", &body))
}

async fn blank_form<F>() -> Html<String>
where
    F: FormRecord + Default,
{
    let record = F::default();
    let mut values = record.field_map();
    let today = Local::now().date_naive();
    for spec in record.definition().fields {
        if matches!(values.get(spec.key), Some(FieldValue::Date(None))) {
            values.insert(spec.key, FieldValue::Date(Some(today)));
        }
    }
    Html(render_form_page(record.definition(), &values, [None, None], None))
}

async fn submit_page<F>(
    State(service): State<Arc<SubmissionService>>,
    form: Result<Form<F>, FormRejection>,
) -> Response
where
    F: FormRecord + Default + DeserializeOwned + 'static,
{
    let definition = F::default().definition();
    let record = match form {
        Ok(Form(record)) => record,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Html(error_page(definition, &rejection.body_text())),
            )
                .into_response()
        }
    };

    let outcome = tokio::task::spawn_blocking(move || {
        let result = service.submit(&record);
        (record, result)
    })
    .await;

    match outcome {
        Ok((_, Ok(receipt))) => Html(render_result_page(definition, &receipt)).into_response(),
        Ok((record, Err(SubmissionError::Validation(missing)))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(render_form_page(
                definition,
                &record.field_map(),
                [record.operator_signature(), record.supervisor_signature()],
                Some(&missing),
            )),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(error_page(definition, &err.to_string())),
        )
            .into_response(),
    }
}

enum Widget {
    Text,
    TextArea,
    Date,
    Checkbox,
    Choice(Vec<&'static str>),
}

fn choices(key: &str) -> Option<Vec<&'static str>> {
    let labels: Vec<&'static str> = match key {
        key if key.starts_with("am_pm") => Meridiem::ALL.iter().map(Meridiem::label).collect(),
        "report_submitted_to" => ReportRecipient::ALL.iter().map(ReportRecipient::label).collect(),
        "incident_type" => IncidentType::ALL.iter().map(IncidentType::label).collect(),
        "reported_immediately" | "sqm_respond_to_incident" => {
            YesNo::ALL.iter().map(YesNo::label).collect()
        }
        _ => return None,
    };
    Some(labels)
}

fn widget(spec: &FieldSpec, value: Option<&FieldValue>) -> Widget {
    match value {
        Some(FieldValue::Date(_)) => Widget::Date,
        Some(FieldValue::Flag(_)) => Widget::Checkbox,
        _ => match choices(spec.key) {
            Some(options) => Widget::Choice(options),
            None if spec.is_long_text() => Widget::TextArea,
            None => Widget::Text,
        },
    }
}

fn required_marker(
    html: &mut String,
    definition: &FormDefinition,
    input: &str,
    missing: Option<&MissingFields>,
) {
    let flagged = definition
        .required_for_input(input)
        .zip(missing)
        .is_some_and(|(spec, missing)| missing.contains(spec.key));
    if flagged {
        html.push_str("<div class=\"required\">THIS FIELD IS REQUIRED &darr;</div>\n");
    }
}

fn render_form_page(
    definition: &FormDefinition,
    values: &FieldMap,
    signatures: [Option<&Signature>; 2],
    missing: Option<&MissingFields>,
) -> String {
    let mut html = String::new();
    writeln!(html, "<h1>{}</h1>", escape_html(definition.title)).expect("title");
    html.push_str("<p><a href=\"/\">Return Home</a></p>\n");
    writeln!(
        html,
        "<form method=\"post\" action=\"/forms/{}\">",
        definition.kind.slug()
    )
    .expect("form open");

    for spec in definition.fields {
        let value = values.get(spec.key);
        required_marker(&mut html, definition, spec.key, missing);
        let label = escape_html(spec.label);
        let current = escape_html(&values.display(spec.key));
        let written = match widget(spec, value) {
            Widget::Text => writeln!(
                html,
                "<label for=\"{key}\">{label}</label><input type=\"text\" id=\"{key}\" name=\"{key}\" value=\"{current}\">",
                key = spec.key
            ),
            Widget::TextArea => writeln!(
                html,
                "<label for=\"{key}\">{label}</label><textarea id=\"{key}\" name=\"{key}\" rows=\"5\">{current}</textarea>",
                key = spec.key
            ),
            Widget::Date => writeln!(
                html,
                "<label for=\"{key}\">{label}</label><input type=\"date\" id=\"{key}\" name=\"{key}\" value=\"{current}\">",
                key = spec.key
            ),
            Widget::Checkbox => {
                let checked = if matches!(value, Some(FieldValue::Flag(true))) {
                    " checked"
                } else {
                    ""
                };
                writeln!(
                    html,
                    "<label><input type=\"checkbox\" name=\"{}\"{checked}> {label}</label>",
                    spec.key
                )
            }
            Widget::Choice(options) => {
                write!(html, "<label>{label}</label>").expect("choice label");
                for option in options {
                    let checked = if values.display(spec.key) == option {
                        " checked"
                    } else {
                        ""
                    };
                    write!(
                        html,
                        "<label style=\"display:inline;font-weight:normal;margin-right:1em\"><input type=\"radio\" name=\"{}\" value=\"{}\"{checked}> {}</label>",
                        spec.key,
                        escape_html(option),
                        escape_html(option)
                    )
                    .expect("choice option");
                }
                writeln!(html)
            }
        };
        written.expect("form field");
    }

    for (input, signature) in ["operator_signature", "supervisor_signature"]
        .into_iter()
        .zip(signatures)
    {
        render_signature_field(&mut html, definition, input, signature, missing);
    }

    if let Some(missing) = missing.filter(|missing| !missing.is_empty()) {
        writeln!(html, "<div class=\"banner\">{}</div>", escape_html(&missing.banner()))
            .expect("banner");
    }
    html.push_str("<p><button type=\"submit\">Submit</button></p>\n</form>\n");
    html.push_str(SIGNATURE_SCRIPT);

    layout(definition.title, &html)
}

fn render_signature_field(
    html: &mut String,
    definition: &FormDefinition,
    input: &str,
    signature: Option<&Signature>,
    missing: Option<&MissingFields>,
) {
    let label = definition
        .required_for_input(input)
        .map(|spec| spec.label)
        .unwrap_or(input);
    required_marker(html, definition, input, missing);
    let data_url = signature.and_then(Signature::data_url).unwrap_or_default();
    writeln!(
        html,
        "<label>{label}</label>\
<canvas width=\"{CANVAS_WIDTH}\" height=\"{CANVAS_HEIGHT}\" data-signature=\"{input}\"></canvas>\
<input type=\"hidden\" id=\"{input}\" name=\"{input}\" value=\"{}\">\
<button type=\"button\" data-clear=\"{input}\">Clear signature</button>",
        escape_html(data_url),
        label = escape_html(label),
    )
    .expect("signature field");
}

fn render_result_page(definition: &FormDefinition, receipt: &SubmissionReceipt) -> String {
    let mut html = String::new();
    let heading = match definition.kind {
        FormKind::Incident => "Incident Report submitted!",
        FormKind::PayException => "Pay Exception Form submitted!",
    };
    writeln!(html, "<h1>{}</h1>", escape_html(definition.title)).expect("title");
    writeln!(
        html,
        "<p>{heading} <small>({})</small></p>",
        escape_html(&receipt.submission_id.0)
    )
    .expect("heading");
    for (name, outcome) in receipt.steps() {
        writeln!(
            html,
            "<div class=\"step {}\"><strong>{name}:</strong> {}</div>",
            outcome.label(),
            escape_html(outcome.message())
        )
        .expect("step outcome");
    }
    writeln!(
        html,
        "<p><a href=\"/forms/{}\">Clear</a> &middot; <a href=\"/\">Return Home</a></p>",
        definition.kind.slug()
    )
    .expect("links");
    layout(definition.title, &html)
}

fn error_page(definition: &FormDefinition, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<div class=\"banner\">The form could not be read: {}</div>\n<p><a href=\"/forms/{}\">Back to the form</a></p>\n",
        escape_html(definition.title),
        escape_html(message),
        definition.kind.slug()
    );
    layout(definition.title, &body)
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{}</title><style>{STYLE}</style></head>\n<body>\n{body}</body>\n</html>\n",
        escape_html(title)
    )
}
