use chrono::{Local, NaiveDate};
use clap::Args;
use image::{Rgba, RgbaImage};
use opsforms::config::TelemetryConfig;
use opsforms::error::AppError;
use opsforms::forms::signature::{CANVAS_HEIGHT, CANVAS_WIDTH};
use opsforms::forms::{
    FormKind, FormRecord, IncidentReport, IncidentType, Meridiem, PayExceptionReport,
    ReportRecipient, Signature, YesNo,
};
use opsforms::notify::LogMailer;
use opsforms::render::render_form;
use opsforms::storage::CsvWorksheetStore;
use opsforms::submission::{Recipients, SubmissionError, SubmissionReceipt, SubmissionService};
use opsforms::telemetry;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Form the submission belongs to (incident or pay-exception)
    #[arg(long, value_parser = crate::infra::parse_form_kind)]
    pub(crate) form: FormKind,
    /// JSON file holding the submission, as accepted by the HTTP API
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Output path (defaults to the form's PDF file name in the current directory)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Directory receiving the worksheet CSV files and the rendered PDF
    #[arg(long, default_value = "demo-output")]
    pub(crate) output_dir: PathBuf,
    /// Report date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = opsforms::forms::input::parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

pub(crate) fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let RenderArgs {
        form,
        input,
        output,
    } = args;

    let raw = fs::read_to_string(&input)?;
    let record: Box<dyn FormRecord> = match form {
        FormKind::Incident => Box::new(serde_json::from_str::<IncidentReport>(&raw)?),
        FormKind::PayException => Box::new(serde_json::from_str::<PayExceptionReport>(&raw)?),
    };

    let bytes = render_form(record.as_ref())?;
    let path = output.unwrap_or_else(|| PathBuf::from(record.pdf_file_name()));
    fs::write(&path, &bytes)?;

    println!(
        "Rendered {} ({} bytes) to {}",
        record.definition().title,
        bytes.len(),
        path.display()
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { output_dir, date } = args;
    let date = date.unwrap_or_else(|| Local::now().date_naive());

    telemetry::init(&TelemetryConfig {
        log_level: "info".to_string(),
        ansi: false,
    })?;

    let service = SubmissionService::new(
        Arc::new(CsvWorksheetStore::new(output_dir.join("sheets"))),
        Arc::new(LogMailer),
        Recipients {
            to: vec!["safety@example.com".to_string()],
            cc: vec!["depot-supervisors@example.com".to_string()],
        },
        output_dir.join("pdf"),
    );

    println!("Operator forms demo");

    let incomplete = IncidentReport {
        explanation_of_incident: String::new(),
        supervisor_signature: None,
        ..sample_incident(date)
    };
    match service.submit(&incomplete) {
        Err(SubmissionError::Validation(missing)) => {
            println!("\nFirst attempt rejected before any I/O:");
            println!("  {}", missing.banner());
        }
        Ok(receipt) => print_receipt(&receipt),
    }

    println!("\nSecond attempt with every required entry:");
    let receipt = service.submit(&sample_incident(date))?;
    print_receipt(&receipt);

    println!("\nOutputs written under {}", output_dir.display());
    Ok(())
}

fn print_receipt(receipt: &SubmissionReceipt) {
    println!("  Submission {} ({})", receipt.submission_id, receipt.form);
    for (name, outcome) in receipt.steps() {
        println!("  - {name:<11} {:<9} {}", outcome.label(), outcome.message());
    }
}

fn sample_incident(date: NaiveDate) -> IncidentReport {
    IncidentReport {
        date: Some(date),
        time: "4:15".to_string(),
        am_pm1: Meridiem::Pm,
        brief: "7702".to_string(),
        operator_name: "Jordan Ellis".to_string(),
        operator_id: "41877".to_string(),
        depot: "East".to_string(),
        vehicle: "1532".to_string(),
        route: "14".to_string(),
        run: "221".to_string(),
        report_submitted_to: ReportRecipient::Sqm,
        incident_type: IncidentType::VehicleDamage,
        reported_immediately: YesNo::Yes,
        reported_to_dispatcher: "C. Nguyen".to_string(),
        sqm_respond_to_incident: YesNo::Yes,
        responding_sqm: "P. Morales".to_string(),
        date_incident_occurred: Some(date),
        date_incident_reported: Some(date),
        time_incident_occurred: "3:50".to_string(),
        am_pm2: Meridiem::Pm,
        time_incident_reported: "3:55".to_string(),
        am_pm3: Meridiem::Pm,
        incident_location: "Depot yard, lane 3".to_string(),
        explanation_of_incident: "While pulling into lane 3 the right mirror contacted the \
            fuel island bollard. Mirror housing cracked; no injuries and no passengers aboard."
            .to_string(),
        signed_sqm_name: "P. Morales".to_string(),
        date_submitted: Some(date),
        operator_signature: Some(sample_signature(0)),
        supervisor_signature: Some(sample_signature(12)),
        ..IncidentReport::default()
    }
}

/// A wavy pen stroke across the canvas.
fn sample_signature(phase: u32) -> Signature {
    let mut canvas = RgbaImage::new(CANVAS_WIDTH, CANVAS_HEIGHT);
    let middle = CANVAS_HEIGHT as f32 / 2.0;
    for x in 60..(CANVAS_WIDTH - 80) {
        let y = middle + ((x + phase) as f32 / 24.0).sin() * 30.0;
        for thickness in 0..3 {
            canvas.put_pixel(x, y as u32 + thickness, Rgba([20, 20, 20, 255]));
        }
    }
    Signature::from_rgba(canvas)
}
