use chrono::NaiveDate;
use serde::Deserialize;

use super::choices::{IncidentType, Meridiem, ReportRecipient, YesNo};
use super::input::{deserialize_flag, deserialize_optional_date, deserialize_signature};
use super::signature::Signature;
use super::validation::RequiredEntry;
use super::{
    file_name_part, EmailTemplate, FieldMap, FieldSpec, FormDefinition, FormKind, FormRecord,
    RequiredSpec,
};

pub const TITLE: &str = "Operator Incident Report";
pub const WORKSHEET: &str = "Incident Reports";

pub static FIELDS: [FieldSpec; 32] = [
    FieldSpec::inline("Date", "date"),
    FieldSpec::inline("Time", "time"),
    FieldSpec::inline("AM/PM", "am_pm1"),
    FieldSpec::inline("Brief #", "brief"),
    FieldSpec::inline("Operator Name", "operator_name"),
    FieldSpec::inline("Vehicle #", "vehicle"),
    FieldSpec::inline("Operator ID", "operator_id"),
    FieldSpec::inline("Route #", "route"),
    FieldSpec::inline("Depot", "depot"),
    FieldSpec::inline("Run #", "run"),
    FieldSpec::inline("Report Submitted To", "report_submitted_to"),
    FieldSpec::inline("Incident Type", "incident_type"),
    FieldSpec::long_text("Incident Type Other", "incident_type_other"),
    FieldSpec::inline("Reported Immediately", "reported_immediately"),
    FieldSpec::inline("Reported to Dispatcher", "reported_to_dispatcher"),
    FieldSpec::long_text(
        "Reason for Non-Immediate Report",
        "reason_for_non_immediate_report",
    ),
    FieldSpec::inline("SQM Responded", "sqm_respond_to_incident"),
    FieldSpec::inline("Responding SQM", "responding_sqm"),
    FieldSpec::inline("Date Incident Occurred", "date_incident_occurred"),
    FieldSpec::inline("Date Incident Reported", "date_incident_reported"),
    FieldSpec::inline("Time Incident Occurred", "time_incident_occurred"),
    FieldSpec::inline("AM/PM", "am_pm2"),
    FieldSpec::inline("Time Incident Reported", "time_incident_reported"),
    FieldSpec::inline("AM/PM", "am_pm3"),
    FieldSpec::inline("No Actual Date/Time", "no_actual_date_and_time"),
    FieldSpec::inline("Late Report", "late_report"),
    FieldSpec::inline("Incident Location", "incident_location"),
    FieldSpec::inline("Passenger Name", "passenger_name"),
    FieldSpec::inline("Passenger ID/Seat #", "passenger_id"),
    FieldSpec::long_text("Explanation of Incident", "explanation_of_incident"),
    FieldSpec::inline("Signing SQM Name", "signed_sqm_name"),
    FieldSpec::inline("Date Submitted", "date_submitted"),
];

/// Worksheet column order. Differs from the PDF order around the depot and
/// vehicle columns; existing sheets depend on it.
pub static COLUMNS: [&str; 32] = [
    "date",
    "time",
    "am_pm1",
    "brief",
    "operator_name",
    "operator_id",
    "depot",
    "vehicle",
    "route",
    "run",
    "report_submitted_to",
    "incident_type",
    "incident_type_other",
    "reported_immediately",
    "reported_to_dispatcher",
    "reason_for_non_immediate_report",
    "sqm_respond_to_incident",
    "responding_sqm",
    "date_incident_occurred",
    "date_incident_reported",
    "time_incident_occurred",
    "am_pm2",
    "time_incident_reported",
    "am_pm3",
    "no_actual_date_and_time",
    "late_report",
    "incident_location",
    "passenger_name",
    "passenger_id",
    "explanation_of_incident",
    "signed_sqm_name",
    "date_submitted",
];

pub static REQUIRED: [RequiredSpec; 13] = [
    RequiredSpec::field("incident_time", "Time").on("time"),
    RequiredSpec::field("incident_brief", "Brief #").on("brief"),
    RequiredSpec::field("incident_operator_name", "Operator Name").on("operator_name"),
    RequiredSpec::field("incident_vehicle", "Vehicle #").on("vehicle"),
    RequiredSpec::field("incident_operator_id", "Operator ID").on("operator_id"),
    RequiredSpec::field("incident_route", "Route #").on("route"),
    RequiredSpec::field("incident_depot", "Depot").on("depot"),
    RequiredSpec::field("incident_run", "Run #").on("run"),
    RequiredSpec::field("incident_location", "Location of incident"),
    RequiredSpec::field("explanation_of_incident", "Explain what happened"),
    RequiredSpec::field("incident_signed_sqm_name", "Signed SQM Name").on("signed_sqm_name"),
    RequiredSpec::signature("operator_signature", "Operator Signature"),
    RequiredSpec::signature("supervisor_signature", "Supervisor Signature"),
];

pub static DEFINITION: FormDefinition = FormDefinition {
    kind: FormKind::Incident,
    title: TITLE,
    worksheet: WORKSHEET,
    fields: &FIELDS,
    columns: &COLUMNS,
    required: &REQUIRED,
};

/// One operator incident report as submitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IncidentReport {
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(alias = "incident_time")]
    pub time: String,
    pub am_pm1: Meridiem,
    #[serde(alias = "incident_brief")]
    pub brief: String,
    #[serde(alias = "incident_operator_name")]
    pub operator_name: String,
    #[serde(alias = "incident_operator_id")]
    pub operator_id: String,
    #[serde(alias = "incident_depot")]
    pub depot: String,
    #[serde(alias = "incident_vehicle")]
    pub vehicle: String,
    #[serde(alias = "incident_route")]
    pub route: String,
    #[serde(alias = "incident_run")]
    pub run: String,
    pub report_submitted_to: ReportRecipient,
    pub incident_type: IncidentType,
    pub incident_type_other: String,
    pub reported_immediately: YesNo,
    pub reported_to_dispatcher: String,
    pub reason_for_non_immediate_report: String,
    pub sqm_respond_to_incident: YesNo,
    pub responding_sqm: String,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub date_incident_occurred: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub date_incident_reported: Option<NaiveDate>,
    pub time_incident_occurred: String,
    pub am_pm2: Meridiem,
    pub time_incident_reported: String,
    pub am_pm3: Meridiem,
    #[serde(deserialize_with = "deserialize_flag")]
    pub no_actual_date_and_time: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub late_report: bool,
    pub incident_location: String,
    pub passenger_name: String,
    pub passenger_id: String,
    pub explanation_of_incident: String,
    #[serde(alias = "incident_signed_sqm_name")]
    pub signed_sqm_name: String,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub date_submitted: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_signature")]
    pub operator_signature: Option<Signature>,
    #[serde(deserialize_with = "deserialize_signature")]
    pub supervisor_signature: Option<Signature>,
}

impl IncidentReport {
    fn date_label(&self) -> String {
        self.date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

impl FormRecord for IncidentReport {
    fn definition(&self) -> &'static FormDefinition {
        &DEFINITION
    }

    fn field_map(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("date", self.date);
        map.insert("time", self.time.as_str());
        map.insert("am_pm1", self.am_pm1.label());
        map.insert("brief", self.brief.as_str());
        map.insert("operator_name", self.operator_name.as_str());
        map.insert("operator_id", self.operator_id.as_str());
        map.insert("depot", self.depot.as_str());
        map.insert("vehicle", self.vehicle.as_str());
        map.insert("route", self.route.as_str());
        map.insert("run", self.run.as_str());
        map.insert("report_submitted_to", self.report_submitted_to.label());
        map.insert("incident_type", self.incident_type.label());
        map.insert("incident_type_other", self.incident_type_other.as_str());
        map.insert("reported_immediately", self.reported_immediately.label());
        map.insert("reported_to_dispatcher", self.reported_to_dispatcher.as_str());
        map.insert(
            "reason_for_non_immediate_report",
            self.reason_for_non_immediate_report.as_str(),
        );
        map.insert("sqm_respond_to_incident", self.sqm_respond_to_incident.label());
        map.insert("responding_sqm", self.responding_sqm.as_str());
        map.insert("date_incident_occurred", self.date_incident_occurred);
        map.insert("date_incident_reported", self.date_incident_reported);
        map.insert("time_incident_occurred", self.time_incident_occurred.as_str());
        map.insert("am_pm2", self.am_pm2.label());
        map.insert("time_incident_reported", self.time_incident_reported.as_str());
        map.insert("am_pm3", self.am_pm3.label());
        map.insert("no_actual_date_and_time", self.no_actual_date_and_time);
        map.insert("late_report", self.late_report);
        map.insert("incident_location", self.incident_location.as_str());
        map.insert("passenger_name", self.passenger_name.as_str());
        map.insert("passenger_id", self.passenger_id.as_str());
        map.insert("explanation_of_incident", self.explanation_of_incident.as_str());
        map.insert("signed_sqm_name", self.signed_sqm_name.as_str());
        map.insert("date_submitted", self.date_submitted);
        map
    }

    fn required_entries(&self) -> Vec<RequiredEntry<'_>> {
        let [
            time,
            brief,
            operator_name,
            vehicle,
            operator_id,
            route,
            depot,
            run,
            location,
            explanation,
            sqm_name,
            operator_signature,
            supervisor_signature,
        ] = &REQUIRED;
        vec![
            RequiredEntry::field(time, self.time.as_str()),
            RequiredEntry::field(brief, self.brief.as_str()),
            RequiredEntry::field(operator_name, self.operator_name.as_str()),
            RequiredEntry::field(vehicle, self.vehicle.as_str()),
            RequiredEntry::field(operator_id, self.operator_id.as_str()),
            RequiredEntry::field(route, self.route.as_str()),
            RequiredEntry::field(depot, self.depot.as_str()),
            RequiredEntry::field(run, self.run.as_str()),
            RequiredEntry::field(location, self.incident_location.as_str()),
            RequiredEntry::field(explanation, self.explanation_of_incident.as_str()),
            RequiredEntry::field(sqm_name, self.signed_sqm_name.as_str()),
            RequiredEntry::signature(operator_signature, self.operator_signature.as_ref()),
            RequiredEntry::signature(supervisor_signature, self.supervisor_signature.as_ref()),
        ]
    }

    fn operator_signature(&self) -> Option<&Signature> {
        self.operator_signature.as_ref()
    }

    fn supervisor_signature(&self) -> Option<&Signature> {
        self.supervisor_signature.as_ref()
    }

    fn pdf_file_name(&self) -> String {
        format!(
            "incident_{}_{}_for_brief_{}.pdf",
            file_name_part(&self.operator_name),
            self.date_label(),
            file_name_part(&self.brief)
        )
    }

    fn email_template(&self) -> EmailTemplate {
        let date = self.date_label();
        EmailTemplate {
            subject: format!(
                "Incident Report: {} on {} for Brief # {}",
                self.operator_name, date, self.brief
            ),
            body: format!(
                "An incident report has been submitted.\n\nOperator: {}\nDate: {}\nBrief: {}\n\nSee attached PDF for details.",
                self.operator_name, date, self.brief
            ),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::forms::signature::fixtures::stroked_canvas;

    pub(crate) fn completed_report() -> IncidentReport {
        let date = NaiveDate::from_ymd_opt(2025, 4, 18);
        IncidentReport {
            date,
            time: "7:45".to_string(),
            am_pm1: Meridiem::Am,
            brief: "2231".to_string(),
            operator_name: "Dana Whitfield".to_string(),
            operator_id: "40871".to_string(),
            depot: "North".to_string(),
            vehicle: "1187".to_string(),
            route: "14".to_string(),
            run: "322".to_string(),
            report_submitted_to: ReportRecipient::DispatchWindow,
            incident_type: IncidentType::PassengerInjury,
            reported_immediately: YesNo::Yes,
            reported_to_dispatcher: "K. Boyd".to_string(),
            sqm_respond_to_incident: YesNo::No,
            date_incident_occurred: date,
            date_incident_reported: date,
            time_incident_occurred: "7:30".to_string(),
            time_incident_reported: "7:40".to_string(),
            incident_location: "5th & Main".to_string(),
            passenger_name: "J. Ruiz".to_string(),
            passenger_id: "Seat 12".to_string(),
            explanation_of_incident:
                "Passenger lost footing while boarding during heavy rain; first aid offered."
                    .to_string(),
            signed_sqm_name: "M. Castillo".to_string(),
            date_submitted: date,
            operator_signature: Some(Signature::from_rgba(stroked_canvas())),
            supervisor_signature: Some(Signature::from_rgba(stroked_canvas())),
            ..IncidentReport::default()
        }
    }
}
