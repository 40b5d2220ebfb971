use chrono::NaiveDate;
use serde::Deserialize;

use super::choices::Meridiem;
use super::input::{deserialize_flag, deserialize_optional_date, deserialize_signature};
use super::signature::Signature;
use super::validation::RequiredEntry;
use super::{
    file_name_part, EmailTemplate, FieldMap, FieldSpec, FormDefinition, FormKind, FormRecord,
    RequiredSpec,
};

pub const TITLE: &str = "Operator Pay Exception Form";
pub const WORKSHEET: &str = "Pay Exception Forms";

pub static FIELDS: [FieldSpec; 28] = [
    FieldSpec::inline("Date", "date"),
    FieldSpec::inline("Name", "name"),
    FieldSpec::inline("Run #", "run"),
    FieldSpec::inline("Bus #", "bus_number"),
    FieldSpec::inline("ID #", "id_number"),
    FieldSpec::inline("Route #", "route"),
    FieldSpec::inline("Clock In", "clock_in"),
    FieldSpec::inline("AM/PM", "am_pm1"),
    FieldSpec::inline("Scheduled Clock In", "clock_in_before"),
    FieldSpec::inline("AM/PM", "am_pm2"),
    FieldSpec::inline("Clock Out", "clock_out"),
    FieldSpec::inline("AM/PM", "am_pm3"),
    FieldSpec::inline("Actual Clock Out", "actual_clock_out"),
    FieldSpec::inline("AM/PM", "am_pm4"),
    FieldSpec::inline("Weather", "weather"),
    FieldSpec::inline("Extra Work", "extra_work"),
    FieldSpec::inline("Traffic Delay", "traffic_delay"),
    FieldSpec::inline("Incident Report", "incident_report"),
    FieldSpec::inline("Bus Exchange", "bus_exchange"),
    FieldSpec::inline("Missed Meal", "missed_meal"),
    FieldSpec::inline("Road Call", "road_call"),
    FieldSpec::long_text("Traffic Location", "traffic_location"),
    FieldSpec::inline("Time Reported to Command", "time_reported_to_command"),
    FieldSpec::inline("AM/PM", "am_pm5"),
    FieldSpec::long_text("Explanation", "pay_explanation"),
    FieldSpec::inline("Operator Signature Date", "pay_operator_signature_date"),
    FieldSpec::inline("Signing SQM Name", "pay_signing_sqm_name"),
    FieldSpec::inline("Supervisor Signature Date", "pay_supervisor_signature_date"),
];

pub static COLUMNS: [&str; 28] = [
    "date",
    "name",
    "run",
    "bus_number",
    "id_number",
    "route",
    "clock_in",
    "am_pm1",
    "clock_in_before",
    "am_pm2",
    "clock_out",
    "am_pm3",
    "actual_clock_out",
    "am_pm4",
    "weather",
    "extra_work",
    "traffic_delay",
    "incident_report",
    "bus_exchange",
    "missed_meal",
    "road_call",
    "traffic_location",
    "time_reported_to_command",
    "am_pm5",
    "pay_explanation",
    "pay_operator_signature_date",
    "pay_signing_sqm_name",
    "pay_supervisor_signature_date",
];

pub static REQUIRED: [RequiredSpec; 12] = [
    RequiredSpec::field("pay_date", "Date").on("date"),
    RequiredSpec::field("pay_name", "Name").on("name"),
    RequiredSpec::field("pay_run", "Run #").on("run"),
    RequiredSpec::field("pay_bus_number", "Bus #").on("bus_number"),
    RequiredSpec::field("pay_id_number", "ID #").on("id_number"),
    RequiredSpec::field("pay_route", "Route #").on("route"),
    RequiredSpec::field("pay_explanation", "Explanation"),
    RequiredSpec::field("pay_operator_signature_date", "Operator Signature Date"),
    RequiredSpec::field("pay_signing_sqm_name", "Signing SQM Name"),
    RequiredSpec::field("pay_supervisor_signature_date", "Supervisor Signature Date"),
    RequiredSpec::signature("pay_operator_signature", "Operator Signature").on("operator_signature"),
    RequiredSpec::signature("pay_supervisor_signature", "Supervisor Signature").on("supervisor_signature"),
];

pub static DEFINITION: FormDefinition = FormDefinition {
    kind: FormKind::PayException,
    title: TITLE,
    worksheet: WORKSHEET,
    fields: &FIELDS,
    columns: &COLUMNS,
    required: &REQUIRED,
};

/// One operator pay exception claim.
///
/// The seven reason checkboxes are independent flags; none of them is
/// required, so a claim may carry only a written explanation. Identity and
/// signature fields also accept the paper form's `pay_` prefixed names.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PayExceptionReport {
    #[serde(alias = "pay_date", deserialize_with = "deserialize_optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(alias = "pay_name")]
    pub name: String,
    #[serde(alias = "pay_run")]
    pub run: String,
    #[serde(alias = "pay_bus_number")]
    pub bus_number: String,
    #[serde(alias = "pay_id_number")]
    pub id_number: String,
    #[serde(alias = "pay_route")]
    pub route: String,
    pub clock_in: String,
    pub am_pm1: Meridiem,
    pub clock_in_before: String,
    pub am_pm2: Meridiem,
    pub clock_out: String,
    pub am_pm3: Meridiem,
    pub actual_clock_out: String,
    pub am_pm4: Meridiem,
    #[serde(deserialize_with = "deserialize_flag")]
    pub weather: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub extra_work: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub traffic_delay: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub incident_report: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub bus_exchange: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub missed_meal: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub road_call: bool,
    pub traffic_location: String,
    pub time_reported_to_command: String,
    pub am_pm5: Meridiem,
    pub pay_explanation: String,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub pay_operator_signature_date: Option<NaiveDate>,
    pub pay_signing_sqm_name: String,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub pay_supervisor_signature_date: Option<NaiveDate>,
    #[serde(alias = "pay_operator_signature", deserialize_with = "deserialize_signature")]
    pub operator_signature: Option<Signature>,
    #[serde(alias = "pay_supervisor_signature", deserialize_with = "deserialize_signature")]
    pub supervisor_signature: Option<Signature>,
}

impl PayExceptionReport {
    fn date_label(&self) -> String {
        self.date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

impl FormRecord for PayExceptionReport {
    fn definition(&self) -> &'static FormDefinition {
        &DEFINITION
    }

    fn field_map(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("date", self.date);
        map.insert("name", self.name.as_str());
        map.insert("run", self.run.as_str());
        map.insert("bus_number", self.bus_number.as_str());
        map.insert("id_number", self.id_number.as_str());
        map.insert("route", self.route.as_str());
        map.insert("clock_in", self.clock_in.as_str());
        map.insert("am_pm1", self.am_pm1.label());
        map.insert("clock_in_before", self.clock_in_before.as_str());
        map.insert("am_pm2", self.am_pm2.label());
        map.insert("clock_out", self.clock_out.as_str());
        map.insert("am_pm3", self.am_pm3.label());
        map.insert("actual_clock_out", self.actual_clock_out.as_str());
        map.insert("am_pm4", self.am_pm4.label());
        map.insert("weather", self.weather);
        map.insert("extra_work", self.extra_work);
        map.insert("traffic_delay", self.traffic_delay);
        map.insert("incident_report", self.incident_report);
        map.insert("bus_exchange", self.bus_exchange);
        map.insert("missed_meal", self.missed_meal);
        map.insert("road_call", self.road_call);
        map.insert("traffic_location", self.traffic_location.as_str());
        map.insert("time_reported_to_command", self.time_reported_to_command.as_str());
        map.insert("am_pm5", self.am_pm5.label());
        map.insert("pay_explanation", self.pay_explanation.as_str());
        map.insert("pay_operator_signature_date", self.pay_operator_signature_date);
        map.insert("pay_signing_sqm_name", self.pay_signing_sqm_name.as_str());
        map.insert(
            "pay_supervisor_signature_date",
            self.pay_supervisor_signature_date,
        );
        map
    }

    fn required_entries(&self) -> Vec<RequiredEntry<'_>> {
        let [
            date,
            name,
            run,
            bus_number,
            id_number,
            route,
            explanation,
            operator_signed_on,
            sqm_name,
            supervisor_signed_on,
            operator_signature,
            supervisor_signature,
        ] = &REQUIRED;
        vec![
            RequiredEntry::field(date, self.date),
            RequiredEntry::field(name, self.name.as_str()),
            RequiredEntry::field(run, self.run.as_str()),
            RequiredEntry::field(bus_number, self.bus_number.as_str()),
            RequiredEntry::field(id_number, self.id_number.as_str()),
            RequiredEntry::field(route, self.route.as_str()),
            RequiredEntry::field(explanation, self.pay_explanation.as_str()),
            RequiredEntry::field(operator_signed_on, self.pay_operator_signature_date),
            RequiredEntry::field(sqm_name, self.pay_signing_sqm_name.as_str()),
            RequiredEntry::field(supervisor_signed_on, self.pay_supervisor_signature_date),
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
            "pay_exception_{}_{}.pdf",
            file_name_part(&self.name),
            self.date_label()
        )
    }

    fn email_template(&self) -> EmailTemplate {
        let date = self.date_label();
        EmailTemplate {
            subject: format!("Pay Exception Form: {} on {}", self.name, date),
            body: format!(
                "A pay exception form has been submitted.\n\nOperator: {}\nDate: {}\nRun #: {}\n\nSee attached PDF for details.",
                self.name, date, self.run
            ),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::completed_claim;
    use super::*;
    use crate::forms::validate;

    #[test]
    fn columns_follow_the_pdf_field_order() {
        let field_keys: Vec<_> = FIELDS.iter().map(|spec| spec.key).collect();
        assert_eq!(field_keys, COLUMNS.to_vec());
    }

    #[test]
    fn missing_explanation_is_the_only_gap() {
        let claim = PayExceptionReport {
            pay_explanation: "   ".to_string(),
            ..completed_claim()
        };
        let missing = validate(&claim.required_entries());
        assert_eq!(missing.keys(), vec!["pay_explanation"]);
        assert_eq!(
            missing.banner(),
            "PLEASE FILL IN ALL REQUIRED FIELDS: Explanation"
        );
    }

    #[test]
    fn signature_dates_are_plain_required_dates() {
        let claim = PayExceptionReport {
            pay_operator_signature_date: None,
            ..completed_claim()
        };
        let missing = validate(&claim.required_entries());
        assert_eq!(missing.keys(), vec!["pay_operator_signature_date"]);
    }

    #[test]
    fn unsigned_claim_reports_both_signatures() {
        let claim = PayExceptionReport {
            operator_signature: None,
            supervisor_signature: Some(Signature::from_rgba(
                crate::forms::signature::fixtures::blank_canvas(),
            )),
            ..completed_claim()
        };
        let missing = validate(&claim.required_entries());
        assert_eq!(
            missing.keys(),
            vec!["pay_operator_signature", "pay_supervisor_signature"]
        );
    }

    #[test]
    fn reason_flags_become_boolean_cells() {
        let map = completed_claim().field_map();
        assert_eq!(map.len(), COLUMNS.len());
        let row = map.row(&COLUMNS);
        assert_eq!(row[16].cell_text(), "TRUE");
        assert_eq!(row[14].cell_text(), "FALSE");
        assert_eq!(row[0].cell_text(), "2025-05-09");
    }

    #[test]
    fn file_name_and_subject_use_name_and_date() {
        let claim = completed_claim();
        assert_eq!(claim.pdf_file_name(), "pay_exception_Priya Raman_2025-05-09.pdf");
        let template = claim.email_template();
        assert_eq!(template.subject, "Pay Exception Form: Priya Raman on 2025-05-09");
        assert!(template.body.contains("Run #: 118"));
    }
}
