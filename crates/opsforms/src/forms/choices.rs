use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Meridiem {
    #[default]
    #[serde(rename = "AM", alias = "am")]
    Am,
    #[serde(rename = "PM", alias = "pm")]
    Pm,
}

impl Meridiem {
    pub const ALL: [Meridiem; 2] = [Meridiem::Am, Meridiem::Pm];

    pub fn label(&self) -> &'static str {
        match self {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        }
    }
}

/// Where the operator handed in the incident report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReportRecipient {
    #[default]
    #[serde(rename = "SQM")]
    Sqm,
    #[serde(rename = "Dispatch Window")]
    DispatchWindow,
    #[serde(rename = "Safety Dept")]
    SafetyDept,
}

impl ReportRecipient {
    pub const ALL: [ReportRecipient; 3] = [
        ReportRecipient::Sqm,
        ReportRecipient::DispatchWindow,
        ReportRecipient::SafetyDept,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReportRecipient::Sqm => "SQM",
            ReportRecipient::DispatchWindow => "Dispatch Window",
            ReportRecipient::SafetyDept => "Safety Dept",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IncidentType {
    #[default]
    #[serde(rename = "Passenger Accident")]
    PassengerAccident,
    #[serde(rename = "Passenger Incident")]
    PassengerIncident,
    #[serde(rename = "Passenger Injury")]
    PassengerInjury,
    #[serde(rename = "MVA")]
    Mva,
    #[serde(rename = "Vehicle Damage")]
    VehicleDamage,
    #[serde(rename = "Passenger Complaint")]
    PassengerComplaint,
    #[serde(rename = "No Damage Vehicle Incident Report")]
    NoDamageVehicleIncident,
    #[serde(rename = "Other")]
    Other,
}

impl IncidentType {
    pub const ALL: [IncidentType; 8] = [
        IncidentType::PassengerAccident,
        IncidentType::PassengerIncident,
        IncidentType::PassengerInjury,
        IncidentType::Mva,
        IncidentType::VehicleDamage,
        IncidentType::PassengerComplaint,
        IncidentType::NoDamageVehicleIncident,
        IncidentType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            IncidentType::PassengerAccident => "Passenger Accident",
            IncidentType::PassengerIncident => "Passenger Incident",
            IncidentType::PassengerInjury => "Passenger Injury",
            IncidentType::Mva => "MVA",
            IncidentType::VehicleDamage => "Vehicle Damage",
            IncidentType::PassengerComplaint => "Passenger Complaint",
            IncidentType::NoDamageVehicleIncident => "No Damage Vehicle Incident Report",
            IncidentType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YesNo {
    #[default]
    Yes,
    No,
}

impl YesNo {
    pub const ALL: [YesNo; 2] = [YesNo::Yes, YesNo::No];

    pub fn label(&self) -> &'static str {
        match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        }
    }
}
