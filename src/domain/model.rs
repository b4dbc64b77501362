use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::{
    validate_birth_date, validate_country_code, validate_email, validate_mobile_phone,
    validate_non_empty_string, validate_postal_code, Validate,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Session material copied from an authenticated Practice Fusion browser session.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub cookies: String,
    pub authorization: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cookies", &"<redacted>")
            .field("authorization", &"<redacted>")
            .finish()
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("cookies", &self.cookies)?;
        validate_non_empty_string("authorization", &self.authorization)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

fn default_country() -> Option<String> {
    Some("USA".to_string())
}

fn default_street_address2() -> Option<String> {
    Some(String::new())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub birth_date: String,
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub mobile_phone: String,
    #[serde(default = "default_country")]
    pub mobile_phone_country: Option<String>,
    pub postal_code: String,
    pub street_address1: String,
    #[serde(default = "default_street_address2")]
    pub street_address2: Option<String>,
}

impl Validate for CreatePatientRequest {
    fn validate(&self) -> Result<()> {
        validate_birth_date("birthDate", &self.birth_date)?;
        validate_email("emailAddress", &self.email_address)?;
        validate_non_empty_string("firstName", &self.first_name)?;
        validate_non_empty_string("lastName", &self.last_name)?;
        validate_mobile_phone("mobilePhone", &self.mobile_phone)?;
        if let Some(country) = &self.mobile_phone_country {
            validate_country_code("mobilePhoneCountry", country)?;
        }
        validate_postal_code("postalCode", &self.postal_code)?;
        validate_non_empty_string("streetAddress1", &self.street_address1)?;
        Ok(())
    }
}

/// One file taken from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DocumentUploadRequest {
    pub files: Vec<UploadFile>,
    pub first_name: String,
    pub last_name: String,
}

impl Validate for DocumentUploadRequest {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("firstName", &self.first_name)?;
        validate_non_empty_string("lastName", &self.last_name)?;
        if self.files.is_empty() {
            return Err(BridgeError::validation(
                "files",
                "At least one file is required",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentType {
    #[serde(rename = "Wellness Exam")]
    WellnessExam,
    #[serde(rename = "Follow-Up Visit")]
    FollowUpVisit,
    #[serde(rename = "Nursing Only")]
    NursingOnly,
    #[serde(rename = "Urgent Visit")]
    UrgentVisit,
    #[serde(rename = "New Patient Visit")]
    NewPatientVisit,
    #[serde(rename = "Video Visit")]
    VideoVisit,
    #[serde(rename = "Procedure")]
    Procedure,
}

impl AppointmentType {
    /// Display name as listed by the scheduler.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WellnessExam => "Wellness Exam",
            Self::FollowUpVisit => "Follow-Up Visit",
            Self::NursingOnly => "Nursing Only",
            Self::UrgentVisit => "Urgent Visit",
            Self::NewPatientVisit => "New Patient Visit",
            Self::VideoVisit => "Video Visit",
            Self::Procedure => "Procedure",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSchedulerParticipant {
    #[serde(default)]
    pub chief_complaint: String,
    pub first_name: String,
    pub last_name: String,
}

fn default_insurance_code() -> Option<String> {
    Some("Unins".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    #[serde(default)]
    pub facility_name: Option<String>,
    pub appointment_type: AppointmentType,
    pub scheduler_event_participants: Vec<PatientSchedulerParticipant>,
    #[serde(default)]
    pub last_modified_by_provider: Option<String>,
    #[serde(with = "flexible_datetime")]
    pub start_at_date_time_utc: DateTime<Utc>,
    #[serde(default, with = "flexible_datetime::option")]
    pub end_at_date_time_utc: Option<DateTime<Utc>>,
    #[serde(default = "default_insurance_code")]
    pub insurance_coverage_type_code: Option<String>,
    #[serde(default, with = "flexible_datetime::option")]
    pub payment_date: Option<DateTime<Utc>>,
}

impl AppointmentRequest {
    pub const DEFAULT_DURATION_MINUTES: i64 = 30;

    /// End time, or half an hour after the start when none was given.
    pub fn end_at(&self) -> DateTime<Utc> {
        self.end_at_date_time_utc.unwrap_or_else(|| {
            self.start_at_date_time_utc + Duration::minutes(Self::DEFAULT_DURATION_MINUTES)
        })
    }

    pub fn patient(&self) -> Result<&PatientSchedulerParticipant> {
        self.scheduler_event_participants.first().ok_or_else(|| {
            BridgeError::validation(
                "schedulerEventParticipants",
                "At least one participant is required",
            )
        })
    }
}

impl Validate for AppointmentRequest {
    fn validate(&self) -> Result<()> {
        let patient = self.patient()?;
        validate_non_empty_string("schedulerEventParticipants[0].firstName", &patient.first_name)?;
        validate_non_empty_string("schedulerEventParticipants[0].lastName", &patient.last_name)?;
        if self.end_at() <= self.start_at_date_time_utc {
            return Err(BridgeError::validation(
                "endAtDateTimeUtc",
                "End time must be after the start time",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAppointmentsRequest {
    #[serde(default)]
    pub facility_name: Option<String>,
    #[serde(with = "flexible_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub end_time: DateTime<Utc>,
}

impl Validate for GetAppointmentsRequest {
    fn validate(&self) -> Result<()> {
        if self.end_time < self.start_time {
            return Err(BridgeError::validation(
                "endTime",
                "End time must not be before the start time",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerEventPurposeType {
    pub scheduler_event_purpose_type_guid: String,
}

fn default_payment_method() -> Option<String> {
    Some("CASH".to_string())
}

fn default_payment_status() -> Option<String> {
    Some("UNKNOWN".to_string())
}

fn default_amount_due_source() -> Option<String> {
    Some("NONE".to_string())
}

fn default_false() -> Option<bool> {
    Some(false)
}

fn default_true() -> Option<bool> {
    Some(true)
}

fn default_empty() -> Option<String> {
    Some(String::new())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointment {
    pub practice_guid: String,
    pub scheduler_event_guid: String,
    pub scheduler_event_purpose_type: SchedulerEventPurposeType,
    pub scheduler_event_participants: Vec<Value>,
    pub last_modified_by_provider_guid: String,
    #[serde(with = "flexible_datetime")]
    pub start_at_date_time_utc: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub end_at_date_time_utc: DateTime<Utc>,
    pub schedule_department_guid: String,
    pub schedule_department_code: String,
    pub schedule_department_name: String,
    #[serde(default = "default_insurance_code")]
    pub insurance_coverage_type_code: Option<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method_code: Option<String>,
    #[serde(default = "default_payment_status")]
    pub payment_status_code: Option<String>,
    #[serde(default = "Utc::now", with = "flexible_datetime")]
    pub payment_date: DateTime<Utc>,
    #[serde(default = "default_amount_due_source")]
    pub amount_due_source_code: Option<String>,
    #[serde(default = "default_false")]
    pub previous_confirmation_state: Option<bool>,
    #[serde(default = "default_false")]
    pub appointment_confirmed: Option<bool>,
    #[serde(default = "default_empty")]
    pub appointment_confirmation_notes: Option<String>,
    #[serde(default)]
    pub intake_form_guids: Vec<String>,
    #[serde(default = "default_true")]
    pub disable_intake_form: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub patient_appointment: PatientAppointment,
}

impl Validate for UpdateAppointmentRequest {
    fn validate(&self) -> Result<()> {
        let appointment = &self.patient_appointment;
        validate_non_empty_string(
            "patientAppointment.schedulerEventGuid",
            &appointment.scheduler_event_guid,
        )?;
        if appointment.end_at_date_time_utc <= appointment.start_at_date_time_utc {
            return Err(BridgeError::validation(
                "patientAppointment.endAtDateTimeUtc",
                "End time must be after the start time",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    pub search_criteria: String,
    pub drug_name_or_ndc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterEventType {
    #[serde(rename = "Office Visit")]
    OfficeVisit,
    #[serde(rename = "Nurse Visit")]
    NurseVisit,
    #[serde(rename = "Telemedicine Visit")]
    TelemedicineVisit,
    #[serde(rename = "Home Visit")]
    HomeVisit,
    #[serde(rename = "Orders Only")]
    OrdersOnly,
    #[serde(rename = "Nursing Home Visit")]
    NursingHomeVisit,
    #[serde(rename = "Email Encounter")]
    EmailEncounter,
    #[serde(rename = "Letter")]
    Letter,
}

impl EncounterEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OfficeVisit => "Office Visit",
            Self::NurseVisit => "Nurse Visit",
            Self::TelemedicineVisit => "Telemedicine Visit",
            Self::HomeVisit => "Home Visit",
            Self::OrdersOnly => "Orders Only",
            Self::NursingHomeVisit => "Nursing Home Visit",
            Self::EmailEncounter => "Email Encounter",
            Self::Letter => "Letter",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientTranscriptRequest {
    pub patient_name_or_participant_guid: String,
    #[serde(default)]
    pub transcript_guid: Option<String>,
    #[serde(default)]
    pub facility_name_or_guid: Option<String>,
    #[serde(default)]
    pub event_display_name: Option<EncounterEventType>,
    #[serde(default)]
    pub health_concern_note: Option<String>,
    #[serde(default)]
    pub chief_complaint: Option<String>,
    #[serde(default)]
    pub subjective_note: Option<String>,
    #[serde(default)]
    pub objective_note: Option<String>,
    #[serde(default)]
    pub assessment_note: Option<String>,
    #[serde(default)]
    pub plan_note: Option<String>,
    #[serde(default)]
    pub care_plan_notes: Option<String>,
    #[serde(default)]
    pub medication: Option<Vec<MedicationRequest>>,
    #[serde(default)]
    pub provider_name_or_guid: Option<String>,
}

impl Validate for PatientTranscriptRequest {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string(
            "patientNameOrParticipantGuid",
            &self.patient_name_or_participant_guid,
        )?;
        for (index, med) in self.medication.iter().flatten().enumerate() {
            validate_non_empty_string(&format!("medication[{}].searchCriteria", index), &med.search_criteria)?;
            validate_non_empty_string(&format!("medication[{}].drugNameOrNdc", index), &med.drug_name_or_ndc)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterSummariesQuery {
    #[serde(default)]
    pub patient_name_or_participant_guid: String,
}

impl Validate for EncounterSummariesQuery {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string(
            "patientNameOrParticipantGuid",
            &self.patient_name_or_participant_guid,
        )
    }
}

/// Standard `{status, message}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: bool,
    pub message: String,
}

/// Timestamps accepted with or without an offset; values without one are taken as UTC.
/// Output is RFC 3339 with a `Z` suffix.
pub mod flexible_datetime {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {}", raw)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&super::format(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {}", raw))),
                None => Ok(None),
            }
        }
    }
}
