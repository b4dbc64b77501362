use crate::core::client::Session;
use crate::domain::model::{
    flexible_datetime, AppointmentRequest, GetAppointmentsRequest, UpdateAppointmentRequest,
};
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::Validate;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

const PARTICIPANT_PROVIDER: u8 = 1;
const PARTICIPANT_FACILITY: u8 = 2;
const PARTICIPANT_PATIENT: u8 = 3;

const CONFLICT_MESSAGE: &str =
    "Conflicts exist with the selected time. Please select a different time.";

/// Identifiers an appointment is booked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub appointment_type_guid: String,
    pub patient_guid: String,
    pub provider_guid: String,
    pub facility_guid: String,
    pub practice_guid: String,
}

fn conflict_time(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M").to_string()
}

fn range_time(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub fn build_appointment_payload(
    request: &AppointmentRequest,
    booking: &Booking,
    now: DateTime<Utc>,
) -> Result<Value> {
    let patient = request.patient()?;
    let start = flexible_datetime::format(&request.start_at_date_time_utc);
    let end = flexible_datetime::format(&request.end_at());
    let payment_date = flexible_datetime::format(&request.payment_date.unwrap_or(now));

    Ok(json!({
        "patientAppointment": {
            "practiceGuid": booking.practice_guid,
            "schedulerEventPurposeType": {
                "schedulerEventPurposeTypeGuid": booking.appointment_type_guid,
            },
            "schedulerEventParticipants": [
                {
                    "schedulerEventParticipantTypeId": PARTICIPANT_PATIENT,
                    "participantGuid": booking.patient_guid,
                    "chiefComplaint": patient.chief_complaint,
                },
                {
                    "schedulerEventParticipantTypeId": PARTICIPANT_FACILITY,
                    "participantGuid": booking.facility_guid,
                },
                {
                    "schedulerEventParticipantTypeId": PARTICIPANT_PROVIDER,
                    "participantGuid": booking.provider_guid,
                },
            ],
            "lastModifiedByProviderGuid": booking.provider_guid,
            "startAtDateTimeUtc": start,
            "endAtDateTimeUtc": end,
            "insuranceCoverageTypeCode": request.insurance_coverage_type_code,
            "paymentDate": payment_date,
            "startAtDateTimeFlt": start,
            "endAtDateTimeFlt": end,
            "appointmentConfirmationNotes": "",
            "intakeFormGuids": [],
            "disableIntakeForm": true,
        }
    }))
}

/// Update body: the request as given plus the `...Flt` copies of start and end.
pub fn build_update_payload(request: &UpdateAppointmentRequest) -> Result<Value> {
    let appointment = &request.patient_appointment;
    let mut payload = serde_json::to_value(request)?;
    payload["patientAppointment"]["startAtDateTimeFlt"] =
        json!(flexible_datetime::format(&appointment.start_at_date_time_utc));
    payload["patientAppointment"]["endAtDateTimeFlt"] =
        json!(flexible_datetime::format(&appointment.end_at_date_time_utc));
    Ok(payload)
}

impl Session<'_> {
    pub async fn check_for_conflicts(
        &self,
        provider_guid: &str,
        facility_guid: &str,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<()> {
        tracing::debug!("Checking for conflicts");
        let query = [
            ("providerGuid", provider_guid.to_string()),
            ("facilityGuid", facility_guid.to_string()),
            ("startDateTimeFlt", conflict_time(start_at)),
            ("endDateTimeFlt", conflict_time(end_at)),
        ];
        let data = self
            .get_with_query(&self.endpoints().conflicts, &[], &query)
            .await?;

        if data
            .get("conflictsExist")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            tracing::debug!("Conflicts found");
            return Err(BridgeError::Conflict {
                message: CONFLICT_MESSAGE.to_string(),
            });
        }

        tracing::debug!("No conflicts found");
        Ok(())
    }

    async fn resolve_booking(&self, request: &AppointmentRequest) -> Result<Booking> {
        let appointment_type_guid = self
            .find_appointment_type_guid(request.appointment_type.as_str())
            .await?;

        let patient = request.patient()?;
        let patient_guid = self
            .find_patient_guid(&patient.first_name, &patient.last_name)
            .await?;

        let provider_guid = match request.last_modified_by_provider.as_deref() {
            Some(name) => {
                tracing::debug!("Custom provider given, looking up {}", name);
                self.find_provider_guid(name).await?
            }
            None => self.defaults().provider_guid.clone(),
        };

        let (facility_guid, practice_guid) = match request.facility_name.as_deref() {
            Some(name) => {
                let facility = self.find_facility(name).await?;
                (facility.facility_guid, facility.practice_guid)
            }
            None => (
                self.defaults().facility_guid.clone(),
                self.defaults().practice_guid.clone(),
            ),
        };

        Ok(Booking {
            appointment_type_guid,
            patient_guid,
            provider_guid,
            facility_guid,
            practice_guid,
        })
    }

    pub async fn create_appointment(&self, request: &AppointmentRequest) -> Result<Value> {
        request.validate()?;
        let patient = request.patient()?;
        tracing::debug!(
            "Creating appointment for {} {}",
            patient.first_name,
            patient.last_name
        );

        let booking = self.resolve_booking(request).await?;
        let payload = build_appointment_payload(request, &booking, Utc::now())?;

        self.check_for_conflicts(
            &booking.provider_guid,
            &booking.facility_guid,
            &request.start_at_date_time_utc,
            &request.end_at(),
        )
        .await?;

        let created = self
            .post(&self.endpoints().appointment, &[], &payload)
            .await?;
        tracing::debug!("Appointment created successfully");

        Ok(created)
    }

    pub async fn get_appointments(&self, request: &GetAppointmentsRequest) -> Result<Value> {
        request.validate()?;
        tracing::debug!("Fetching list of appointments");

        let defaults = self.defaults();
        let (facility_name, practice_guid, facility_guid) = match request.facility_name.as_deref() {
            Some(name) => {
                let facility = self.find_facility(name).await?;
                (name.to_string(), facility.practice_guid, facility.facility_guid)
            }
            None => (
                defaults.facility_name.clone(),
                defaults.practice_guid.clone(),
                defaults.facility_guid.clone(),
            ),
        };

        let provider_guids = self.provider_guids().await?;
        tracing::debug!("Collected {} provider GUIDs", provider_guids.len());

        let payload = json!({
            "practiceDetailName": facility_name.to_uppercase(),
            "practiceGuid": practice_guid,
            "providerGuidList": provider_guids,
            "facilityGuid": facility_guid,
            "startMinimumDateTimeUtc": range_time(&request.start_time),
            "startMaximumDateTimeUtc": range_time(&request.end_time),
            "includePinnedPatientNote": true,
        });

        let events = self
            .put(&self.endpoints().combined_event, &[], &payload)
            .await?;
        tracing::debug!("Appointments fetched successfully");

        Ok(events)
    }

    pub async fn update_appointment(&self, request: &UpdateAppointmentRequest) -> Result<Value> {
        request.validate()?;
        let event_guid = &request.patient_appointment.scheduler_event_guid;
        tracing::debug!("Updating appointment {}", event_guid);

        let payload = build_update_payload(request)?;
        let updated = self
            .put_child(&self.endpoints().appointment, &[], event_guid, &payload)
            .await?;
        tracing::debug!("Appointment updated successfully");

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::tests::{test_config, test_credentials};
    use crate::core::client::PracticeFusionClient;
    use chrono::TimeZone;
    use httpmock::prelude::*;

    fn appointment_request(extra: Value) -> AppointmentRequest {
        let mut body = json!({
            "appointmentType": "Follow-Up Visit",
            "schedulerEventParticipants": [
                {"firstName": "Jane", "lastName": "Doe", "chiefComplaint": "Cough"}
            ],
            "startAtDateTimeUtc": "2025-03-01T10:00:00Z"
        });
        if let (Some(target), Some(source)) = (body.as_object_mut(), extra.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(body).unwrap()
    }

    fn booking() -> Booking {
        Booking {
            appointment_type_guid: "type-1".to_string(),
            patient_guid: "pat-1".to_string(),
            provider_guid: "prov-1".to_string(),
            facility_guid: "fac-1".to_string(),
            practice_guid: "prac-1".to_string(),
        }
    }

    #[test]
    fn test_time_formats() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(conflict_time(&t), "2025-03-01T09:05");
        assert_eq!(range_time(&t), "2025-03-01T09:05:07.000000Z");
    }

    #[test]
    fn test_appointment_payload() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let payload = build_appointment_payload(&appointment_request(json!({})), &booking(), now).unwrap();
        let appointment = &payload["patientAppointment"];

        assert_eq!(appointment["practiceGuid"], "prac-1");
        assert_eq!(
            appointment["schedulerEventPurposeType"]["schedulerEventPurposeTypeGuid"],
            "type-1"
        );
        let participants = appointment["schedulerEventParticipants"].as_array().unwrap();
        assert_eq!(participants[0]["schedulerEventParticipantTypeId"], 3);
        assert_eq!(participants[0]["chiefComplaint"], "Cough");
        assert_eq!(participants[1]["participantGuid"], "fac-1");
        assert_eq!(participants[2]["participantGuid"], "prov-1");
        assert_eq!(appointment["endAtDateTimeUtc"], "2025-03-01T10:30:00Z");
        assert_eq!(appointment["endAtDateTimeFlt"], "2025-03-01T10:30:00Z");
        assert_eq!(appointment["paymentDate"], "2025-02-01T00:00:00Z");
        assert_eq!(appointment["insuranceCoverageTypeCode"], "Unins");
    }

    #[tokio::test]
    async fn test_create_appointment_with_defaults() {
        let server = MockServer::start();
        let types = server.mock(|when, then| {
            when.method(GET).path("/SchedulerEndpoint/api/v1/appointmentTypes");
            then.status(200).json_body(json!([
                {"name": "Wellness Exam", "id": "type-wellness"},
                {"name": "Follow-Up Visit", "id": "type-follow"}
            ]));
        });
        let search = server.mock(|when, then| {
            when.method(POST).path("/PatientEndpoint/api/v1/patients/search");
            then.status(200)
                .json_body(json!({"patients": [{"patientPracticeGuid": "pat-1"}]}));
        });
        let providers = server.mock(|when, then| {
            when.method(GET).path("/PracticeEndpoint/api/v1/providers");
            then.status(200).json_body(json!([]));
        });
        let conflicts = server.mock(|when, then| {
            when.method(GET)
                .path("/SchedulerEndpoint/api/v1/appointments/conflicts")
                .query_param("startDateTimeFlt", "2025-03-01T10:00")
                .query_param("endDateTimeFlt", "2025-03-01T10:30")
                .query_param("providerGuid", "d744609f-1bab-4e11-89bd-680e8d19a397");
            then.status(200).json_body(json!({"conflictsExist": false}));
        });
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/SchedulerEndpoint/api/v2/appointments")
                .body_contains("\"schedulerEventPurposeTypeGuid\":\"type-follow\"")
                .body_contains("\"practiceGuid\":\"f6f290f1-968a-4900-a7a0-5500ce2a30f7\"");
            then.status(200).json_body(json!({"schedulerEventGuid": "evt-1"}));
        });

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let created = client
            .session(test_credentials())
            .create_appointment(&appointment_request(json!({})))
            .await
            .unwrap();

        types.assert();
        search.assert();
        providers.assert_hits(0);
        conflicts.assert();
        create.assert();
        assert_eq!(created["schedulerEventGuid"], "evt-1");
    }

    #[tokio::test]
    async fn test_create_appointment_conflict() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/SchedulerEndpoint/api/v1/appointmentTypes");
            then.status(200).json_body(json!([{"name": "Follow-Up Visit", "id": "t"}]));
        });
        server.mock(|when, then| {
            when.method(POST).path("/PatientEndpoint/api/v1/patients/search");
            then.status(200)
                .json_body(json!({"patients": [{"patientPracticeGuid": "pat-1"}]}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/PracticeEndpoint/api/v1/facilities");
            then.status(200).json_body(json!([
                {"name": "Harbor Clinic", "facilityGuid": "fac-9", "practiceGuid": "prac-9"}
            ]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/SchedulerEndpoint/api/v1/appointments/conflicts")
                .query_param("facilityGuid", "fac-9");
            then.status(200).json_body(json!({"conflictsExist": true}));
        });
        let create = server.mock(|when, then| {
            when.method(POST).path("/SchedulerEndpoint/api/v2/appointments");
            then.status(200);
        });

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let err = client
            .session(test_credentials())
            .create_appointment(&appointment_request(json!({"facilityName": "Harbor Clinic"})))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), CONFLICT_MESSAGE);
        create.assert_hits(0);
    }

    #[tokio::test]
    async fn test_create_appointment_unknown_provider() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/SchedulerEndpoint/api/v1/appointmentTypes");
            then.status(200).json_body(json!([{"name": "Follow-Up Visit", "id": "t"}]));
        });
        server.mock(|when, then| {
            when.method(POST).path("/PatientEndpoint/api/v1/patients/search");
            then.status(200)
                .json_body(json!({"patients": [{"patientPracticeGuid": "pat-1"}]}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/PracticeEndpoint/api/v1/providers");
            then.status(200)
                .json_body(json!([{"providerName": "Dr. Who", "providerGuid": "p-1"}]));
        });

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let err = client
            .session(test_credentials())
            .create_appointment(&appointment_request(json!({"lastModifiedByProvider": "Dr. No"})))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Provider not found.");
    }

    #[tokio::test]
    async fn test_get_appointments_payload() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/PracticeEndpoint/api/v1/providers");
            then.status(200).json_body(json!([
                {"providerName": "Dr. A", "providerGuid": "a"},
                {"providerName": "Dr. B", "providerGuid": "b"}
            ]));
        });
        let events = server.mock(|when, then| {
            when.method(PUT)
                .path("/SchedulerEndpoint/api/v1/combinedEvents")
                .json_body(json!({
                    "practiceDetailName": "SILICON BEACH MEDICAL CENTER",
                    "practiceGuid": "f6f290f1-968a-4900-a7a0-5500ce2a30f7",
                    "providerGuidList": ["a", "b"],
                    "facilityGuid": "68cc1f4c-0378-424f-9d12-e3ee0ab9b4be",
                    "startMinimumDateTimeUtc": "2025-03-01T00:00:00.000000Z",
                    "startMaximumDateTimeUtc": "2025-03-02T00:00:00.000000Z",
                    "includePinnedPatientNote": true
                }));
            then.status(200).json_body(json!({"events": [{"id": 1}]}));
        });

        let request: GetAppointmentsRequest = serde_json::from_value(json!({
            "startTime": "2025-03-01T00:00:00Z",
            "endTime": "2025-03-02T00:00:00Z"
        }))
        .unwrap();

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let result = client
            .session(test_credentials())
            .get_appointments(&request)
            .await
            .unwrap();

        events.assert();
        assert_eq!(result["events"][0]["id"], 1);
    }

    #[tokio::test]
    async fn test_create_appointment_unknown_type() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/SchedulerEndpoint/api/v1/appointmentTypes");
            then.status(200).json_body(json!([{"name": "Wellness Exam", "id": "w"}]));
        });
        let search = server.mock(|when, then| {
            when.method(POST).path("/PatientEndpoint/api/v1/patients/search");
            then.status(200)
                .json_body(json!({"patients": [{"patientPracticeGuid": "pat-1"}]}));
        });

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let err = client
            .session(test_credentials())
            .create_appointment(&appointment_request(json!({})))
            .await
            .unwrap_err();

        search.assert_hits(0);
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Appointment type not found.");
    }

    #[tokio::test]
    async fn test_create_appointment_unknown_facility() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/SchedulerEndpoint/api/v1/appointmentTypes");
            then.status(200).json_body(json!([{"name": "Follow-Up Visit", "id": "t"}]));
        });
        server.mock(|when, then| {
            when.method(POST).path("/PatientEndpoint/api/v1/patients/search");
            then.status(200)
                .json_body(json!({"patients": [{"patientPracticeGuid": "pat-1"}]}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/PracticeEndpoint/api/v1/facilities");
            then.status(200).json_body(json!([
                {"name": "Harbor Clinic", "facilityGuid": "fac-9", "practiceGuid": "prac-9"}
            ]));
        });
        let conflicts = server.mock(|when, then| {
            when.method(GET).path("/SchedulerEndpoint/api/v1/appointments/conflicts");
            then.status(200).json_body(json!({"conflictsExist": false}));
        });

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let err = client
            .session(test_credentials())
            .create_appointment(&appointment_request(json!({"facilityName": "Lighthouse Clinic"})))
            .await
            .unwrap_err();

        conflicts.assert_hits(0);
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Facility not found.");
    }

    #[tokio::test]
    async fn test_get_appointments_for_named_facility() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/PracticeEndpoint/api/v1/facilities");
            then.status(200).json_body(json!([
                {"name": "Harbor Clinic", "facilityGuid": "fac-9", "practiceGuid": "prac-9"}
            ]));
        });
        server.mock(|when, then| {
            when.method(GET).path("/PracticeEndpoint/api/v1/providers");
            then.status(200)
                .json_body(json!([{"providerName": "Dr. A", "providerGuid": "a"}]));
        });
        let events = server.mock(|when, then| {
            when.method(PUT)
                .path("/SchedulerEndpoint/api/v1/combinedEvents")
                .json_body(json!({
                    "practiceDetailName": "HARBOR CLINIC",
                    "practiceGuid": "prac-9",
                    "providerGuidList": ["a"],
                    "facilityGuid": "fac-9",
                    "startMinimumDateTimeUtc": "2025-03-01T00:00:00.000000Z",
                    "startMaximumDateTimeUtc": "2025-03-02T00:00:00.000000Z",
                    "includePinnedPatientNote": true
                }));
            then.status(200).json_body(json!({"events": []}));
        });

        let request: GetAppointmentsRequest = serde_json::from_value(json!({
            "facilityName": "Harbor Clinic",
            "startTime": "2025-03-01T00:00:00Z",
            "endTime": "2025-03-02T00:00:00Z"
        }))
        .unwrap();

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        client
            .session(test_credentials())
            .get_appointments(&request)
            .await
            .unwrap();

        events.assert();
    }

    #[tokio::test]
    async fn test_get_appointments_unknown_facility() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/PracticeEndpoint/api/v1/facilities");
            then.status(200).json_body(json!([]));
        });
        let events = server.mock(|when, then| {
            when.method(PUT).path("/SchedulerEndpoint/api/v1/combinedEvents");
            then.status(200);
        });

        let request: GetAppointmentsRequest = serde_json::from_value(json!({
            "facilityName": "Lighthouse Clinic",
            "startTime": "2025-03-01T00:00:00Z",
            "endTime": "2025-03-02T00:00:00Z"
        }))
        .unwrap();

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let err = client
            .session(test_credentials())
            .get_appointments(&request)
            .await
            .unwrap_err();

        events.assert_hits(0);
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Facility not found.");
    }

    #[tokio::test]
    async fn test_get_appointments_rejects_reversed_range() {
        let server = MockServer::start();
        let any = server.mock(|when, then| {
            when.any_request();
            then.status(200);
        });

        let request: GetAppointmentsRequest = serde_json::from_value(json!({
            "startTime": "2025-03-02T00:00:00Z",
            "endTime": "2025-03-01T00:00:00Z"
        }))
        .unwrap();

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let err = client
            .session(test_credentials())
            .get_appointments(&request)
            .await
            .unwrap_err();

        any.assert_hits(0);
        assert_eq!(err.status_code(), 422);
        assert!(matches!(err, BridgeError::Validation { ref field, .. } if field == "endTime"));
    }

    fn update_body(payment_date: Option<&str>) -> Value {
        let mut body = json!({
            "patientAppointment": {
                "practiceGuid": "prac-1",
                "schedulerEventGuid": "evt-42",
                "schedulerEventPurposeType": {"schedulerEventPurposeTypeGuid": "type-1"},
                "schedulerEventParticipants": [{"participantGuid": "pat-1"}],
                "lastModifiedByProviderGuid": "prov-1",
                "startAtDateTimeUtc": "2025-03-01T10:00:00Z",
                "endAtDateTimeUtc": "2025-03-01T10:30:00Z",
                "scheduleDepartmentGuid": "dep-1",
                "scheduleDepartmentCode": "GEN",
                "scheduleDepartmentName": "General"
            }
        });
        if let Some(date) = payment_date {
            body["patientAppointment"]["paymentDate"] = json!(date);
        }
        body
    }

    fn parse_update(body: &Value) -> UpdateAppointmentRequest {
        serde_json::from_value(body.clone()).unwrap()
    }

    #[test]
    fn test_update_payload_repeats_for_same_body() {
        let dated = update_body(Some("2025-02-01T00:00:00Z"));
        let first = build_update_payload(&parse_update(&dated)).unwrap();
        let second = build_update_payload(&parse_update(&dated)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first["patientAppointment"]["endAtDateTimeFlt"], "2025-03-01T10:30:00Z");

        // Without a payment date each parse stamps its own time; nothing else differs.
        let undated = update_body(None);
        let mut first = build_update_payload(&parse_update(&undated)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let mut second = build_update_payload(&parse_update(&undated)).unwrap();
        assert_ne!(
            first["patientAppointment"]["paymentDate"],
            second["patientAppointment"]["paymentDate"]
        );
        for payload in [&mut first, &mut second] {
            if let Some(appointment) = payload["patientAppointment"].as_object_mut() {
                appointment.remove("paymentDate");
            }
        }
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_update_appointment_puts_to_event() {
        let server = MockServer::start();
        let update = server.mock(|when, then| {
            when.method(PUT)
                .path("/SchedulerEndpoint/api/v2/appointments/evt-42")
                .body_contains("\"startAtDateTimeFlt\":\"2025-03-01T10:00:00Z\"")
                .body_contains("\"paymentMethodCode\":\"CASH\"");
            then.status(200).json_body(json!({"updated": true}));
        });

        let request: UpdateAppointmentRequest =
            serde_json::from_value(update_body(Some("2025-02-01T00:00:00Z"))).unwrap();

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let result = client
            .session(test_credentials())
            .update_appointment(&request)
            .await
            .unwrap();

        update.assert();
        assert_eq!(result["updated"], true);
    }
}
