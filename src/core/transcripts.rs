//! Encounter transcripts: summaries and SOAP note authoring.

use crate::core::client::Session;
use crate::domain::model::{
    flexible_datetime, EncounterSummariesQuery, MedicationRequest, PatientTranscriptRequest,
    StatusResponse,
};
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::{is_guid, Validate};
use chrono::Utc;
use serde_json::{json, Value};

const CARE_PLAN_EVENT: &str = "Care plan";
const ALERT_KEYS: [&str; 3] = ["drugInteractionAlerts", "drugAllergyAlerts", "drugAlertErrors"];

/// Wraps free text in the chart's rich-text markup.
pub fn rich_text(text: &str) -> String {
    format!("<div class=\"pf-rich-text\"><p>{}</p></div>", text)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

/// Transcript fields patched one at a time, in chart order. Absent notes are skipped.
pub fn transcript_fields(request: &PatientTranscriptRequest) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if let Some(text) = non_empty(&request.chief_complaint) {
        fields.push(("chiefComplaintNote", text.to_string()));
    }
    let rich = [
        ("subjectiveNote", &request.subjective_note),
        ("objectiveNote", &request.objective_note),
        ("assessmentNote", &request.assessment_note),
        ("planNote", &request.plan_note),
    ];
    for (field, value) in rich {
        if let Some(text) = non_empty(value) {
            fields.push((field, rich_text(text)));
        }
    }
    fields
}

fn has_entries(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}

fn missing_field(what: &str) -> BridgeError {
    BridgeError::UpstreamUnexpected {
        status: 200,
        message: format!("Upstream response is missing '{}'", what),
        code: "invalid_response".to_string(),
    }
}

fn str_field<'v>(value: &'v Value, pointer: &str) -> Result<&'v str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| missing_field(pointer.trim_start_matches('/')))
}

/// First search hit whose name matches case-insensitively or whose NDC matches exactly.
pub fn match_drug<'v>(candidates: &'v Value, drug_name_or_ndc: &str) -> Option<&'v Value> {
    let wanted = drug_name_or_ndc.to_lowercase();
    candidates.as_array()?.iter().find(|drug| {
        let by_name = drug
            .get("drugName")
            .and_then(Value::as_str)
            .is_some_and(|name| name.to_lowercase() == wanted);
        let by_ndc = drug.get("ndc").and_then(Value::as_str) == Some(drug_name_or_ndc);
        by_name || by_ndc
    })
}

pub fn build_medication_payload(
    drug: &Value,
    patient_guid: &str,
    transcript_guid: &str,
    provider_guid: &str,
) -> Value {
    let copy = |key: &str| drug.get(key).cloned().unwrap_or(Value::Null);
    json!({
        "controlledSubstanceSchedule": null,
        "createdByProviderGuid": null,
        "createdDateTimeUtc": null,
        "diagnosisGuid": null,
        "doseForm": copy("doseForm"),
        "drugName": copy("drugName"),
        "genericName": copy("genericName"),
        "isCompoundMedication": false,
        "isGeneric": copy("isGeneric"),
        "isMedicalSupply": copy("isMedicalSupply"),
        "isPending": false,
        "lastModifiedProviderGuid": null,
        "lastModifiedDateTimeUtc": null,
        "medicationComment": null,
        "medicationDiscontinuedReason": null,
        "medicationGuid": null,
        "ndc": copy("ndc"),
        "patientPracticeGuid": patient_guid,
        "productStrength": copy("productStrength"),
        "providerGuid": provider_guid,
        "route": copy("route"),
        "rxNormCui": copy("rxNormCui"),
        "sig": {"patientDescription": null, "professionalDescription": null},
        "source": null,
        "startDateTime": null,
        "stopDateTime": null,
        "tradeDisplayName": null,
        "tradeName": copy("tradeName"),
        "transcriptGuid": transcript_guid,
        "userGuid": null,
        "intent": null,
    })
}

impl Session<'_> {
    pub async fn encounter_summaries(&self, query: &EncounterSummariesQuery) -> Result<Value> {
        query.validate()?;
        tracing::debug!(
            "Fetching transcript summaries for {}",
            query.patient_name_or_participant_guid
        );

        let patient_guid = self
            .resolve_patient(&query.patient_name_or_participant_guid)
            .await?;
        let summaries = self
            .get(
                &self.endpoints().transcript_summaries,
                &[("patientPracticeGuid", patient_guid.as_str())],
            )
            .await?;
        tracing::debug!("Transcript summaries fetched");

        Ok(summaries)
    }

    async fn create_transcript(
        &self,
        request: &PatientTranscriptRequest,
        patient_guid: &str,
        facility_guid: &str,
    ) -> Result<String> {
        tracing::debug!("Creating new transcript");
        let encounter_guid = self
            .encounter_type_guid(request.event_display_name.map(|kind| kind.as_str()))
            .await?;

        let payload = json!({
            "encounterTypeEncounterEventTypeGuid": encounter_guid,
            "facilityGuid": facility_guid,
            "dateOfServiceLocal": flexible_datetime::format(&Utc::now()),
        });
        let created = self
            .post(
                &self.endpoints().create_transcript,
                &[("participantGuid", patient_guid)],
                &payload,
            )
            .await?;

        Ok(str_field(&created, "/transcript/transcriptGuid")?.to_string())
    }

    /// Updates the patient's first health concern, or creates one when none exist.
    pub async fn upsert_health_concern(&self, patient_guid: &str, note: &str) -> Result<()> {
        let params = [("patientPracticeGuid", patient_guid)];
        let existing = self.get(&self.endpoints().health_concerns, &params).await?;

        let mut payload = json!({
            "patientPracticeGuid": patient_guid,
            "healthConcernType": "Note",
            "healthConcernNote": note,
        });

        let concern_guid = existing
            .pointer("/patientHealthConcerns/0/patientHealthConcernGuid")
            .and_then(Value::as_str);

        match concern_guid {
            Some(guid) => {
                tracing::debug!("Updating existing health concern {}", guid);
                payload["patientHealthConcernGuid"] = json!(guid);
                self.put_child(&self.endpoints().health_concern, &params, guid, &payload)
                    .await?;
            }
            None => {
                tracing::debug!("Adding first health concern");
                self.post(&self.endpoints().health_concern, &params, &payload)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn update_care_plan(
        &self,
        patient_guid: &str,
        transcript_guid: &str,
        notes: &str,
    ) -> Result<()> {
        tracing::debug!("Fetching transcript events");
        let events = self
            .get(
                &self.endpoints().transcript_events,
                &[
                    ("patientPracticeGuid", patient_guid),
                    ("transcriptGuid", transcript_guid),
                ],
            )
            .await?;

        let care_plan = events
            .get("transcriptEvents")
            .and_then(Value::as_array)
            .and_then(|events| {
                events.iter().find(|event| {
                    event.pointer("/eventType/displayName").and_then(Value::as_str)
                        == Some(CARE_PLAN_EVENT)
                })
            })
            .ok_or_else(|| BridgeError::not_found("Care plan event not found."))?;

        let event_guid = str_field(care_plan, "/transcriptEventGuid")?;
        let mut event_type = care_plan.get("eventType").cloned().unwrap_or(Value::Null);
        event_type["worksheetGuid"] = Value::Null;

        let payload = json!({
            "causedByGuid": null,
            "comments": rich_text(notes),
            "dueDate": null,
            "endDateTimeUtc": null,
            "eventType": event_type,
            "isNegated": care_plan.get("isNegated").cloned().unwrap_or(json!(false)),
            "lastModifiedAt": flexible_datetime::format(&Utc::now()),
            "resultValue": null,
            "startDateTimeUtc": null,
            "status": "Documented",
            "transcriptEventGuid": event_guid,
            "transcriptGuid": transcript_guid,
        });

        tracing::debug!("Updating care plan notes");
        self.put(
            &self.endpoints().update_care_plan,
            &[
                ("patientPracticeGuid", patient_guid),
                ("transcriptEventGuid", event_guid),
            ],
            &payload,
        )
        .await?;
        Ok(())
    }

    async fn medication_provider_guid(&self, name_or_guid: Option<&str>) -> Result<String> {
        match name_or_guid {
            None => Ok(self.defaults().provider_guid.clone()),
            Some(value) if is_guid(value) => Ok(value.to_string()),
            Some(name) => self
                .find_provider_guid(name)
                .await
                .map_err(|err| match err {
                    BridgeError::NotFound { .. } => {
                        BridgeError::not_found(format!("Provider {} not found.", name))
                    }
                    other => other,
                }),
        }
    }

    async fn add_medication(
        &self,
        medication: &MedicationRequest,
        patient_guid: &str,
        transcript_guid: &str,
        provider_guid: &str,
    ) -> Result<()> {
        tracing::debug!("Adding medication '{}'", medication.drug_name_or_ndc);
        let candidates = self
            .get(
                &self.endpoints().search_drug,
                &[("searchCriteria", medication.search_criteria.as_str())],
            )
            .await?;

        let drug = match_drug(&candidates, &medication.drug_name_or_ndc).ok_or_else(|| {
            BridgeError::not_found(format!(
                "No matching drug found for {}",
                medication.search_criteria
            ))
        })?;
        let drug_name = drug.get("drugName").and_then(Value::as_str).unwrap_or_default();

        let mut interaction_input = drug.clone();
        interaction_input["patientPracticeGuid"] = json!(patient_guid);
        let patient_params = [("patientPracticeGuid", patient_guid)];
        let interactions = self
            .post(
                &self.endpoints().drug_interactions,
                &patient_params,
                &json!({ "drugInputs": [interaction_input] }),
            )
            .await?;

        if ALERT_KEYS
            .iter()
            .any(|key| has_entries(interactions.get(*key)))
        {
            tracing::warn!("Drug alerts raised for {}", drug_name);
            let alerts: serde_json::Map<String, Value> = ALERT_KEYS
                .iter()
                .map(|key| {
                    (
                        key.to_string(),
                        interactions.get(*key).cloned().unwrap_or(Value::Null),
                    )
                })
                .collect();
            return Err(BridgeError::Rejected {
                message: format!(
                    "Potential drug interactions or allergies detected between patient and drug:{}.",
                    drug_name
                ),
                detail: Value::Object(alerts),
            });
        }

        let payload = build_medication_payload(drug, patient_guid, transcript_guid, provider_guid);
        let added = self
            .post(
                &self.endpoints().add_medication,
                &[
                    ("patientPracticeGuid", patient_guid),
                    ("transcriptGuid", transcript_guid),
                ],
                &payload,
            )
            .await?;
        let medication_guid = str_field(&added, "/medicationGuid")?;

        self.post(
            &self.endpoints().add_transcript_medication,
            &[
                ("patientPracticeGuid", patient_guid),
                ("medicationGuid", medication_guid),
            ],
            &json!({
                "comment": null,
                "lastModifiedProviderGuid": null,
                "transcriptGuid": transcript_guid,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn add_or_edit_soap_notes(
        &self,
        request: &PatientTranscriptRequest,
    ) -> Result<StatusResponse> {
        request.validate()?;
        let existing = non_empty(&request.transcript_guid).map(str::to_string);
        match &existing {
            Some(guid) => tracing::debug!("Updating transcript {}", guid),
            None => tracing::debug!("Creating new SOAP notes"),
        }

        let patient_guid = self
            .resolve_patient(&request.patient_name_or_participant_guid)
            .await?;
        let facility_guid = self
            .resolve_facility_guid(request.facility_name_or_guid.as_deref())
            .await?;

        let transcript_guid = match &existing {
            Some(guid) => guid.clone(),
            None => {
                self.create_transcript(request, &patient_guid, &facility_guid)
                    .await?
            }
        };

        if let Some(note) = non_empty(&request.health_concern_note) {
            self.upsert_health_concern(&patient_guid, note).await?;
        }

        let transcript_params = [
            ("patientPracticeGuid", patient_guid.as_str()),
            ("transcriptGuid", transcript_guid.as_str()),
        ];
        for (field, value) in transcript_fields(request) {
            tracing::debug!("Updating {}", field);
            self.patch(
                &self.endpoints().update_transcript,
                &transcript_params,
                &json!({ field: value }),
            )
            .await?;
        }

        if let Some(notes) = non_empty(&request.care_plan_notes) {
            self.update_care_plan(&patient_guid, &transcript_guid, notes)
                .await?;
        }

        let medications = request.medication.as_deref().unwrap_or_default();
        if !medications.is_empty() {
            let provider_guid = self
                .medication_provider_guid(request.provider_name_or_guid.as_deref())
                .await?;
            for medication in medications {
                self.add_medication(medication, &patient_guid, &transcript_guid, &provider_guid)
                    .await?;
            }
        }

        let verb = if existing.is_some() { "updated" } else { "created" };
        tracing::debug!("Transcript {} {}", transcript_guid, verb);

        Ok(StatusResponse {
            status: true,
            message: format!(
                "Encounter transcript with id: {} {} successfully",
                transcript_guid, verb
            ),
        })
    }
}
