//! Name-to-GUID resolution against Practice Fusion's directory listings.

use crate::core::client::Session;
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::is_guid;
use serde::Deserialize;
use serde_json::{json, Value};

/// A resolved facility; both GUIDs are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facility {
    pub name: String,
    pub facility_guid: String,
    pub practice_guid: String,
}

/// Facility list entry as listed upstream. Inactive entries may lack GUIDs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub facility_guid: Option<String>,
    #[serde(default)]
    pub practice_guid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub provider_guid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentTypeEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientMatch {
    patient_practice_guid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PatientSearchResponse {
    #[serde(default)]
    patients: Vec<PatientMatch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncounterEventType {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    event_type_guid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EncounterEventTypes {
    #[serde(default)]
    events: Vec<EncounterEventType>,
}

/// A listing entry matched by name but missing a field the workflow needs.
fn incomplete_entry(listing: &str, name: &str, field: &str) -> BridgeError {
    BridgeError::UpstreamUnexpected {
        status: 200,
        message: format!("{} entry '{}' has no {}", listing, name, field),
        code: "invalid_response".to_string(),
    }
}

/// First and last word of a free-text patient name.
pub fn split_patient_name(name: &str) -> Result<(&str, &str)> {
    let mut words = name.split_whitespace();
    let first = words.next().ok_or_else(|| {
        BridgeError::validation("patientNameOrParticipantGuid", "Patient name cannot be empty")
    })?;
    let last = words.last().unwrap_or(first);
    Ok((first, last))
}

impl Session<'_> {
    /// GUID of the first patient matching both names exactly.
    pub async fn find_patient_guid(&self, first_name: &str, last_name: &str) -> Result<String> {
        tracing::debug!("Searching for patient {} {}", first_name, last_name);
        let payload = json!({
            "matchAll": true,
            "firstName": first_name,
            "lastName": last_name,
        });
        let response = self.post(&self.endpoints().search_patient, &[], &payload).await?;
        let search: PatientSearchResponse = serde_json::from_value(response)?;

        search
            .patients
            .into_iter()
            .next()
            .map(|patient| patient.patient_practice_guid)
            .ok_or_else(|| BridgeError::not_found("Patient not found."))
    }

    /// Accepts either a patient GUID or a "First [Middle] Last" name.
    pub async fn resolve_patient(&self, name_or_guid: &str) -> Result<String> {
        let value = name_or_guid.trim();
        if is_guid(value) {
            return Ok(value.to_string());
        }
        let (first, last) = split_patient_name(value)?;
        self.find_patient_guid(first, last).await
    }

    pub async fn facilities(&self) -> Result<Vec<FacilityEntry>> {
        let response = self.get(&self.endpoints().facility, &[]).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn find_facility(&self, name: &str) -> Result<Facility> {
        tracing::debug!("Fetching facility list");
        let entry = self
            .facilities()
            .await?
            .into_iter()
            .find(|facility| facility.name.as_deref() == Some(name))
            .ok_or_else(|| {
                tracing::debug!("Facility '{}' not found", name);
                BridgeError::not_found("Facility not found.")
            })?;

        Ok(Facility {
            name: name.to_string(),
            facility_guid: entry
                .facility_guid
                .ok_or_else(|| incomplete_entry("Facility", name, "facilityGuid"))?,
            practice_guid: entry
                .practice_guid
                .ok_or_else(|| incomplete_entry("Facility", name, "practiceGuid"))?,
        })
    }

    /// Configured facility when `name_or_guid` is absent, otherwise the GUID as
    /// given or the named facility's GUID.
    pub async fn resolve_facility_guid(&self, name_or_guid: Option<&str>) -> Result<String> {
        match name_or_guid {
            None => Ok(self.defaults().facility_guid.clone()),
            Some(value) if is_guid(value) => Ok(value.to_string()),
            Some(name) => Ok(self.find_facility(name).await?.facility_guid),
        }
    }

    pub async fn providers(&self) -> Result<Vec<Provider>> {
        let response = self.get(&self.endpoints().provider, &[]).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn find_provider_guid(&self, name: &str) -> Result<String> {
        self.providers()
            .await?
            .into_iter()
            .find(|provider| provider.provider_name.as_deref() == Some(name))
            .and_then(|provider| provider.provider_guid)
            .ok_or_else(|| {
                tracing::debug!("Provider '{}' not found", name);
                BridgeError::not_found("Provider not found.")
            })
    }

    pub async fn provider_guids(&self) -> Result<Vec<String>> {
        Ok(self
            .providers()
            .await?
            .into_iter()
            .filter_map(|provider| provider.provider_guid)
            .filter(|guid| !guid.is_empty())
            .collect())
    }

    pub async fn find_appointment_type_guid(&self, name: &str) -> Result<String> {
        tracing::debug!("Fetching available appointment types");
        let response = self.get(&self.endpoints().appointment_types, &[]).await?;
        let types: Vec<AppointmentTypeEntry> = serde_json::from_value(response)?;

        let entry = types
            .into_iter()
            .find(|entry| entry.name.as_deref() == Some(name))
            .ok_or_else(|| {
                tracing::debug!("Appointment type {} not found", name);
                BridgeError::not_found("Appointment type not found.")
            })?;

        entry
            .id
            .ok_or_else(|| incomplete_entry("Appointment type", name, "id"))
    }

    /// Encounter type GUID for a display name; unknown or missing names fall
    /// back to the configured default.
    pub async fn encounter_type_guid(&self, display_name: Option<&str>) -> Result<String> {
        let default = self.defaults().encounter_event_type_guid.clone();
        let Some(display_name) = display_name else {
            return Ok(default);
        };

        tracing::debug!("Fetching encounter event types");
        let response = self.get(&self.endpoints().encounter_event_type, &[]).await?;
        let types: EncounterEventTypes = match response {
            Value::Null => EncounterEventTypes::default(),
            other => serde_json::from_value(other)?,
        };

        match types
            .events
            .into_iter()
            .find(|event| event.display_name.as_deref() == Some(display_name))
        {
            Some(event) => event.event_type_guid.ok_or_else(|| {
                incomplete_entry("Encounter event type", display_name, "eventTypeGuid")
            }),
            None => Ok(default),
        }
    }
}
