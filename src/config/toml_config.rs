use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "https://static.practicefusion.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub defaults: DefaultsConfig,
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Upper bound for request bodies, document uploads included.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            body_limit_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 30,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Fallback identifiers used when a request leaves the provider, facility or
/// encounter type unspecified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub provider_guid: String,
    pub facility_guid: String,
    pub practice_guid: String,
    pub facility_name: String,
    pub encounter_event_type_guid: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            provider_guid: "d744609f-1bab-4e11-89bd-680e8d19a397".to_string(),
            facility_guid: "68cc1f4c-0378-424f-9d12-e3ee0ab9b4be".to_string(),
            practice_guid: "f6f290f1-968a-4900-a7a0-5500ce2a30f7".to_string(),
            facility_name: "SILICON BEACH MEDICAL CENTER".to_string(),
            encounter_event_type_guid: "9381cfbf-373b-418e-812c-e44b97835be4".to_string(),
        }
    }
}

/// Upstream path templates. `{name}` placeholders are filled per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub postal_code: String,
    pub create_patient: String,
    pub search_patient: String,
    pub upload_document: String,
    pub update_document_meta: String,
    pub appointment_types: String,
    pub provider: String,
    pub facility: String,
    pub conflicts: String,
    pub appointment: String,
    pub combined_event: String,
    pub encounter_event_type: String,
    pub create_transcript: String,
    pub transcript_summaries: String,
    pub update_transcript: String,
    pub transcript_events: String,
    pub health_concerns: String,
    pub health_concern: String,
    pub update_care_plan: String,
    pub search_drug: String,
    pub drug_interactions: String,
    pub add_medication: String,
    pub add_transcript_medication: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            postal_code: "/PracticeEndpoint/api/v1/postalCodes/{postalCode}".to_string(),
            create_patient: "/PatientEndpoint/api/v3/patients".to_string(),
            search_patient: "/PatientEndpoint/api/v1/patients/search".to_string(),
            upload_document: "/DocumentEndpoint/api/v1/documents/upload".to_string(),
            update_document_meta: "/DocumentEndpoint/api/v1/documents/metadata".to_string(),
            appointment_types: "/SchedulerEndpoint/api/v1/appointmentTypes".to_string(),
            provider: "/PracticeEndpoint/api/v1/providers".to_string(),
            facility: "/PracticeEndpoint/api/v1/facilities".to_string(),
            conflicts: "/SchedulerEndpoint/api/v1/appointments/conflicts".to_string(),
            appointment: "/SchedulerEndpoint/api/v2/appointments".to_string(),
            combined_event: "/SchedulerEndpoint/api/v1/combinedEvents".to_string(),
            encounter_event_type: "/ChartingEndpoint/api/v1/encounterEventTypes".to_string(),
            create_transcript: "/ChartingEndpoint/api/v1/patients/{participantGuid}/transcripts"
                .to_string(),
            transcript_summaries:
                "/ChartingEndpoint/api/v1/patients/{patientPracticeGuid}/transcriptSummaries"
                    .to_string(),
            update_transcript:
                "/ChartingEndpoint/api/v1/patients/{patientPracticeGuid}/transcripts/{transcriptGuid}"
                    .to_string(),
            transcript_events:
                "/ChartingEndpoint/api/v1/patients/{patientPracticeGuid}/transcripts/{transcriptGuid}/events"
                    .to_string(),
            health_concerns:
                "/ChartingEndpoint/api/v1/patients/{patientPracticeGuid}/healthConcerns".to_string(),
            health_concern:
                "/ChartingEndpoint/api/v1/patients/{patientPracticeGuid}/healthConcern".to_string(),
            update_care_plan:
                "/ChartingEndpoint/api/v1/patients/{patientPracticeGuid}/transcriptEvents/{transcriptEventGuid}"
                    .to_string(),
            search_drug: "/ChartingEndpoint/api/v1/drugs/search/{searchCriteria}".to_string(),
            drug_interactions:
                "/ChartingEndpoint/api/v1/patients/{patientPracticeGuid}/drugInteractions"
                    .to_string(),
            add_medication:
                "/ChartingEndpoint/api/v1/patients/{patientPracticeGuid}/transcripts/{transcriptGuid}/medications"
                    .to_string(),
            add_transcript_medication:
                "/ChartingEndpoint/api/v1/patients/{patientPracticeGuid}/medications/{medicationGuid}/transcriptMedications"
                    .to_string(),
        }
    }
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| BridgeError::config(format!("TOML parsing error: {}", e)))
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| BridgeError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        self.server
            .bind_address
            .parse::<SocketAddr>()
            .map_err(|e| BridgeError::validation("server.bind_address", e.to_string()))?;
        validate_range("server.body_limit_bytes", self.server.body_limit_bytes, 1024, 512 * 1024 * 1024)?;

        validate_url("upstream.base_url", &self.upstream.base_url)?;
        validate_non_empty_string("upstream.user_agent", &self.upstream.user_agent)?;
        validate_range("upstream.timeout_seconds", self.upstream.timeout_seconds, 1, 300)?;
        validate_range("upstream.retry_attempts", self.upstream.retry_attempts, 0, 10)?;

        validate_non_empty_string("defaults.provider_guid", &self.defaults.provider_guid)?;
        validate_non_empty_string("defaults.facility_guid", &self.defaults.facility_guid)?;
        validate_non_empty_string("defaults.practice_guid", &self.defaults.practice_guid)?;
        validate_non_empty_string("defaults.facility_name", &self.defaults.facility_name)?;

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn server(&self) -> &ServerConfig {
        &self.server
    }

    fn upstream(&self) -> &UpstreamConfig {
        &self.upstream
    }

    fn defaults(&self) -> &DefaultsConfig {
        &self.defaults
    }

    fn endpoints(&self) -> &EndpointsConfig {
        &self.endpoints
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
