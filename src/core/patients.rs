use crate::core::client::Session;
use crate::domain::model::{CreatePatientRequest, Gender};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use serde_json::{json, Value};

/// "Provider did not ask" options for ethnicity and race.
const ETHNICITY_NOT_ASKED_GUID: &str = "0a306a4e-6217-4a50-a47f-888c53c9b193";
const RACE_NOT_ASKED_GUID: &str = "f051a797-87bf-468f-99e3-217f2b5eb6dc";

fn gender_label(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "Male",
        Gender::Female => "Female",
        Gender::Unknown => "Unknown",
    }
}

fn empty_address() -> Value {
    json!({
        "city": "",
        "country": "",
        "moveInDate": "",
        "moveOutDate": "",
        "notes": "",
        "postalCode": "",
        "state": "",
        "streetAddress1": "",
        "streetAddress2": "",
    })
}

fn not_asked_option(kind: &str, guid: &str) -> Value {
    json!({
        "displayOrder": 1,
        "hierarchicalCode": "PF1",
        "hierarchicalRootParent": "",
        "isDefault": true,
        "isExcluded": false,
        "isExclusive": true,
        "name": "Provider did not ask",
        "type": kind,
        "optionGuid": guid,
    })
}

/// Full patient document as the patient chart expects it. `postal` is the
/// postal-code lookup result supplying city and state.
pub fn build_patient_payload(request: &CreatePatientRequest, postal: &Value) -> Value {
    let mut primary_address = empty_address();
    primary_address["city"] = postal.get("city").cloned().unwrap_or(Value::Null);
    primary_address["state"] = postal.get("stateProvince").cloned().unwrap_or(Value::Null);
    primary_address["postalCode"] = json!(request.postal_code);
    primary_address["streetAddress1"] = json!(request.street_address1);
    primary_address["streetAddress2"] = json!(request.street_address2);

    json!({
        "patient": {
            "birthDate": request.birth_date,
            "emailAddress": request.email_address,
            "firstName": request.first_name,
            "gender": gender_label(request.gender),
            "isActive": true,
            "isUserOfEmail": true,
            "isUserOfMobilePhone": true,
            "mobilePhone": request.mobile_phone,
            "mobilePhoneCountry": request.mobile_phone_country,
            "lastName": request.last_name,
            "preferredMethodOfCommunicationOption": "1",
            "primaryAddress": primary_address,
            "previousAddress": empty_address(),
            "ethnicities": [ETHNICITY_NOT_ASKED_GUID],
            "races": [RACE_NOT_ASKED_GUID],
            "raceOptions": [],
            "birthSequence": 1,
            "isMultipleBirth": false,
        },
        "patientPreferences": {
            "medicationHistoryConsentPreference": "2",
            "preferredPharmacy": null,
        },
        "patientContacts": [],
        "patientSocialHistory": {
            "raceEthnicity": [
                not_asked_option("Ethnicity", ETHNICITY_NOT_ASKED_GUID),
                not_asked_option("Race", RACE_NOT_ASKED_GUID),
            ]
        },
        "generateNewPatientRecordNumber": true,
    })
}

impl Session<'_> {
    pub async fn create_patient(&self, request: &CreatePatientRequest) -> Result<Value> {
        request.validate()?;
        tracing::debug!("Creating patient commenced");

        tracing::debug!("Verifying postal code {}", request.postal_code);
        let postal = self
            .get(
                &self.endpoints().postal_code,
                &[("postalCode", request.postal_code.as_str())],
            )
            .await?;

        let payload = build_patient_payload(request, &postal);

        tracing::debug!("Submitting create patient request");
        let created = self
            .put_once(&self.endpoints().create_patient, &[], &payload)
            .await?;
        tracing::debug!("Patient {} created successfully", request.first_name);

        Ok(created)
    }
}
