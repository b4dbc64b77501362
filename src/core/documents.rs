use crate::core::client::Session;
use crate::domain::model::{DocumentUploadRequest, UploadFile};
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::Validate;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Map, Value};

/// Fields carried from the upload answer into the metadata update.
const METADATA_FIELDS: [&str; 14] = [
    "documentGuid",
    "binaryStorageGuid",
    "documentDateTimeUtc",
    "documentName",
    "documentStatus",
    "documentTypeId",
    "documentTypeName",
    "fileSize",
    "isDocumentTypeActive",
    "isDocumentUnrecoverable",
    "isReadyForDownload",
    "isSigned",
    "mimeType",
    "originalFileExtension",
];

fn invalid_upload_response(message: String) -> BridgeError {
    BridgeError::UpstreamUnexpected {
        status: 200,
        message,
        code: "invalid_response".to_string(),
    }
}

/// Unparseable content types are sent as `application/octet-stream`.
fn document_part(file: &UploadFile) -> Result<Part> {
    let part = || Part::bytes(file.data.clone()).file_name(file.filename.clone());
    part()
        .mime_str(&file.content_type)
        .or_else(|_| part().mime_str("application/octet-stream"))
        .map_err(BridgeError::from)
}

/// Metadata update linking an uploaded document to the patient chart.
pub fn build_metadata_payload(upload: &Value, patient_guid: &str) -> Result<Value> {
    let mut payload = Map::new();
    for field in METADATA_FIELDS {
        let value = upload.get(field).ok_or_else(|| {
            invalid_upload_response(format!("Upload response is missing '{}'", field))
        })?;
        payload.insert(field.to_string(), value.clone());
    }
    payload.insert("comments".to_string(), Value::Null);
    payload.insert("patientPracticeGuid".to_string(), json!(patient_guid));
    payload.insert("transcriptGuids".to_string(), json!([]));

    Ok(Value::Object(payload))
}

impl Session<'_> {
    pub async fn upload_documents(&self, request: &DocumentUploadRequest) -> Result<Value> {
        request.validate()?;
        tracing::debug!("Uploading {} file(s)", request.files.len());

        let patient_guid = self
            .find_patient_guid(&request.first_name, &request.last_name)
            .await?;
        tracing::debug!("Patient found, uploading documents");

        let mut uploaded = Vec::with_capacity(request.files.len());
        for file in &request.files {
            tracing::debug!("Uploading {} ({} bytes)", file.filename, file.data.len());
            let form = Form::new().part("documents", document_part(file)?);
            let response = self
                .post_multipart(&self.endpoints().upload_document, &[], form)
                .await?;

            let upload = response.get(0).ok_or_else(|| {
                invalid_upload_response(format!(
                    "Upload of {} returned no document",
                    file.filename
                ))
            })?;

            let metadata = build_metadata_payload(upload, &patient_guid)?;
            let updated = self
                .put(&self.endpoints().update_document_meta, &[], &metadata)
                .await?;
            uploaded.push(updated);
        }

        tracing::debug!("File(s) uploaded successfully");
        Ok(json!({ "uploaded_files": uploaded }))
    }
}
