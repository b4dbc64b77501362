//! REST surface over the Practice Fusion workflows.

use crate::core::client::{PracticeFusionClient, Session};
use crate::core::credentials::{add_credentials, require_credentials, InMemoryCredentialStore};
use crate::domain::model::{
    AppointmentRequest, CreatePatientRequest, Credentials, DocumentUploadRequest,
    EncounterSummariesQuery, GetAppointmentsRequest, PatientTranscriptRequest, StatusResponse,
    UpdateAppointmentRequest, UploadFile,
};
use crate::domain::ports::{ConfigProvider, CredentialStore};
use crate::utils::error::{BridgeError, Result};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<PracticeFusionClient>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl AppState {
    pub fn new(client: PracticeFusionClient) -> Self {
        Self {
            client: Arc::new(client),
            credentials: Arc::new(InMemoryCredentialStore::new()),
        }
    }

    /// Client bound to a snapshot of the stored credentials.
    async fn session(&self) -> Result<Session<'_>> {
        let credentials = require_credentials(self.credentials.as_ref()).await?;
        Ok(self.client.session(credentials))
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
        if status.is_server_error() {
            tracing::error!("{} ({:?})", self, self.category());
        } else {
            tracing::warn!("{} ({:?})", self, self.category());
        }
        (status, Json(self.to_body())).into_response()
    }
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| BridgeError::validation("body", rejection.body_text()))
}

pub fn build_router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/practicefusion/add-creds", post(add_creds))
        .route("/practicefusion/create-patient", post(create_patient))
        .route("/practicefusion/upload-documents", post(upload_documents))
        .route("/practicefusion/create-appointment", post(create_appointment))
        .route("/practicefusion/get-appointments", put(get_appointments))
        .route("/practicefusion/update-appointment", post(update_appointment))
        .route("/practicefusion/encounter-summaries", get(encounter_summaries))
        .route("/practicefusion/add-or-edit-soap-notes", post(add_or_edit_soap_notes))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves until the process stops.
pub async fn serve<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    let client = PracticeFusionClient::new(config)?;
    let app = build_router(AppState::new(client), config.server().body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(config.server().bind_address.as_str()).await?;
    tracing::info!(
        "Practice Fusion bridge listening on {} (upstream {})",
        config.server().bind_address,
        config.upstream().base_url
    );
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let authorized = state.credentials.current().await.is_some();
    Json(json!({
        "ok": true,
        "message": "Practice Fusion bridge is alive",
        "authorized": authorized,
    }))
}

async fn add_creds(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<StatusResponse>> {
    let credentials = json_body(payload)?;
    let response = add_credentials(&state.client, state.credentials.as_ref(), credentials).await?;
    Ok(Json(response))
}

async fn create_patient(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreatePatientRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = json_body(payload)?;
    let session = state.session().await?;
    Ok(Json(session.create_patient(&request).await?))
}

async fn read_upload(mut multipart: Multipart) -> Result<DocumentUploadRequest> {
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        BridgeError::validation("body", e.body_text())
    };

    let mut first_name = None;
    let mut last_name = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "firstName" => first_name = Some(field.text().await.map_err(multipart_error)?),
            "lastName" => last_name = Some(field.text().await.map_err(multipart_error)?),
            "files" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(multipart_error)?.to_vec();
                files.push(UploadFile {
                    filename,
                    content_type,
                    data,
                });
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(DocumentUploadRequest {
        files,
        first_name: first_name
            .ok_or_else(|| BridgeError::validation("firstName", "Field is required"))?,
        last_name: last_name
            .ok_or_else(|| BridgeError::validation("lastName", "Field is required"))?,
    })
}

async fn upload_documents(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let request = read_upload(multipart).await?;
    let session = state.session().await?;
    Ok(Json(session.upload_documents(&request).await?))
}

async fn create_appointment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = json_body(payload)?;
    let session = state.session().await?;
    Ok(Json(session.create_appointment(&request).await?))
}

async fn get_appointments(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GetAppointmentsRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = json_body(payload)?;
    let session = state.session().await?;
    Ok(Json(session.get_appointments(&request).await?))
}

async fn update_appointment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UpdateAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = json_body(payload)?;
    let session = state.session().await?;
    Ok(Json(session.update_appointment(&request).await?))
}

async fn encounter_summaries(
    State(state): State<AppState>,
    query: std::result::Result<Query<EncounterSummariesQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(query) =
        query.map_err(|rejection| BridgeError::validation("query", rejection.body_text()))?;
    let session = state.session().await?;
    Ok(Json(session.encounter_summaries(&query).await?))
}

async fn add_or_edit_soap_notes(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PatientTranscriptRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>> {
    let request = json_body(payload)?;
    let session = state.session().await?;
    Ok(Json(session.add_or_edit_soap_notes(&request).await?))
}
