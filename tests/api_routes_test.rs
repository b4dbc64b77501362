use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use httpmock::prelude::*;
use practicefusion_bridge::domain::model::Credentials;
use practicefusion_bridge::{build_router, AppState, PracticeFusionClient, TomlConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const PATIENT: &str = "0b6a3c1e-1111-2222-3333-444455556666";

fn config(base_url: &str) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.upstream.base_url = base_url.to_string();
    config.upstream.retry_delay_ms = 1;
    config
}

fn credentials() -> Credentials {
    Credentials {
        cookies: "pf_session=abc123".to_string(),
        authorization: "Bearer token-xyz".to_string(),
    }
}

fn app(server: &MockServer) -> Result<(Router, AppState)> {
    let config = config(&server.base_url());
    let state = AppState::new(PracticeFusionClient::new(&config)?);
    let router = build_router(state.clone(), config.server.body_limit_bytes);
    Ok((router, state))
}

async fn authorized_app(server: &MockServer) -> Result<Router> {
    let (router, state) = app(server)?;
    state.credentials.replace(credentials()).await;
    Ok(router)
}

fn json_request(method: Method, uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

async fn call(router: Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = router.oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

#[tokio::test]
async fn test_health_reports_authorization() -> Result<()> {
    let server = MockServer::start();
    let (router, state) = app(&server)?;

    let request = Request::builder().uri("/health").body(Body::empty())?;
    let (status, body) = call(router.clone(), request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["authorized"], false);

    state.credentials.replace(credentials()).await;
    let request = Request::builder().uri("/health").body(Body::empty())?;
    let (_, body) = call(router, request).await?;
    assert_eq!(body["authorized"], true);
    Ok(())
}

#[tokio::test]
async fn test_add_creds_then_workflow() -> Result<()> {
    let server = MockServer::start();
    let facilities = server.mock(|when, then| {
        when.method(GET)
            .path("/PracticeEndpoint/api/v1/facilities")
            .header("Cookie", "pf_session=abc123");
        then.status(200).json_body(json!([]));
    });
    let summaries = server.mock(|when, then| {
        when.method(GET)
            .path(format!("/ChartingEndpoint/api/v1/patients/{}/transcriptSummaries", PATIENT))
            .header("Authorization", "Bearer token-xyz");
        then.status(200).json_body(json!({"transcriptSummaries": [{"transcriptGuid": "t-1"}]}));
    });

    let (router, _) = app(&server)?;
    let creds = json!({"cookies": "pf_session=abc123", "authorization": "Bearer token-xyz"});
    let (status, body) = call(
        router.clone(),
        json_request(Method::POST, "/practicefusion/add-creds", &creds)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": true, "message": "Credentials added and authorized successfully"})
    );

    let uri = format!(
        "/practicefusion/encounter-summaries?patientNameOrParticipantGuid={}",
        PATIENT
    );
    let request = Request::builder().uri(uri).body(Body::empty())?;
    let (status, body) = call(router, request).await?;

    facilities.assert();
    summaries.assert();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transcriptSummaries"][0]["transcriptGuid"], "t-1");
    Ok(())
}

#[tokio::test]
async fn test_rejected_credentials_are_reported() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/PracticeEndpoint/api/v1/facilities");
        then.status(403).json_body(json!({"error": {"message": "forbidden"}}));
    });
    let (router, state) = app(&server)?;

    let creds = json!({"cookies": "pf_session=stale", "authorization": "Bearer stale"});
    let (status, body) = call(
        router,
        json_request(Method::POST, "/practicefusion/add-creds", &creds)?,
    )
    .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "credentials_rejected");
    assert_eq!(
        body["error"]["message"],
        "Practice Fusion rejected the supplied credentials"
    );
    assert!(state.credentials.current().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_workflow_without_credentials_is_unauthorized() -> Result<()> {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });
    let (router, _) = app(&server)?;

    let body = json!({
        "startTime": "2025-03-01T00:00:00Z",
        "endTime": "2025-03-02T00:00:00Z"
    });
    let (status, body) = call(
        router,
        json_request(Method::PUT, "/practicefusion/get-appointments", &body)?,
    )
    .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "not_authenticated");
    any.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_unprocessable() -> Result<()> {
    let server = MockServer::start();
    let router = authorized_app(&server).await?;

    let (status, body) = call(
        router,
        json_request(
            Method::POST,
            "/practicefusion/create-appointment",
            &json!({"appointmentType": "Dentist"}),
        )?,
    )
    .await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["detail"]["field"], "body");
    Ok(())
}

#[tokio::test]
async fn test_upstream_client_error_passes_through() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path_contains("/transcriptSummaries");
        then.status(404)
            .json_body(json!({"error": {"message": "No such patient", "code": "PF404"}}));
    });
    let router = authorized_app(&server).await?;

    let uri = format!(
        "/practicefusion/encounter-summaries?patientNameOrParticipantGuid={}",
        PATIENT
    );
    let (status, body) = call(router, Request::builder().uri(uri).body(Body::empty())?).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"]["error"]["message"], "No such patient");
    Ok(())
}

#[tokio::test]
async fn test_upstream_server_error_becomes_501() -> Result<()> {
    let server = MockServer::start();
    let summaries = server.mock(|when, then| {
        when.method(GET).path_contains("/transcriptSummaries");
        then.status(500).body("oops");
    });
    let router = authorized_app(&server).await?;

    let uri = format!(
        "/practicefusion/encounter-summaries?patientNameOrParticipantGuid={}",
        PATIENT
    );
    let (status, body) = call(router, Request::builder().uri(uri).body(Body::empty())?).await?;

    summaries.assert_hits(1);
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        body["error"]["message"],
        "Downstream server error (translated to HTTP 501): Unknown error"
    );
    assert_eq!(body["error"]["code"], "500");
    Ok(())
}

#[tokio::test]
async fn test_upload_documents_multipart() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/PatientEndpoint/api/v1/patients/search")
            .json_body(json!({"matchAll": true, "firstName": "Jane", "lastName": "Doe"}));
        then.status(200)
            .json_body(json!({"patients": [{"patientPracticeGuid": "pat-1"}]}));
    });
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/DocumentEndpoint/api/v1/documents/upload")
            .body_contains("filename=\"note.txt\"");
        then.status(200).json_body(json!([{
            "documentGuid": "doc-1",
            "binaryStorageGuid": "bin-1",
            "documentDateTimeUtc": "2025-03-01T10:00:00Z",
            "documentName": "note.txt",
            "documentStatus": "Uploaded",
            "documentTypeId": 1,
            "documentTypeName": "Note",
            "fileSize": 5,
            "isDocumentTypeActive": true,
            "isDocumentUnrecoverable": false,
            "isReadyForDownload": true,
            "isSigned": false,
            "mimeType": "text/plain",
            "originalFileExtension": ".txt"
        }]));
    });
    let metadata = server.mock(|when, then| {
        when.method(PUT).path("/DocumentEndpoint/api/v1/documents/metadata");
        then.status(200).json_body(json!({"documentGuid": "doc-1"}));
    });
    let router = authorized_app(&server).await?;

    let boundary = "bridge-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"firstName\"\r\n\r\nJane\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"lastName\"\r\n\r\nDoe\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"note.txt\"\r\n\
         Content-Type: text/plain\r\n\r\nhello\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/practicefusion/upload-documents")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))?;

    let (status, body) = call(router, request).await?;

    assert_eq!(status, StatusCode::OK);
    upload.assert();
    metadata.assert();
    assert_eq!(body["uploaded_files"][0]["documentGuid"], "doc-1");
    Ok(())
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() -> Result<()> {
    let server = MockServer::start();
    let router = authorized_app(&server).await?;

    let boundary = "bridge-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"firstName\"\r\n\r\nJane\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"lastName\"\r\n\r\nDoe\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/practicefusion/upload-documents")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))?;

    let (status, body) = call(router, request).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["field"], "files");
    Ok(())
}

#[tokio::test]
async fn test_soap_notes_route() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(httpmock::Method::PATCH).path(format!(
            "/ChartingEndpoint/api/v1/patients/{}/transcripts/tr-9",
            PATIENT
        ));
        then.status(204);
    });
    let router = authorized_app(&server).await?;

    let body = json!({
        "patientNameOrParticipantGuid": PATIENT,
        "transcriptGuid": "tr-9",
        "planNote": "Follow up in two weeks"
    });
    let (status, body) = call(
        router,
        json_request(Method::POST, "/practicefusion/add-or-edit-soap-notes", &body)?,
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(
        body["message"],
        "Encounter transcript with id: tr-9 updated successfully"
    );
    Ok(())
}
