use crate::core::client::PracticeFusionClient;
use crate::domain::model::{Credentials, StatusResponse};
use crate::domain::ports::CredentialStore;
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn current(&self) -> Option<Credentials> {
        self.inner.read().await.clone()
    }

    async fn replace(&self, credentials: Credentials) {
        *self.inner.write().await = Some(credentials);
    }

    async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

/// Checks the credentials against the facility list and stores them when
/// Practice Fusion accepts them. Rejected credentials leave the store untouched.
pub async fn add_credentials(
    client: &PracticeFusionClient,
    store: &dyn CredentialStore,
    credentials: Credentials,
) -> Result<StatusResponse> {
    credentials.validate()?;

    tracing::debug!("Authorizing Practice Fusion credentials");
    let session = client.session(credentials.clone());
    match session.get(&client.endpoints().facility, &[]).await {
        Ok(_) => {}
        Err(BridgeError::Upstream { status, .. }) if status == 401 || status == 403 => {
            tracing::warn!("Practice Fusion rejected the supplied credentials ({})", status);
            return Err(BridgeError::CredentialsRejected { status });
        }
        Err(e) => return Err(e),
    }

    store.replace(credentials).await;
    tracing::info!("Practice Fusion credentials added");

    Ok(StatusResponse {
        status: true,
        message: "Credentials added and authorized successfully".to_string(),
    })
}

/// Snapshot of the stored credentials for one workflow.
pub async fn require_credentials(store: &dyn CredentialStore) -> Result<Credentials> {
    store.current().await.ok_or(BridgeError::NotAuthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::tests::{test_config, test_credentials};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_store_replace_and_clear() {
        let store = InMemoryCredentialStore::new();
        assert!(store.current().await.is_none());

        store.replace(test_credentials()).await;
        assert_eq!(store.current().await.unwrap().cookies, "pf_session=abc123");

        store.clear().await;
        assert!(require_credentials(&store).await.is_err());
    }

    #[tokio::test]
    async fn test_add_credentials_stores_on_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/PracticeEndpoint/api/v1/facilities")
                .header("Authorization", "Bearer token-xyz");
            then.status(200).json_body(json!([]));
        });

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let store = InMemoryCredentialStore::new();

        let response = add_credentials(&client, &store, test_credentials()).await.unwrap();

        mock.assert();
        assert!(response.status);
        assert!(store.current().await.is_some());
    }

    #[tokio::test]
    async fn test_add_credentials_rejected_keeps_previous() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/PracticeEndpoint/api/v1/facilities");
            then.status(401).json_body(json!({"error": {"message": "expired"}}));
        });

        let client = PracticeFusionClient::new(&test_config(&server.base_url())).unwrap();
        let store = InMemoryCredentialStore::new();
        let previous = Credentials {
            cookies: "old=1".to_string(),
            authorization: "Bearer old".to_string(),
        };
        store.replace(previous).await;

        let err = add_credentials(&client, &store, test_credentials()).await.unwrap_err();

        assert!(matches!(err, BridgeError::CredentialsRejected { status: 401 }));
        assert_eq!(
            err.to_string(),
            "Practice Fusion rejected the supplied credentials"
        );
        assert_eq!(store.current().await.unwrap().cookies, "old=1");
    }

    #[tokio::test]
    async fn test_add_credentials_rejects_blank_values() {
        let client = PracticeFusionClient::new(&test_config("http://127.0.0.1:9")).unwrap();
        let store = InMemoryCredentialStore::new();
        let blank = Credentials {
            cookies: "  ".to_string(),
            authorization: "Bearer x".to_string(),
        };

        let err = add_credentials(&client, &store, blank).await.unwrap_err();
        assert_eq!(err.status_code(), 422);
    }
}
