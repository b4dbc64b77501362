use crate::config::toml_config::{DefaultsConfig, EndpointsConfig, ServerConfig, UpstreamConfig};
use crate::domain::model::Credentials;
use async_trait::async_trait;

/// Holds the Practice Fusion session used for every upstream call.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn current(&self) -> Option<Credentials>;
    async fn replace(&self, credentials: Credentials);
    async fn clear(&self);
}

pub trait ConfigProvider: Send + Sync {
    fn server(&self) -> &ServerConfig;
    fn upstream(&self) -> &UpstreamConfig;
    fn defaults(&self) -> &DefaultsConfig;
    fn endpoints(&self) -> &EndpointsConfig;
}
