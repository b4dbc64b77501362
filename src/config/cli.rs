use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "practicefusion-bridge")]
#[command(about = "REST bridge to the Practice Fusion EHR web API")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Address to listen on, overrides server.bind_address")]
    pub bind: Option<String>,

    #[arg(long, env = "PF_BASE_URL", help = "Practice Fusion base URL, overrides upstream.base_url")]
    pub base_url: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    /// Loads the configuration file (or built-in defaults) and applies the flag overrides.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.upstream.base_url = base_url.clone();
        }

        Ok(config)
    }
}
