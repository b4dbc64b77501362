pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::http::{build_router, serve, AppState};
pub use config::{CliConfig, TomlConfig};
pub use core::{InMemoryCredentialStore, PracticeFusionClient};
pub use utils::error::{BridgeError, Result};
