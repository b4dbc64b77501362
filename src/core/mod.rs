pub mod appointments;
pub mod client;
pub mod credentials;
pub mod documents;
pub mod lookup;
pub mod patients;
pub mod transcripts;

pub use client::{PracticeFusionClient, Session};
pub use credentials::{add_credentials, require_credentials, InMemoryCredentialStore};
