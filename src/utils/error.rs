use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("No Practice Fusion credentials have been added")]
    NotAuthenticated,

    #[error("Practice Fusion rejected the supplied credentials")]
    CredentialsRejected { status: u16 },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Rejected { message: String, detail: Value },

    #[error("Upstream rejected the request (HTTP {status})")]
    Upstream { status: u16, body: Value },

    #[error("Downstream server error (translated to HTTP 501): {message}")]
    UpstreamServer { message: String, code: String },

    #[error("{message} (HTTP {status})")]
    UpstreamUnexpected {
        status: u16,
        message: String,
        code: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Client,
    Authentication,
    Upstream,
    Internal,
}

impl BridgeError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// HTTP status the caller sees for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 422,
            Self::NotAuthenticated | Self::CredentialsRejected { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } | Self::Rejected { .. } => 400,
            Self::Upstream { status, .. } => *status,
            Self::UpstreamServer { .. } => 501,
            // Informational, redirect and 205-299 answers are not forwarded as-is.
            Self::UpstreamUnexpected { .. } | Self::Http(_) | Self::Serialization(_) => 502,
            Self::Config { .. } | Self::Io(_) => 500,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. }
            | Self::NotFound { .. }
            | Self::Conflict { .. }
            | Self::Rejected { .. } => ErrorCategory::Client,
            Self::NotAuthenticated | Self::CredentialsRejected { .. } => {
                ErrorCategory::Authentication
            }
            Self::Upstream { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            Self::Upstream { .. }
            | Self::UpstreamServer { .. }
            | Self::UpstreamUnexpected { .. }
            | Self::Http(_)
            | Self::Serialization(_) => ErrorCategory::Upstream,
            Self::Config { .. } | Self::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Short machine-readable code placed in `error.code`.
    pub fn code(&self) -> String {
        match self {
            Self::Validation { .. } => "validation_error".to_string(),
            Self::NotAuthenticated => "not_authenticated".to_string(),
            Self::CredentialsRejected { .. } => "credentials_rejected".to_string(),
            Self::NotFound { .. } | Self::Conflict { .. } | Self::Rejected { .. } => {
                "client_error".to_string()
            }
            Self::Upstream { status, .. } => status.to_string(),
            Self::UpstreamServer { code, .. } | Self::UpstreamUnexpected { code, .. } => {
                code.clone()
            }
            Self::Http(_) | Self::Serialization(_) => "bad_gateway".to_string(),
            Self::Config { .. } | Self::Io(_) => "internal_error".to_string(),
        }
    }

    pub fn to_body(&self) -> Value {
        let detail = match self {
            Self::Upstream { body, .. } => body.clone(),
            Self::Rejected { message, detail } => json!({
                "message": message,
                "alerts": detail,
            }),
            Self::Validation { field, message } => json!({
                "field": field,
                "message": message,
            }),
            Self::CredentialsRejected { status } => json!({
                "message": self.to_string(),
                "upstreamStatus": status,
            }),
            other => Value::String(other.to_string()),
        };

        json!({
            "error": {
                "message": self.to_string(),
                "code": self.code(),
            },
            "detail": detail,
        })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
