use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    /// Non-2xx status; `body` holds the response text when there was one.
    #[error("Server rejected request with status {status}")]
    ServerRejected { status: StatusCode, body: Option<String> },

    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Registration failed")]
    RegistrationFailed,

    #[error("Session storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload answered 2xx but carried no image location.
    #[error("Upload response did not contain an image URL")]
    EmptyUploadResponse,

    #[error("Terminal input error: {0}")]
    Input(#[from] rustyline::error::ReadlineError),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::ServerRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short text suitable for showing next to the control that failed.
    /// Server bodies are surfaced verbatim; otherwise `fallback` is used.
    pub fn inline_message(&self, fallback: &str) -> String {
        match self {
            ClientError::ValidationFailure(msg) => msg.clone(),
            ClientError::ServerRejected { body: Some(body), .. } if !body.trim().is_empty() => {
                body.trim().to_string()
            }
            ClientError::AuthRequired => "Please log in again".to_string(),
            _ => fallback.to_string(),
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_message_prefers_server_body() {
        let err = ClientError::ServerRejected {
            status: StatusCode::BAD_REQUEST,
            body: Some("{\"description\":\"Description is required\"}".to_string()),
        };
        assert_eq!(
            err.inline_message("Failed to create product"),
            "{\"description\":\"Description is required\"}"
        );
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

        let empty = ClientError::ServerRejected {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Some("  ".to_string()),
        };
        assert_eq!(empty.inline_message("Failed to create product"), "Failed to create product");
        assert_eq!(
            ClientError::ValidationFailure("Price must be a number".into()).inline_message("x"),
            "Price must be a number"
        );
    }
}
