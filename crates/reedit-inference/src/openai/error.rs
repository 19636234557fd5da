//! OpenAI-specific error handling.

use reedit_core::Error;

use super::types::OpenAIErrorResponse;

/// OpenAI-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Request rejected by the safety system.
    ContentPolicy,
    /// Request too large.
    ContextLengthExceeded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status and error type/code.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (400, _) if error_type.contains("content_policy") || error_type.contains("safety") => {
                Self::ContentPolicy
            }
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// Convert OpenAI error to reedit Error.
pub fn to_reedit_error(code: OpenAIErrorCode, message: &str) -> Error {
    match code {
        OpenAIErrorCode::AuthenticationError => {
            Error::Config(format!("Authentication failed: {}", message))
        }
        OpenAIErrorCode::RateLimitExceeded => {
            Error::Inference(format!("Rate limit exceeded: {}", message))
        }
        OpenAIErrorCode::ModelNotFound => Error::Config(format!("Model not found: {}", message)),
        OpenAIErrorCode::ContentPolicy => {
            Error::Inference(format!("Rejected by content policy: {}", message))
        }
        OpenAIErrorCode::ContextLengthExceeded => {
            Error::Inference(format!("Context too long: {}", message))
        }
        OpenAIErrorCode::ServerError => {
            Error::Inference(format!("Server error: {}", message))
        }
        OpenAIErrorCode::Unknown => Error::Inference(message.to_string()),
    }
}

/// Turn a non-2xx response into an error, consuming the body.
pub(crate) async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let (error_type, message) = match serde_json::from_str::<OpenAIErrorResponse>(&body) {
        Ok(parsed) => {
            let kind = parsed.error.code.unwrap_or(parsed.error.error_type);
            (kind, parsed.error.message)
        }
        Err(_) => ("unknown".to_string(), body),
    };

    let code = OpenAIErrorCode::from_response(status.as_u16(), &error_type);
    to_reedit_error(code, &format!("OpenAI returned {}: {}", status, message))
}
