//! Remote-submit capability consumed by steps that post their data.

pub mod http;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use http::HttpSubmitter;

/// Request method for a remote submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmitMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl SubmitMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for SubmitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level validation message returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    #[serde(default)]
    pub message: String,
}

/// Error payload of a failed remote submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitFailure {
    /// HTTP status, when the request reached the server
    pub status: Option<u16>,
    /// Human-readable summary
    pub message: String,
    /// Raw response body (JSON if it parsed, otherwise a string)
    pub body: Value,
    /// Field errors parsed from the body
    pub validation: Vec<FieldError>,
}

impl SubmitFailure {
    /// A failure that never reached the server.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: Value::Null,
            validation: Vec::new(),
        }
    }

    /// A failure response, with validation errors extracted from `body` when
    /// it is an array of `{field, message}` objects.
    pub fn from_response(status: u16, body: Value) -> Self {
        let validation = serde_json::from_value::<Vec<FieldError>>(body.clone()).unwrap_or_default();
        Self {
            status: Some(status),
            message: format!("server responded with status {}", status),
            body,
            validation,
        }
    }

    pub fn has_validation_errors(&self) -> bool {
        !self.validation.is_empty()
    }
}

impl fmt::Display for SubmitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {} - {}", status, self.message),
            None => write!(f, "request failed - {}", self.message),
        }
    }
}

impl std::error::Error for SubmitFailure {}

/// Issues a network request on behalf of a step.
///
/// `data` is produced at submit time, so implementations receive the live
/// values of whatever the step reads from its UI.
#[async_trait]
pub trait RemoteSubmitter: Send + Sync {
    async fn submit(
        &self,
        method: SubmitMethod,
        target: &str,
        data: Value,
    ) -> Result<Value, SubmitFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_response_parses_field_errors() {
        let failure = SubmitFailure::from_response(
            422,
            json!([
                {"field": "email", "message": "is taken"},
                {"field": "password"}
            ]),
        );
        assert_eq!(failure.status, Some(422));
        assert_eq!(failure.validation.len(), 2);
        assert_eq!(failure.validation[0].field, "email");
        assert_eq!(failure.validation[1].message, "");
    }

    #[test]
    fn test_from_response_without_field_errors() {
        let failure = SubmitFailure::from_response(500, json!({"error": "boom"}));
        assert!(!failure.has_validation_errors());
        assert_eq!(failure.to_string(), "HTTP 500 - server responded with status 500");
    }

    #[test]
    fn test_transport_display() {
        let failure = SubmitFailure::transport("connection refused");
        assert_eq!(failure.status, None);
        assert_eq!(failure.to_string(), "request failed - connection refused");
    }

    #[test]
    fn test_method_display() {
        assert_eq!(SubmitMethod::Post.to_string(), "POST");
        assert_eq!(
            serde_json::to_value(SubmitMethod::Patch).unwrap(),
            json!("PATCH")
        );
    }
}
