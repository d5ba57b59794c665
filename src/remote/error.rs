//! Conversion of tracker HTTP failures into deck errors.

use std::fmt;

use serde::Deserialize;

use crate::error::DeckError;

/// Seconds to wait when a 429 carries no Retry-After header
const DEFAULT_RETRY_AFTER: u64 = 60;

/// A failed tracker call with the HTTP details needed to classify it
#[derive(Debug)]
pub struct ApiError {
    pub status: Option<reqwest::StatusCode>,
    pub retry_after: Option<u64>,
    pub message: String,
    /// Tracker name for context (e.g., "Jira")
    pub provider: &'static str,
}

impl ApiError {
    pub fn with_status(
        message: impl Into<String>,
        provider: &'static str,
        status: reqwest::StatusCode,
    ) -> Self {
        Self {
            status: Some(status),
            retry_after: None,
            message: message.into(),
            provider,
        }
    }

    pub fn with_retry_after(mut self, seconds: Option<u64>) -> Self {
        self.retry_after = seconds;
        self
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status.is_some_and(|s| s.as_u16() == 429)
    }

    pub fn to_deck_error(&self) -> DeckError {
        let Some(status) = self.status else {
            return DeckError::Api(format!("{} API error: {}", self.provider, self.message));
        };

        match status.as_u16() {
            401 | 403 => DeckError::Auth(format!(
                "{} rejected the credentials (HTTP {}): {}",
                self.provider,
                status.as_u16(),
                self.message
            )),
            429 => DeckError::RateLimited(self.retry_after.unwrap_or(DEFAULT_RETRY_AFTER)),
            400 => DeckError::QueryRejected(self.message.clone()),
            code => DeckError::Api(format!(
                "{} API error (HTTP {code}): {}",
                self.provider, self.message
            )),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ApiError> for DeckError {
    fn from(error: ApiError) -> Self {
        error.to_deck_error()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: indexmap::IndexMap<String, String>,
}

/// Extract a readable message from an error response body.
///
/// Falls back to the body itself, or the status reason when the body is empty.
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let mut messages = parsed.error_messages;
        messages.extend(
            parsed
                .errors
                .into_iter()
                .map(|(field, message)| format!("{field}: {message}")),
        );
        if !messages.is_empty() {
            return messages.join("; ");
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("Unknown").to_string()
    } else {
        trimmed.to_string()
    }
}
