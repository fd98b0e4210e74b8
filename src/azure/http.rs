//! HTTP utilities for Azure REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Correlation header echoed back by Azure services
const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// A non-success response from an Azure API
#[derive(Debug, Error)]
#[error("API request failed: {status} ({code}): {message}")]
pub struct ApiError {
    pub status: StatusCode,
    /// Service error code, e.g. `AuthorizationFailed`
    pub code: String,
    pub message: String,
}

#[derive(Deserialize)]
struct ArmErrorBody {
    error: ArmErrorDetail,
}

#[derive(Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    fn from_body(status: StatusCode, body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<ArmErrorBody>(body) {
            return Self {
                status,
                code: parsed.error.code.unwrap_or_else(|| "Unknown".to_string()),
                message: parsed.error.message.unwrap_or_default(),
            };
        }
        Self {
            status,
            code: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .replace(' ', ""),
            message: String::new(),
        }
    }
}

/// HTTP client wrapper for Azure API calls
#[derive(Clone)]
pub struct AzureHttpClient {
    client: Client,
}

impl AzureHttpClient {
    /// Create a new HTTP client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("azrg/{}", crate::VERSION))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a bearer-authenticated GET request to an Azure API
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        let request_id = Uuid::new_v4();
        tracing::debug!("GET {} [{}]", url, request_id);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(CLIENT_REQUEST_ID_HEADER, request_id.to_string())
            .send()
            .await
            .context("Failed to send request")?;

        Self::read_json(response).await
    }

    async fn read_json(response: Response) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::from_body(status, &body).into());
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// Format an Azure API error for display
/// Avoids echoing raw API responses to the user
pub fn format_azure_error(error: &anyhow::Error) -> String {
    if let Some(api) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
        return match api.status.as_u16() {
            401 => "Authentication failed. Check the workload identity federation settings.".to_string(),
            403 => format!(
                "Permission denied ({}). Check the identity's role assignments on the subscription.",
                api.code
            ),
            404 => format!("Resource not found ({}).", api.code),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => format!("Invalid request ({}). Check your parameters.", api.code),
            500..=599 => "Azure service temporarily unavailable. Please try again.".to_string(),
            _ => format!("Request failed with status {} ({}).", api.status, api.code),
        };
    }

    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let logged = sanitize_for_log(&body);
        assert!(logged.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(logged.ends_with("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }

    #[test]
    fn test_sanitize_handles_multibyte_boundary() {
        let body = format!("{}é{}", "a".repeat(MAX_LOG_BODY_LENGTH - 1), "b".repeat(50));
        let logged = sanitize_for_log(&body);
        assert!(logged.contains("[truncated"));
    }

    #[test]
    fn test_api_error_from_arm_body() {
        let body = r#"{"error":{"code":"AuthorizationFailed","message":"The client does not have authorization"}}"#;
        let err = ApiError::from_body(StatusCode::FORBIDDEN, body);
        assert_eq!(err.code, "AuthorizationFailed");
        assert_eq!(err.message, "The client does not have authorization");
    }

    #[test]
    fn test_api_error_from_unparseable_body() {
        let err = ApiError::from_body(StatusCode::SERVICE_UNAVAILABLE, "<html>oops</html>");
        assert_eq!(err.code, "ServiceUnavailable");
        assert!(err.message.is_empty());
    }

    #[test]
    fn test_format_forbidden() {
        let err: anyhow::Error = ApiError {
            status: StatusCode::FORBIDDEN,
            code: "AuthorizationFailed".into(),
            message: "secret details".into(),
        }
        .into();
        let msg = format_azure_error(&err);
        assert!(msg.starts_with("Permission denied (AuthorizationFailed)"));
        assert!(!msg.contains("secret details"));
    }

    #[test]
    fn test_format_finds_api_error_under_context() {
        let err = anyhow::Error::from(ApiError {
            status: StatusCode::TOO_MANY_REQUESTS,
            code: "TooManyRequests".into(),
            message: String::new(),
        })
        .context("Failed to list resource groups");
        assert_eq!(
            format_azure_error(&err),
            "Rate limit exceeded. Please try again later."
        );
    }

    #[test]
    fn test_format_other_errors_are_truncated() {
        let err = anyhow::anyhow!("{}", "y".repeat(400));
        let msg = format_azure_error(&err);
        assert!(msg.ends_with("..."));
        assert_eq!(msg.len(), 163);
    }
}
