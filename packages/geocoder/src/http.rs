//! Single-shot JSON requests against `ArcGIS` REST endpoints.
//!
//! Every service call goes through [`send_json`]. A request is sent once:
//! a failure is reported to the caller, which decides whether to fall
//! back to synthetic data. The client's own timeout is the only deadline.

use std::fmt;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Why a JSON request did not produce a usable body.
#[derive(Debug)]
pub enum HttpFailure {
    /// Connection, timeout, or body-read failure.
    Request(reqwest::Error),
    /// The server answered with a non-2xx status.
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        preview: String,
    },
    /// The body was not valid JSON.
    Decode {
        /// Parser message.
        message: String,
    },
    /// The body was an `ArcGIS` `{"error": {...}}` payload.
    Esri {
        /// The service's error message.
        message: String,
    },
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "request failed: {e}"),
            Self::Status { status, preview } => write!(f, "HTTP {status}: {preview}"),
            Self::Decode { message } => write!(f, "invalid JSON: {message}"),
            Self::Esri { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for HttpFailure {}

impl From<reqwest::Error> for HttpFailure {
    fn from(value: reqwest::Error) -> Self {
        Self::Request(value)
    }
}

fn preview(text: &str) -> String {
    if text.len() > BODY_PREVIEW_LEN {
        let mut end = BODY_PREVIEW_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    } else {
        text.to_string()
    }
}

/// Extracts the message of an `ArcGIS` error payload, if the body is one.
///
/// `ArcGIS` reports many failures (bad token, invalid query) with a 200
/// status and a body of the form `{"error": {"code": 498, "message": ...,
/// "details": [...]}}`.
#[must_use]
pub fn esri_error_message(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error")?;
    let message = error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown error");
    let details = error
        .get("details")
        .and_then(serde_json::Value::as_array)
        .map(|d| {
            d.iter()
                .filter_map(serde_json::Value::as_str)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|d| !d.is_empty());

    Some(match (error.get("code").and_then(serde_json::Value::as_i64), details) {
        (Some(code), Some(details)) => format!("ArcGIS error {code}: {message} ({details})"),
        (Some(code), None) => format!("ArcGIS error {code}: {message}"),
        (None, Some(details)) => format!("ArcGIS error: {message} ({details})"),
        (None, None) => format!("ArcGIS error: {message}"),
    })
}

/// Sends a request once and parses the body as JSON.
///
/// Non-2xx statuses and `ArcGIS` error payloads are failures. The body is
/// read as text first so a preview can be logged when it is not JSON.
///
/// # Errors
///
/// Returns [`HttpFailure`] if the request fails, the status is not a
/// success, the body is not JSON, or the body is an error payload.
pub async fn send_json(request: reqwest::RequestBuilder) -> Result<serde_json::Value, HttpFailure> {
    let response = request.send().await?;
    let url = response.url().path().to_string();
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let preview = preview(&text);
        log::warn!("HTTP {status} from {url}\n  body: {preview}");
        return Err(HttpFailure::Status {
            status: status.as_u16(),
            preview,
        });
    }

    let body: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "JSON parse failed for {url}: {e}\n  body: {}",
            preview(&text)
        );
        HttpFailure::Decode {
            message: e.to_string(),
        }
    })?;

    if let Some(message) = esri_error_message(&body) {
        log::warn!("{url}: {message}");
        return Err(HttpFailure::Esri { message });
    }

    Ok(body)
}

/// Masks a token for log output, keeping only its length.
#[must_use]
pub fn redact_token(token: &str) -> String {
    format!("<redacted:{} chars>", token.len())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_esri_error_payload() {
        let body = json!({
            "error": {
                "code": 498,
                "message": "Invalid Token",
                "details": ["Token expired"]
            }
        });
        assert_eq!(
            esri_error_message(&body).unwrap(),
            "ArcGIS error 498: Invalid Token (Token expired)"
        );
    }

    #[test]
    fn error_without_message_is_still_an_error() {
        let body = json!({"error": {}});
        assert_eq!(esri_error_message(&body).unwrap(), "ArcGIS error: unknown error");
    }

    #[test]
    fn normal_body_is_not_an_error() {
        assert!(esri_error_message(&json!({"candidates": []})).is_none());
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let long = "x".repeat(BODY_PREVIEW_LEN + 20);
        let p = preview(&long);
        assert_eq!(p.len(), BODY_PREVIEW_LEN + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn redacted_token_hides_value() {
        let redacted = redact_token("secret-token");
        assert!(!redacted.contains("secret"));
        assert_eq!(redacted, "<redacted:12 chars>");
    }
}
