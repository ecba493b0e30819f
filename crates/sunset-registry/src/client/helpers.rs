//! Pure helpers: name encoding, error-body parsing, OTP detection (no HTTP).

use reqwest::header::HeaderMap;
use serde_json::Value;

/// Longest plain-text body used verbatim as an error message.
const MAX_PLAIN_MESSAGE_LEN: usize = 500;

/// Encode a package name for use as a single path segment.
///
/// Scoped names keep their `@` but have the separator escaped:
/// `@scope/name` becomes `@scope%2Fname`.
pub fn encode_package_name(name: &str) -> String {
    name.replace('/', "%2F")
}

/// Parse a response body as JSON, falling back to a JSON string.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Human-readable message from an error body.
///
/// Checks the `error`, `message` and `reason` fields in that order, then a
/// short plain-text body, then falls back to the status line.
pub(crate) fn extract_error_message(status: u16, body: &Value) -> String {
    match body {
        Value::Object(obj) => ["error", "message", "reason"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(String::from),
        Value::String(text) if !text.is_empty() && text.len() < MAX_PLAIN_MESSAGE_LEN => {
            Some(text.clone())
        }
        _ => None,
    }
    .unwrap_or_else(|| format!("Request failed with status {status}"))
}

/// Whether a 401/403 response is an OTP challenge rather than a bad token.
pub(crate) fn requires_otp(headers: &HeaderMap, body: &Value) -> bool {
    let header_mentions_otp = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("otp"))
    };

    if header_mentions_otp("www-authenticate") || header_mentions_otp("npm-notice") {
        return true;
    }

    let body_text = match body {
        Value::String(text) => text.to_lowercase(),
        other => other.to_string().to_lowercase(),
    };

    ["otp", "one-time pass", "eotp"]
        .iter()
        .any(|marker| body_text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_encode_package_name() {
        assert_eq!(encode_package_name("left-pad"), "left-pad");
        assert_eq!(encode_package_name("@acme/widget"), "@acme%2Fwidget");
    }

    #[test]
    fn test_parse_body_falls_back_to_string() {
        assert_eq!(parse_body(r#"{"ok":true}"#), json!({"ok": true}));
        assert_eq!(parse_body("plain"), json!("plain"));
        assert_eq!(parse_body(""), Value::Null);
    }

    #[test]
    fn test_extract_error_message_field_order() {
        assert_eq!(
            extract_error_message(400, &json!({"message": "m", "reason": "r"})),
            "m"
        );
        assert_eq!(extract_error_message(400, &json!({"reason": "r"})), "r");
        assert_eq!(
            extract_error_message(404, &json!({"error": "Not found"})),
            "Not found"
        );
        assert_eq!(extract_error_message(400, &json!("bad input")), "bad input");
        assert_eq!(
            extract_error_message(500, &json!("x".repeat(600))),
            "Request failed with status 500"
        );
    }

    #[test]
    fn test_requires_otp_markers() {
        let empty = HeaderMap::new();
        assert!(requires_otp(&empty, &json!({"error": "This operation requires a one-time password."})));
        assert!(requires_otp(&empty, &json!({"code": "EOTP"})));
        assert!(!requires_otp(&empty, &json!({"error": "bad token"})));

        let mut headers = HeaderMap::new();
        headers.insert("www-authenticate", HeaderValue::from_static("OTP"));
        assert!(requires_otp(&headers, &Value::Null));

        let mut headers = HeaderMap::new();
        headers.insert(
            "npm-notice",
            HeaderValue::from_static("Please provide an OTP to continue"),
        );
        assert!(requires_otp(&headers, &Value::Null));
    }
}
