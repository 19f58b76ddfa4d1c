use serde::Deserialize;

/// Message shown when the server returned neither an envelope nor text.
pub const GENERIC_SERVER_ERROR: &str = "Unknown server error.";

/// Error body the backend sends on failure: `{"detail": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

/// Pick the most useful message out of an error response body.
///
/// Preference: a string `detail` from the JSON envelope, then the raw body
/// text, then a generic message.
pub fn extract_error(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(serde_json::Value::String(detail)) = envelope.detail {
            if !detail.trim().is_empty() {
                return detail;
            }
        }
    }

    let text = body.trim();
    if text.is_empty() {
        GENERIC_SERVER_ERROR.to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_wins() {
        assert_eq!(extract_error(r#"{"detail": "Erro no Wall-E"}"#), "Erro no Wall-E");
    }

    #[test]
    fn non_json_falls_back_to_text() {
        assert_eq!(extract_error("Internal Server Error\n"), "Internal Server Error");
    }

    #[test]
    fn json_without_string_detail_falls_back_to_body() {
        let body = r#"{"detail": [{"loc": ["body", "file_sped"], "msg": "field required"}]}"#;
        assert_eq!(extract_error(body), body);
        assert_eq!(extract_error(r#"{"error": "x"}"#), r#"{"error": "x"}"#);
    }

    #[test]
    fn empty_body_is_generic() {
        assert_eq!(extract_error(""), GENERIC_SERVER_ERROR);
        assert_eq!(extract_error("  \n"), GENERIC_SERVER_ERROR);
    }
}
