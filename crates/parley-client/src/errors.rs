/// Errors returned by the client before a stream is established, and by the
/// request/response calls (auth, profile).
///
/// Streaming components never return these for failures that happen while a
/// reply is being consumed; those are delivered through the sink callbacks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input (empty message, missing id, ...).
    #[error("validation error: {0}")]
    Validation(String),
    /// Network or stream I/O failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// Server answered with a non-2xx status.
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },
    /// Response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// Local file access failed.
    #[error("io error: {0}")]
    Io(String),
}

impl ClientError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns the text shown to a user for this error.
    ///
    /// HTTP, transport and file failures carry their message as is,
    /// everything else uses the display form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { message, .. } => message.clone(),
            Self::Transport(message) | Self::Io(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// Extracts a human-readable message from a structured error body.
///
/// Looks at `detail[0].msg`, a string `detail`, `error`, then `message`, and
/// falls back to `fallback` when none is present or the body is not JSON.
pub fn detail_message(body: &str, fallback: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return fallback.to_string();
    };
    let detail = value.get("detail");
    detail
        .and_then(|d| d.get(0))
        .and_then(|first| first.get("msg"))
        .and_then(|v| v.as_str())
        .or_else(|| detail.and_then(|d| d.as_str()))
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .filter(|msg| !msg.trim().is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_message_prefers_validation_list_entry() {
        let body = r#"{"detail":[{"loc":["body","password"],"msg":"field required"}]}"#;
        assert_eq!(detail_message(body, "Login failed"), "field required");
    }

    #[test]
    fn detail_message_accepts_plain_string_detail() {
        let body = r#"{"detail":"Invalid credentials"}"#;
        assert_eq!(detail_message(body, "Login failed"), "Invalid credentials");
    }

    #[test]
    fn detail_message_falls_back_to_error_field_then_generic() {
        assert_eq!(detail_message(r#"{"error":"quota"}"#, "x"), "quota");
        assert_eq!(detail_message("<html>502</html>", "Upload failed"), "Upload failed");
        assert_eq!(detail_message(r#"{"detail":[]}"#, "Upload failed"), "Upload failed");
    }

    #[test]
    fn user_message_strips_prefix_for_http_errors() {
        let err = ClientError::Http {
            status: 400,
            message: "bad zip".into(),
        };
        assert_eq!(err.user_message(), "bad zip");
        assert_eq!(
            ClientError::Validation("empty".into()).user_message(),
            "validation error: empty"
        );
        assert_eq!(
            ClientError::Io("Failed to read a.zip: denied".into()).user_message(),
            "Failed to read a.zip: denied"
        );
    }
}
