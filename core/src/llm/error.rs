use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream error: status={status} body={body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to the provider error taxonomy
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => ProviderError::Auth(body),
            429 => ProviderError::RateLimit(body),
            // Gemini reports bad keys as 400 INVALID_ARGUMENT
            400 if body.contains("API_KEY_INVALID") => ProviderError::Auth(body),
            code => ProviderError::Upstream { status: code, body },
        }
    }

    /// Short tag used in verification flags
    pub fn tag(&self) -> &'static str {
        match self {
            ProviderError::Auth(_) => "auth",
            ProviderError::RateLimit(_) => "rate_limit",
            ProviderError::Network(_) => "network",
            ProviderError::Upstream { .. } => "upstream",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // request URLs may carry credentials in their query string
        let e = e.without_url();
        if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(matches!(
            ProviderError::from_status(StatusCode::UNAUTHORIZED, "bad key".into()),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            ProviderError::from_status(StatusCode::FORBIDDEN, String::new()),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            ProviderError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ProviderError::RateLimit(_)
        ));
        assert_eq!(
            ProviderError::from_status(StatusCode::BAD_GATEWAY, "oops".into()),
            ProviderError::Upstream {
                status: 502,
                body: "oops".into()
            }
        );
    }

    #[test]
    fn gemini_invalid_key_is_auth() {
        let body = r#"{"error":{"status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;
        assert_eq!(
            ProviderError::from_status(StatusCode::BAD_REQUEST, body.into()).tag(),
            "auth"
        );
    }
}
