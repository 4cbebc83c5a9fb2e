use thiserror::Error;

/// Unified error type for Armada.
#[derive(Error, Debug)]
pub enum ArmadaError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Auth failed: {0}")]
    AuthFailed(String),

    #[error("Data quota exceeded")]
    QuotaExceeded,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Internal: {0}")]
    Internal(String),
}

impl ArmadaError {
    /// Map to HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            ArmadaError::NotFound(_) => 404,
            ArmadaError::AlreadyExists(_) => 409,
            ArmadaError::BadRequest(_) => 400,
            ArmadaError::AuthFailed(_) => 407,
            ArmadaError::QuotaExceeded => 429,
            ArmadaError::Protocol(_) => 400,
            ArmadaError::Transport(_) => 502,
            _ => 500,
        }
    }

    /// JSON error body.
    pub fn to_json_body(&self) -> Vec<u8> {
        let status = self.status_code();
        let msg = self.to_string();
        format!(r#"{{"error":"{}","status":{}}}"#, msg, status).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ArmadaError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ArmadaError::AlreadyExists("x".into()).status_code(), 409);
        assert_eq!(ArmadaError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(ArmadaError::AuthFailed("x".into()).status_code(), 407);
        assert_eq!(ArmadaError::QuotaExceeded.status_code(), 429);
        assert_eq!(ArmadaError::Protocol("x".into()).status_code(), 400);
        assert_eq!(ArmadaError::Transport("x".into()).status_code(), 502);
        assert_eq!(ArmadaError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_json_body_is_valid_json() {
        let err = ArmadaError::AuthFailed("bad password".into());
        let body = err.to_json_body();
        let parsed: serde_json::Value =
            serde_json::from_slice(&body).expect("to_json_body must produce valid JSON");
        assert_eq!(parsed["status"], 407);
        assert!(parsed["error"].as_str().is_some());
    }

    #[test]
    fn test_json_body_contains_status_and_message() {
        let err = ArmadaError::NotFound("pool eu1".into());
        let text = String::from_utf8(err.to_json_body()).unwrap();
        assert!(text.contains("404"), "body must contain status code");
        assert!(text.contains("eu1"), "body must contain the missing key");
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ArmadaError::AlreadyExists("alice".into()).to_string(),
            "Already exists: alice"
        );
        assert_eq!(ArmadaError::QuotaExceeded.to_string(), "Data quota exceeded");
        assert_eq!(
            ArmadaError::Transport("connect refused".into()).to_string(),
            "Transport error: connect refused"
        );
    }
}
