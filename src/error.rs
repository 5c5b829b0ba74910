use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid route pattern `{pattern}`: {reason}")]
    InvalidRoute { pattern: String, reason: String },
    #[error("Request line longer than {0} bytes")]
    UriTooLong(usize),
    #[error("Request headers too large: {0}")]
    HeadersTooLarge(String),
    #[error("Unsupported method: {0}")]
    Unsupported(String),
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("Panic: {0}")]
    PanicError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::ParseError(_) => 400,
            ServerError::UriTooLong(_) => 414,
            ServerError::HeadersTooLarge(_) => 431,
            ServerError::Unsupported(_) => 501,
            ServerError::IoError(_)
            | ServerError::InvalidRoute { .. }
            | ServerError::InternalError(_)
            | ServerError::PanicError(_)
            | ServerError::ConfigError(_) => 500,
        }
    }

    pub(crate) fn invalid_route(pattern: &str, reason: impl Into<String>) -> Self {
        ServerError::InvalidRoute {
            pattern: pattern.to_owned(),
            reason: reason.into(),
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ServerError::ParseError("x".into()).status_code(), 400);
        assert_eq!(ServerError::UriTooLong(65536).status_code(), 414);
        assert_eq!(ServerError::HeadersTooLarge("x".into()).status_code(), 431);
        assert_eq!(ServerError::Unsupported("POST".into()).status_code(), 501);
        assert_eq!(ServerError::InternalError("boom".into()).status_code(), 500);
    }

    #[test]
    fn io_errors_convert() {
        let err: ServerError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ServerError::IoError(_)));
        assert_eq!(err.to_string(), "IO error: gone");
    }

    #[test]
    fn invalid_route_message_names_pattern() {
        let err = ServerError::invalid_route("/a/<b", "unclosed placeholder");
        assert_eq!(
            err.to_string(),
            "Invalid route pattern `/a/<b`: unclosed placeholder"
        );
    }
}
