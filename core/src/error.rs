//! Error types for the request delegate.
//!
//! # Design
//! Errors are split by when they can happen. `BuildError` covers everything
//! that can go wrong before a byte is sent. `TransportError` is the cause
//! carried by `NetworkError::Transport` and wraps build failures, I/O and
//! decode failures of a *successful* response. `NetworkError` is the single
//! classification handed back to callers inside `NetworkResponse::Error`.
//!
//! A failed response whose body does not decode as the caller's error shape
//! is classified by status code alone (`from_status`); a successful response
//! whose body does not decode is a `Transport(Decode)`. The two cases never
//! share a variant.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn call parameters into a `Request`.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("base url cannot carry path segments: {0}")]
    CannotBeABase(String),

    #[error("request url was never set")]
    MissingUrl,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Cause of a `NetworkError::Transport`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("request timed out")]
    Timeout,

    #[error("http transport failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("failed to read upload {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("empty body")]
    EmptyBody,

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Http(err)
        }
    }
}

/// Classification of a failed call. Exactly one variant per response.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("bad request")]
    BadRequest,

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("server error")]
    ServerError,

    #[error("unexpected status {0}")]
    Unknown(u16),

    /// The server declared failure and sent a body that decoded as the
    /// caller's error shape.
    #[error("server error {0} with error body")]
    CustomServerError(u16),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl NetworkError {
    /// Classify a status code. Total over `u16`; never fails.
    pub fn from_status(code: u16) -> NetworkError {
        match code {
            400 => NetworkError::BadRequest,
            401 => NetworkError::Unauthorized,
            404 => NetworkError::NotFound,
            409 => NetworkError::Conflict,
            500..=599 => NetworkError::ServerError,
            other => NetworkError::Unknown(other),
        }
    }

    /// The status code behind this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::BadRequest => Some(400),
            NetworkError::Unauthorized => Some(401),
            NetworkError::NotFound => Some(404),
            NetworkError::Conflict => Some(409),
            NetworkError::ServerError | NetworkError::Transport(_) => None,
            NetworkError::Unknown(code) | NetworkError::CustomServerError(code) => Some(*code),
        }
    }
}

/// Failure to load configuration or construct a delegate.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_codes_map_to_named_variants() {
        assert!(matches!(NetworkError::from_status(400), NetworkError::BadRequest));
        assert!(matches!(NetworkError::from_status(401), NetworkError::Unauthorized));
        assert!(matches!(NetworkError::from_status(404), NetworkError::NotFound));
        assert!(matches!(NetworkError::from_status(409), NetworkError::Conflict));
    }

    #[test]
    fn whole_5xx_range_is_server_error() {
        for code in 500..=599 {
            assert!(
                matches!(NetworkError::from_status(code), NetworkError::ServerError),
                "{code}"
            );
        }
    }

    #[test]
    fn everything_else_is_unknown_with_code() {
        let named = |c: &u16| [400, 401, 404, 409].contains(c) || (500..=599).contains(c);
        for code in (0..=u16::MAX).filter(|c| !named(c)) {
            match NetworkError::from_status(code) {
                NetworkError::Unknown(got) => assert_eq!(got, code),
                other => panic!("{code} mapped to {other:?}"),
            }
        }
    }

    #[test]
    fn mapping_is_deterministic() {
        for code in [200, 302, 403, 418, 503] {
            assert_eq!(
                format!("{:?}", NetworkError::from_status(code)),
                format!("{:?}", NetworkError::from_status(code))
            );
        }
    }

    #[test]
    fn status_is_recovered_from_variant() {
        assert_eq!(NetworkError::from_status(409).status(), Some(409));
        assert_eq!(NetworkError::CustomServerError(422).status(), Some(422));
        assert_eq!(NetworkError::ServerError.status(), None);
        assert_eq!(NetworkError::Transport(TransportError::EmptyBody).status(), None);
    }

    #[test]
    fn transport_error_display_passes_through() {
        let err = NetworkError::from(TransportError::EmptyBody);
        assert_eq!(err.to_string(), "empty body");
        let err = NetworkError::from(TransportError::from(BuildError::MissingUrl));
        assert_eq!(err.to_string(), "request url was never set");
    }
}
