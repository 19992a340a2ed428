//! The discriminated result of one delegated call.

use crate::error::NetworkError;

/// Outcome of `NetworkDelegate::execute`: a decoded success payload, or a
/// classified error with the server's decoded error body when it had one.
#[derive(Debug)]
pub enum NetworkResponse<T, E> {
    Success(T),
    Error {
        kind: NetworkError,
        detail: Option<E>,
    },
}

impl<T, E> NetworkResponse<T, E> {
    pub(crate) fn error(kind: impl Into<NetworkError>) -> Self {
        NetworkResponse::Error {
            kind: kind.into(),
            detail: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NetworkResponse::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            NetworkResponse::Success(data) => Some(data),
            NetworkResponse::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<&NetworkError> {
        match self {
            NetworkResponse::Success(_) => None,
            NetworkResponse::Error { kind, .. } => Some(kind),
        }
    }

    /// Convert into a `Result` for use with `?`.
    pub fn into_result(self) -> Result<T, (NetworkError, Option<E>)> {
        match self {
            NetworkResponse::Success(data) => Ok(data),
            NetworkResponse::Error { kind, detail } => Err((kind, detail)),
        }
    }
}
