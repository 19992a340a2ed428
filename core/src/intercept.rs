//! Hooks around dispatch: interceptors and authenticators.
//!
//! # Design
//! Interceptors see every request just before it is sent and every response
//! status just after it arrives. They run in registration order and may
//! replace the request (to add a header, say) but never short-circuit the
//! call. An authenticator is consulted only when the server answers 401 and
//! may supply one replacement request; the delegate sends it at most once.

use std::fmt;

use reqwest::header::HeaderMap;

use crate::http::{Request, AUTHORIZATION};

pub trait Interceptor: Send + Sync {
    /// Called with the built request; returns the request to send.
    fn before_send(&self, request: Request) -> Request {
        request
    }

    /// Called once per received response, before the body is read.
    fn after_receive(&self, _request: &Request, _status: u16, _headers: &HeaderMap) {}
}

/// Logs each request line and response status through `tracing`.
/// Header values and bodies are never logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn before_send(&self, request: Request) -> Request {
        let header_names: Vec<&str> = request.headers().iter().map(|(name, _)| name.as_str()).collect();
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            headers = ?header_names,
            "sending request"
        );
        request
    }

    fn after_receive(&self, request: &Request, status: u16, _headers: &HeaderMap) {
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            status,
            "received response"
        );
    }
}

pub trait Authenticator: Send + Sync {
    /// Answer a 401 for `request`. `None` gives up and lets the 401 through.
    fn authenticate(&self, request: &Request, status: u16) -> Option<Request>;
}

/// Answers a 401 by resending with `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerAuthenticator {
    header_value: String,
}

impl BearerAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            header_value: format!("Bearer {}", token.into()),
        }
    }
}

impl fmt::Debug for BearerAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthenticator").finish_non_exhaustive()
    }
}

impl Authenticator for BearerAuthenticator {
    fn authenticate(&self, request: &Request, _status: u16) -> Option<Request> {
        // Already rejected with this token; resending would loop.
        if request.header(AUTHORIZATION) == Some(self.header_value.as_str()) {
            return None;
        }
        Some(request.clone().with_header(AUTHORIZATION, &self.header_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RequestBuilder;

    fn request(headers: &[(&str, &str)]) -> Request {
        RequestBuilder::new()
            .url("http://localhost:3000", "/protected", [("k", "v")])
            .unwrap()
            .headers(headers.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn default_hooks_pass_request_through() {
        struct Nothing;
        impl Interceptor for Nothing {}

        let original = request(&[("X-A", "1")]);
        let passed = Nothing.before_send(original.clone());
        assert_eq!(passed.url(), original.url());
        assert_eq!(passed.headers(), original.headers());
    }

    #[test]
    fn logging_interceptor_returns_request_unchanged() {
        let original = request(&[("Authorization", "secret")]);
        let passed = LoggingInterceptor.before_send(original.clone());
        assert_eq!(passed.headers(), original.headers());
        LoggingInterceptor.after_receive(&passed, 200, &HeaderMap::new());
    }

    #[test]
    fn bearer_adds_authorization() {
        let auth = BearerAuthenticator::new("s3cret");
        let retried = auth.authenticate(&request(&[]), 401).unwrap();
        assert_eq!(retried.header(AUTHORIZATION), Some("Bearer s3cret"));
        assert_eq!(retried.url().query(), Some("k=v"));
    }

    #[test]
    fn bearer_replaces_stale_token() {
        let auth = BearerAuthenticator::new("fresh");
        let retried = auth.authenticate(&request(&[("authorization", "Bearer stale")]), 401).unwrap();
        assert_eq!(retried.header(AUTHORIZATION), Some("Bearer fresh"));
        assert_eq!(retried.headers().len(), 1);
    }

    #[test]
    fn bearer_gives_up_when_token_already_sent() {
        let auth = BearerAuthenticator::new("s3cret");
        assert!(auth.authenticate(&request(&[("Authorization", "Bearer s3cret")]), 401).is_none());
    }

    #[test]
    fn bearer_debug_hides_token() {
        let shown = format!("{:?}", BearerAuthenticator::new("s3cret"));
        assert!(!shown.contains("s3cret"));
    }
}
