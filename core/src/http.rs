//! Plain-data HTTP request types.
//!
//! # Design
//! A `Request` is a fully resolved description of one outbound call: method,
//! absolute URL, headers and an optional encoded body. It is produced by
//! `RequestBuilder`, never mutated afterwards, and only turned into a
//! `reqwest` request at dispatch time. Keeping it as data lets tests assert
//! on exactly what would go over the wire without opening a socket, and lets
//! an authenticator derive a replacement request from the original.
//!
//! Header names are compared ASCII case-insensitively; the first spelling a
//! caller used is kept.

use std::fmt;
use std::path::PathBuf;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::BuildError;

/// `Authorization` header name.
pub const AUTHORIZATION: &str = "Authorization";
/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "Content-Type";
/// `Accept` header name.
pub const ACCEPT: &str = "Accept";
/// Bare JSON media type, handy as an `Accept` value.
pub const APPLICATION_JSON: &str = "application/json";
/// Media type given to every uploaded file part.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Declared wire encoding of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    #[default]
    Json,
    Form,
    Multipart,
}

impl ContentType {
    /// The MIME string sent for this content type.
    pub fn media_type(self) -> &'static str {
        match self {
            ContentType::Json => "application/json; charset=utf-8",
            ContentType::Form => "application/x-www-form-urlencoded; charset=utf-8",
            ContentType::Multipart => "multipart/form-data; charset=utf-8",
        }
    }
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// A scalar field rendered as a plain string.
    Text { name: String, value: String },

    /// A file upload. The contents are read from `path` when the request is
    /// dispatched, not when it is built.
    File {
        name: String,
        filename: String,
        media_type: &'static str,
        path: PathBuf,
    },
}

impl Part {
    pub fn name(&self) -> &str {
        match self {
            Part::Text { name, .. } | Part::File { name, .. } => name,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Part::File { .. })
    }
}

/// An encoded request body. The variants are mutually exclusive; "no body"
/// is `Option::None` on the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// A single JSON document sent with `media_type`.
    Json {
        media_type: &'static str,
        bytes: Vec<u8>,
    },

    /// A `multipart/form-data` body. The boundary is chosen by the transport.
    Multipart(Vec<Part>),
}

impl RequestBody {
    pub fn as_json(&self) -> Option<&[u8]> {
        match self {
            RequestBody::Json { bytes, .. } => Some(bytes),
            RequestBody::Multipart(_) => None,
        }
    }

    pub fn parts(&self) -> &[Part] {
        match self {
            RequestBody::Json { .. } => &[],
            RequestBody::Multipart(parts) => parts,
        }
    }
}

/// A fully built outbound request.
///
/// Constructed by `RequestBuilder::build` and read through accessors only.
/// Interceptors and authenticators that need a different request derive one
/// with `with_header`; a `Request` handed to the transport never changes.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: HttpMethod,
    pub(crate) url: Url,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<RequestBody>,
}

impl Request {
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Look up a header value, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// This request with `name` set to `value`, replacing any existing header
    /// of that name.
    pub fn with_header(mut self, name: &str, value: &str) -> Request {
        set_header(&mut self.headers, name, value);
        self
    }
}

/// Convert header pairs into a `HeaderMap`, rejecting names or values that
/// are not valid HTTP.
pub(crate) fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, BuildError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let key = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| BuildError::InvalidHeader(name.clone()))?;
        let value = HeaderValue::from_str(value).map_err(|_| BuildError::InvalidHeader(name.clone()))?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Insert or replace a header, keeping the position of an existing entry.
pub(crate) fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Insert a header only if no header of that name exists yet.
pub(crate) fn set_header_if_absent(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if !headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name)) {
        headers.push((name.to_string(), value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request {
            method: HttpMethod::Get,
            url: Url::parse("http://localhost:3000/get").unwrap(),
            headers: vec![("Accept".to_string(), "text/plain".to_string())],
            body: None,
        }
    }

    #[test]
    fn method_names_are_upper_case() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert_eq!(reqwest::Method::from(HttpMethod::Delete), reqwest::Method::DELETE);
    }

    #[test]
    fn content_type_media_types() {
        assert_eq!(ContentType::Json.media_type(), "application/json; charset=utf-8");
        assert_eq!(
            ContentType::Form.media_type(),
            "application/x-www-form-urlencoded; charset=utf-8"
        );
        assert_eq!(ContentType::Multipart.media_type(), "multipart/form-data; charset=utf-8");
    }

    #[test]
    fn header_lookup_ignores_case() {
        assert_eq!(request().header("accept"), Some("text/plain"));
        assert_eq!(request().header("ACCEPT"), Some("text/plain"));
        assert!(request().header("Authorization").is_none());
    }

    #[test]
    fn set_header_replaces_in_place() {
        let mut headers = vec![
            ("x-one".to_string(), "1".to_string()),
            ("x-two".to_string(), "2".to_string()),
        ];
        set_header(&mut headers, "X-One", "uno");
        assert_eq!(
            headers,
            vec![
                ("x-one".to_string(), "uno".to_string()),
                ("x-two".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn set_header_if_absent_keeps_existing_value() {
        let mut headers = vec![("content-type".to_string(), "text/plain".to_string())];
        set_header_if_absent(&mut headers, CONTENT_TYPE, "application/json");
        set_header_if_absent(&mut headers, ACCEPT, "application/json");
        assert_eq!(headers[0].1, "text/plain");
        assert_eq!(headers[1], ("Accept".to_string(), "application/json".to_string()));
    }

    #[test]
    fn header_map_rejects_bad_names() {
        let ok = vec![("X-Trace".to_string(), "abc".to_string())];
        assert_eq!(header_map(&ok).unwrap()["x-trace"], "abc");
        let bad = vec![("bad name".to_string(), "v".to_string())];
        assert!(matches!(header_map(&bad), Err(BuildError::InvalidHeader(name)) if name == "bad name"));
    }

    #[test]
    fn with_header_leaves_original_untouched() {
        let original = request();
        let derived = original.clone().with_header("authorization", "Bearer t");
        assert!(original.header(AUTHORIZATION).is_none());
        assert_eq!(derived.header(AUTHORIZATION), Some("Bearer t"));
        assert_eq!(derived.url(), original.url());
    }
}
