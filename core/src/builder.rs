//! Fluent builder for `Request`.
//!
//! # Design
//! Setters consume and return the builder so a whole request reads as one
//! chain. Steps that can fail (`url`, `body`, `build`) return `Result` and
//! chain with `?`; the rest are infallible. Nothing here touches the network.

use std::path::PathBuf;

use url::Url;

use crate::body::{self, Fields};
use crate::error::BuildError;
use crate::http::{
    header_map, set_header, set_header_if_absent, ContentType, HttpMethod, Request, RequestBody,
    ACCEPT, CONTENT_TYPE,
};

#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: HttpMethod,
    url: Option<Url>,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `path` against `base` and append `query` in the given order.
    ///
    /// `path` is split on `/` and each segment percent-encoded, so a leading
    /// slash is optional. An empty trailing segment on the base (`.../api/`)
    /// is replaced rather than kept.
    pub fn url<I, K, V>(mut self, base: &str, path: &str, query: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = Url::parse(base)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BuildError::CannotBeABase(base.to_string()))?;
            segments.pop_if_empty();
            let path = path.trim_start_matches('/');
            if !path.is_empty() {
                segments.extend(path.split('/'));
            }
        }

        let mut query = query.into_iter().peekable();
        if query.peek().is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key.as_ref(), value.as_ref());
            }
        }

        self.url = Some(url);
        Ok(self)
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Merge caller headers. A later header replaces an earlier one with the
    /// same (case-insensitive) name.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in headers {
            set_header(&mut self.headers, name.as_ref(), value.as_ref());
        }
        self
    }

    /// Choose and encode the body, and default `Content-Type` / `Accept` to
    /// `content_type`'s media type where the caller has not set them.
    ///
    /// Fields and files together give a combined multipart body, files alone
    /// a multipart body of file parts, fields alone a JSON body, and neither
    /// no body at all.
    pub fn body(
        mut self,
        content_type: ContentType,
        fields: &Fields,
        files: &[(String, PathBuf)],
    ) -> Result<Self, BuildError> {
        set_header_if_absent(&mut self.headers, CONTENT_TYPE, content_type.media_type());
        set_header_if_absent(&mut self.headers, ACCEPT, content_type.media_type());

        self.body = match (fields.is_empty(), files.is_empty()) {
            (false, false) => Some(body::encode_combined(fields, files)),
            (true, false) => Some(body::encode_files(files)),
            (false, true) => Some(body::encode_json(content_type, fields)?),
            (true, true) => None,
        };
        Ok(self)
    }

    pub fn build(self) -> Result<Request, BuildError> {
        let url = self.url.ok_or(BuildError::MissingUrl)?;
        header_map(&self.headers)?;
        Ok(Request {
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
        })
    }
}
