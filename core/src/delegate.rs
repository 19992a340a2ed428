//! The request delegate: one typed call in, one discriminated result out.
//!
//! # Design
//! `NetworkDelegate` holds a shared `reqwest::Client` (connection pool,
//! cookie store, timeouts) plus the hooks installed at construction. It keeps
//! no per-call state; `execute` builds a fresh `Request` every time, so a
//! delegate can be cloned and driven from many tasks at once.
//!
//! `execute` never returns `Err` and never panics on bad input: every
//! failure, from an unparsable base URL to a body that does not decode, is
//! folded into `NetworkResponse::Error`. Dropping the returned future cancels
//! the in-flight call and lets the pool reclaim the connection.
//!
//! Decoding happens on the task that awaited the response.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::CookieStore;
use reqwest::header::{self, HeaderValue};
use reqwest::multipart::{self, Form};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::body::{self, Fields};
use crate::builder::RequestBuilder;
use crate::config::ClientConfig;
use crate::error::{BuildError, ConfigError, NetworkError, TransportError};
use crate::http::{header_map, ContentType, HttpMethod, Part, Request, RequestBody};
use crate::intercept::{Authenticator, Interceptor, LoggingInterceptor};
use crate::response::NetworkResponse;

/// Parameters of one call. Everything but `path` has a default: GET, JSON,
/// no headers, no query, no body.
#[derive(Debug, Clone, Default)]
pub struct Call {
    pub path: String,
    pub method: HttpMethod,
    pub content_type: ContentType,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub fields: Fields,
    pub files: Vec<(String, PathBuf)>,
}

impl Call {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            ..Self::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a body field. Re-adding a name replaces its value in place.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.push((name.into(), path.into()));
        self
    }
}

/// Typed HTTP façade over a shared `reqwest::Client`.
#[derive(Clone)]
pub struct NetworkDelegate {
    base_url: String,
    client: reqwest::Client,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    authenticator: Option<Arc<dyn Authenticator>>,
    call_timeout: Option<Duration>,
}

impl fmt::Debug for NetworkDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkDelegate")
            .field("base_url", &self.base_url)
            .field("interceptors", &self.interceptors.len())
            .field("authenticator", &self.authenticator.is_some())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl NetworkDelegate {
    /// A delegate with default configuration and no hooks besides request
    /// logging.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Self::builder(base_url).build()
    }

    pub fn builder(base_url: &str) -> DelegateBuilder {
        DelegateBuilder::new(base_url)
    }

    /// A delegate that reuses an existing client and its connection pool.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self, ConfigError> {
        Self::builder(base_url).client(client).build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying client, for sharing with other delegates.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Build, send and decode one call.
    ///
    /// A 2xx body decodes as `T`. Any other status tries `E` first and
    /// reports `CustomServerError(code)` with the decoded body, falling back
    /// to the status classification without a body.
    pub async fn execute<T, E>(&self, call: Call) -> NetworkResponse<T, E>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        let request = match self.build_request(&call) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(path = %call.path, error = %err, "failed to build request");
                return NetworkResponse::error(TransportError::from(err));
            }
        };
        let request = self
            .interceptors
            .iter()
            .fold(request, |request, interceptor| interceptor.before_send(request));

        match self.send(request).await {
            Ok((request, response)) => self.read_response(&request, response).await,
            Err(err) => {
                tracing::debug!(path = %call.path, error = %err, "transport failure");
                NetworkResponse::error(err)
            }
        }
    }

    pub fn build_request(&self, call: &Call) -> Result<Request, BuildError> {
        RequestBuilder::new()
            .url(&self.base_url, &call.path, call.query.iter().map(|(k, v)| (k, v)))?
            .method(call.method)
            .headers(call.headers.iter().map(|(k, v)| (k, v)))
            .body(call.content_type, &call.fields, &call.files)?
            .build()
    }

    /// Send `request`, giving the authenticator one chance to answer a 401.
    async fn send(&self, request: Request) -> Result<(Request, reqwest::Response), TransportError> {
        let response = self.dispatch(&request).await?;
        self.notify(&request, &response);

        let status = response.status().as_u16();
        if status != 401 {
            return Ok((request, response));
        }
        let Some(retry) = self
            .authenticator
            .as_ref()
            .and_then(|auth| auth.authenticate(&request, status))
        else {
            return Ok((request, response));
        };

        // Read the rejected body to the end so its connection goes back to the pool.
        let _ = response.bytes().await;
        tracing::debug!(url = %retry.url(), "resending with credentials");
        let response = self.dispatch(&retry).await?;
        self.notify(&retry, &response);
        Ok((retry, response))
    }

    async fn dispatch(&self, request: &Request) -> Result<reqwest::Response, TransportError> {
        let mut headers = header_map(request.headers())?;
        let mut builder = self
            .client
            .request(request.method().into(), request.url().clone());
        if let Some(timeout) = self.call_timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body() {
            None => builder.headers(headers),
            Some(RequestBody::Json { media_type, bytes }) => {
                if !headers.contains_key(header::CONTENT_TYPE) {
                    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(*media_type));
                }
                builder.headers(headers).body(bytes.clone())
            }
            Some(RequestBody::Multipart(parts)) => {
                // The form supplies its own Content-Type carrying the boundary.
                headers.remove(header::CONTENT_TYPE);
                builder.headers(headers).multipart(multipart_form(parts).await?)
            }
        };

        Ok(builder.send().await?)
    }

    fn notify(&self, request: &Request, response: &reqwest::Response) {
        for interceptor in self.interceptors.iter() {
            interceptor.after_receive(request, response.status().as_u16(), response.headers());
        }
    }

    async fn read_response<T, E>(
        &self,
        request: &Request,
        response: reqwest::Response,
    ) -> NetworkResponse<T, E>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        let status = response.status();
        let code = status.as_u16();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return NetworkResponse::error(TransportError::from(err)),
        };

        if !status.is_success() {
            return match body::decode::<E>(&bytes) {
                Ok(detail) => NetworkResponse::Error {
                    kind: NetworkError::CustomServerError(code),
                    detail: Some(detail),
                },
                Err(err) => {
                    tracing::warn!(url = %request.url(), status = code, error = %err, "error body did not decode");
                    NetworkResponse::error(NetworkError::from_status(code))
                }
            };
        }

        if bytes.is_empty() {
            return NetworkResponse::error(TransportError::EmptyBody);
        }

        match body::decode::<T>(&bytes) {
            Ok(data) => NetworkResponse::Success(data),
            Err(err) => {
                tracing::warn!(url = %request.url(), status = code, error = %err, "response body did not decode");
                NetworkResponse::error(TransportError::Decode(err))
            }
        }
    }
}

async fn multipart_form(parts: &[Part]) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            Part::Text { name, value } => form.text(name.clone(), value.clone()),
            Part::File {
                name,
                filename,
                media_type,
                path,
            } => {
                let contents = tokio::fs::read(path)
                    .await
                    .map_err(|source| TransportError::File {
                        path: path.clone(),
                        source,
                    })?;
                let file = multipart::Part::bytes(contents)
                    .file_name(filename.clone())
                    .mime_str(media_type)?;
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}

/// Configures and builds a `NetworkDelegate`.
pub struct DelegateBuilder {
    base_url: String,
    config: ClientConfig,
    http: reqwest::ClientBuilder,
    has_cookie_store: bool,
    client: Option<reqwest::Client>,
    authenticator: Option<Arc<dyn Authenticator>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl DelegateBuilder {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            config: ClientConfig::default(),
            http: reqwest::Client::builder(),
            has_cookie_store: false,
            client: None,
            authenticator: None,
            interceptors: Vec::new(),
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Persist cookies across calls in `store`.
    pub fn cookie_store<C: CookieStore + 'static>(mut self, store: Arc<C>) -> Self {
        self.http = self.http.cookie_provider(store);
        self.has_cookie_store = true;
        self
    }

    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Append an interceptor. Interceptors run in the order they were added,
    /// after the built-in logger.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Use an existing client instead of building one. Timeouts and user
    /// agent from the config are then the client's own; the call timeout
    /// still applies.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<NetworkDelegate, ConfigError> {
        self.config.validate()?;

        let client = match self.client {
            Some(_) if self.has_cookie_store => {
                return Err(ConfigError::Invalid(
                    "a cookie store cannot be added to a shared client".into(),
                ));
            }
            Some(client) => client,
            None => self
                .http
                .connect_timeout(self.config.connect_timeout())
                .read_timeout(self.config.read_timeout())
                .user_agent(self.config.user_agent.clone())
                .build()?,
        };

        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::with_capacity(self.interceptors.len() + 1);
        if self.config.log_requests {
            interceptors.push(Arc::new(LoggingInterceptor));
        }
        interceptors.extend(self.interceptors);

        tracing::debug!(
            base_url = %self.base_url,
            interceptors = interceptors.len(),
            authenticator = self.authenticator.is_some(),
            "delegate ready"
        );

        Ok(NetworkDelegate {
            base_url: self.base_url,
            client,
            interceptors: interceptors.into(),
            authenticator: self.authenticator,
            call_timeout: self.config.call_timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::{ACCEPT, CONTENT_TYPE};
    use crate::intercept::BearerAuthenticator;

    fn delegate() -> NetworkDelegate {
        NetworkDelegate::new("http://localhost:3000").unwrap()
    }

    #[test]
    fn call_defaults_to_get_json() {
        let call = Call::default();
        assert_eq!(call.method, HttpMethod::Get);
        assert_eq!(call.content_type, ContentType::Json);
        assert!(call.headers.is_empty() && call.query.is_empty());
        assert!(call.fields.is_empty() && call.files.is_empty());
    }

    #[test]
    fn call_setters_accumulate() {
        let call = Call::post("/post")
            .header("X-A", "1")
            .query("page", "2")
            .field("id", 1)
            .field("id", 2)
            .field("name", "lamp")
            .file("photo", "/tmp/photo.jpg");
        assert_eq!(call.method, HttpMethod::Post);
        assert_eq!(call.headers, vec![("X-A".to_string(), "1".to_string())]);
        assert_eq!(call.query, vec![("page".to_string(), "2".to_string())]);
        assert_eq!(Value::Object(call.fields), json!({"id": 2, "name": "lamp"}));
        assert_eq!(call.files, vec![("photo".to_string(), PathBuf::from("/tmp/photo.jpg"))]);
    }

    #[test]
    fn build_request_applies_every_parameter() {
        let call = Call::put("/items/7")
            .query("dry_run", "true")
            .header("Authorization", "your token")
            .field("title", "new");
        let request = delegate().build_request(&call).unwrap();
        assert_eq!(request.method(), HttpMethod::Put);
        assert_eq!(request.url().as_str(), "http://localhost:3000/items/7?dry_run=true");
        assert_eq!(request.header("authorization"), Some("your token"));
        assert_eq!(request.header(CONTENT_TYPE), Some("application/json; charset=utf-8"));
        assert_eq!(request.header(ACCEPT), Some("application/json; charset=utf-8"));
        assert_eq!(request.body().and_then(RequestBody::as_json), Some(&br#"{"title":"new"}"#[..]));
    }

    #[test]
    fn build_request_reports_bad_base_url() {
        let delegate = NetworkDelegate::new("::not a url::").unwrap();
        let err = delegate.build_request(&Call::get("/get")).unwrap_err();
        assert!(matches!(err, BuildError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn execute_folds_build_failure_into_transport_error() {
        let delegate = NetworkDelegate::new("::not a url::").unwrap();
        let resp: NetworkResponse<Value, Value> = delegate.execute(Call::get("/get")).await;
        assert!(matches!(
            resp,
            NetworkResponse::Error {
                kind: NetworkError::Transport(TransportError::Build(BuildError::InvalidUrl(_))),
                detail: None,
            }
        ));
    }

    #[test]
    fn logging_interceptor_follows_config() {
        let with_log = NetworkDelegate::builder("http://localhost:3000").build().unwrap();
        assert_eq!(with_log.interceptors.len(), 1);

        let config = ClientConfig {
            log_requests: false,
            ..ClientConfig::default()
        };
        let without = NetworkDelegate::builder("http://localhost:3000")
            .config(config)
            .interceptor(LoggingInterceptor)
            .authenticator(BearerAuthenticator::new("t"))
            .build()
            .unwrap();
        assert_eq!(without.interceptors.len(), 1);
        assert!(without.authenticator.is_some());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ClientConfig {
            connect_timeout_secs: 0,
            ..ClientConfig::default()
        };
        let err = NetworkDelegate::builder("http://localhost:3000").config(config).build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn cookie_store_conflicts_with_shared_client() {
        let err = NetworkDelegate::builder("http://localhost:3000")
            .cookie_store(Arc::new(reqwest::cookie::Jar::default()))
            .client(reqwest::Client::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn clones_share_configuration() {
        let delegate = delegate();
        let clone = delegate.clone();
        assert_eq!(clone.base_url(), delegate.base_url());
        assert_eq!(clone.interceptors.len(), delegate.interceptors.len());
    }
}
