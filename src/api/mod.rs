//! Authenticated TradeMicro API client
//!
//! Owns the bearer-token session: attaches it to every authenticated call,
//! persists it through a [`TokenStore`] and drops it when the server answers
//! 401. Resource-specific calls live in [`crate::services`].

pub mod types;

use crate::config::ClientConfig;
use crate::error::{AppError, Result};
use crate::state::{Session, SessionState, SessionStatus};
use crate::store::{TokenStore, TOKEN_KEY};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use types::{CountResponse, LoginRequest, LoginResponse};
use url::Url;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Remote API resource, used for routing and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Login,
    User,
    Health,
    Symbols,
    Trades,
    BrokerTokens,
    Tasks,
    FamilyMembers,
}

impl Resource {
    /// Path segment under the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Login => "login",
            Resource::User => "user",
            Resource::Health => "health",
            Resource::Symbols => "symbols",
            Resource::Trades => "trades",
            Resource::BrokerTokens => "broker-tokens",
            Resource::Tasks => "tasks",
            Resource::FamilyMembers => "family-members",
        }
    }

    /// Path of the resource itself, e.g. `/tasks`
    pub fn route(&self) -> ApiPath {
        ApiPath::new(self.path())
    }

    /// Path of one record, e.g. `/tasks/:id`
    pub fn item(&self, id: impl fmt::Display) -> ApiPath {
        self.route().join(id.to_string())
    }
}

/// Request path below the API base URL.
///
/// Segments are kept raw and percent-encoded one by one when the URL is
/// built, so an id can never add segments or a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPath {
    segments: Vec<String>,
}

impl ApiPath {
    pub fn new(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    pub fn join(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl From<Resource> for ApiPath {
    fn from(resource: Resource) -> Self {
        resource.route()
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Method, JSON body and query of one authenticated request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

/// TradeMicro API client.
///
/// Cheap to clone; clones share the HTTP connection pool, the session and
/// the token store.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Arc<SessionState>,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a client and restore any persisted session
    pub fn new(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        Self::with_session(config, store, Arc::new(SessionState::new()))
    }

    /// Create a client around an existing session holder
    pub fn with_session(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
        session: Arc<SessionState>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if config.no_proxy {
            builder = builder.no_proxy();
        }

        let client = Self {
            http: builder.build()?,
            base_url: parse_base_url(&config.base_url)?,
            session,
            store,
        };

        client.restore_session();
        Ok(client)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Adopt the token persisted by a previous run, if any
    pub fn restore_session(&self) -> bool {
        if self.session.is_authenticated() {
            return true;
        }

        match self.store.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => {
                self.session.begin(Session::new(token));
                info!("Restored session from {} store", self.store.name());
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!("Failed to read persisted session, starting logged out: {}", e);
                false
            }
        }
    }

    // ========== Session ==========

    /// Log in with username and password
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        info!("Login attempt for user: {}", username);

        let url = self.endpoint(&Resource::Login.route())?;
        let response = self
            .http
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Login for {} rejected with status {}", username, status);
            return Err(AppError::Auth {
                status: status.as_u16(),
            });
        }

        let body: LoginResponse = decode_json(response).await?;
        let token = body
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or(AppError::Auth {
                status: status.as_u16(),
            })?;

        let session = Session::new(token);
        self.session.begin(session.clone());

        if let Err(e) = self.store.set(TOKEN_KEY, &session.token) {
            warn!("Failed to persist session token: {}", e);
        }

        info!("User {} logged in successfully", username);
        Ok(session)
    }

    /// Drop the session in memory and in the store. Safe to call repeatedly.
    ///
    /// A store that cannot be cleared is logged and otherwise ignored; the
    /// in-memory session is gone either way.
    pub fn logout(&self) {
        if self.session.end() {
            info!("User logout");
        } else {
            debug!("Logout without an active session");
        }

        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!("Failed to clear persisted session token: {}", e);
        }
    }

    fn expire_session(&self, token: &str) {
        if self.session.end_if_current(token) {
            warn!("Session expired, login required");
            if let Err(e) = self.store.remove(TOKEN_KEY) {
                warn!("Failed to clear persisted session token: {}", e);
            }
        } else {
            debug!("Rejected token was already replaced, keeping current session");
        }
    }

    // ========== Requests ==========

    /// Send a request carrying the current bearer token.
    ///
    /// Fails with `NotAuthenticated` before any I/O when no session is held.
    /// A 401 ends the session and fails with `SessionExpired`; every other
    /// status is left to the caller.
    pub async fn authenticated_request(
        &self,
        path: &ApiPath,
        options: RequestOptions,
    ) -> Result<Response> {
        let token = self.session.token().ok_or(AppError::NotAuthenticated)?;

        let mut url = self.endpoint(path)?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(options.query.iter());
        }

        let request_id = Uuid::new_v4().to_string();
        debug!(
            method = %options.method,
            url = %url,
            request_id = %request_id,
            "Sending authenticated request"
        );

        let mut request = self
            .http
            .request(options.method, url)
            .bearer_auth(&token)
            .header(REQUEST_ID_HEADER, request_id.as_str());
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.expire_session(&token);
            return Err(AppError::SessionExpired);
        }

        Ok(response)
    }

    /// Authenticated request with a JSON response
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        resource: Resource,
        path: &ApiPath,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.authenticated_request(path, options).await?;
        let response = ensure_success(resource, response)?;
        decode_json(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, resource: Resource, path: &ApiPath) -> Result<T> {
        self.request_json(resource, path, RequestOptions::get()).await
    }

    pub async fn post_json<T, B>(&self, resource: Resource, path: &ApiPath, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request_json(resource, path, RequestOptions::post().with_json(body)?)
            .await
    }

    pub async fn put_json<T, B>(&self, resource: Resource, path: &ApiPath, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request_json(resource, path, RequestOptions::put().with_json(body)?)
            .await
    }

    /// Authenticated DELETE; any response body is ignored
    pub async fn delete(&self, resource: Resource, path: &ApiPath) -> Result<()> {
        let response = self
            .authenticated_request(path, RequestOptions::delete())
            .await?;
        ensure_success(resource, response)?;
        Ok(())
    }

    /// Record count of a collection, `GET /<resource>?count=true`
    pub async fn count(&self, resource: Resource) -> Result<u64> {
        let options = RequestOptions::get().with_query("count", "true");
        let body: CountResponse = self.request_json(resource, &resource.route(), options).await?;
        Ok(body.count)
    }

    /// Unauthenticated GET for public endpoints
    pub async fn get_public_json<T: DeserializeOwned>(
        &self,
        resource: Resource,
        path: &ApiPath,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "Sending public request");

        let response = self.http.get(url).send().await?;
        let response = ensure_success(resource, response)?;
        decode_json(response).await
    }

    /// Absolute URL of `path`, each segment percent-encoded
    fn endpoint(&self, path: &ApiPath) -> Result<Url> {
        // Url drops "." and ".." when pushed, which would change the target
        if path
            .segments()
            .iter()
            .any(|s| matches!(s.trim(), "" | "." | ".."))
        {
            return Err(AppError::Validation(format!(
                "Invalid request path '{}'",
                path
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("Invalid base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(path.segments());
        Ok(url)
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| AppError::Config(format!("Invalid base URL '{}': {}", raw, e)))?;

    if url.cannot_be_a_base() {
        return Err(AppError::Config(format!("Invalid base URL '{}'", raw)));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn ensure_success(resource: Resource, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        warn!("Request for {} failed with status {}", resource, status);
        Err(AppError::RequestFailed {
            resource,
            status: status.as_u16(),
        })
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;

    // Empty success bodies (204, bare 200) read as null
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }

    Ok(serde_json::from_slice(&bytes)?)
}
