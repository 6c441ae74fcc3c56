use crate::token::TokenStore;
use crate::Error;
use reqwest::header::{HeaderMap, ACCEPT, LOCATION};
use reqwest::{redirect, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1/";

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// A single call against the API, relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    endpoint: String,
    query: Vec<(String, String)>,
    body: Body,
    headers: HeaderMap,
    anonymous: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: Body::Empty,
            headers: HeaderMap::new(),
            anonymous: false,
        }
    }

    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    #[must_use]
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    #[must_use]
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    #[must_use]
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Serializes `body` as the JSON payload.
    ///
    /// # Errors
    /// Returns an error if the body cannot be represented as JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        self.body = Body::Json(serde_json::to_value(body).map_err(Error::Encode)?);
        Ok(self)
    }

    #[must_use]
    pub fn form<K: Into<String>, V: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.body = Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sends the request without the stored bearer token.
    #[must_use]
    pub const fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// Result of a call whose server may answer with a redirect instead of JSON.
#[derive(Debug)]
pub enum Reply<T> {
    Body(T),
    Redirect(Url),
}

/// Outcome of a reachability check against the mood listing.
#[derive(Debug, Clone)]
pub struct ConnectionReport {
    pub url: String,
    pub elapsed: Duration,
    pub outcome: ConnectionOutcome,
}

#[derive(Debug, Clone)]
pub enum ConnectionOutcome {
    Reachable {
        status: u16,
        reason: String,
        items: Option<usize>,
    },
    Rejected {
        status: u16,
        reason: String,
    },
    Unreachable {
        error: String,
    },
}

impl ConnectionReport {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.outcome, ConnectionOutcome::Reachable { .. })
    }
}

/// HTTP transport for the mood API. Cheap to clone; clones share the
/// connection pool and the token store.
///
/// The client only ever reads the token store. Writes go through
/// [`Session`](crate::Session).
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    manual: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.tokens.has())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client against the default local API.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client: Client::new(),
            manual: no_redirect_builder().build().unwrap_or_default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tokens,
        }
    }

    /// Sets the API root. A trailing slash is added when missing.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Applies a total per-request timeout. Without one a slow request simply
    /// waits.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Network)?;
        self.manual = no_redirect_builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Network)?;
        Ok(self)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a bearer token is currently stored. No I/O beyond the store.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.tokens.has()
    }

    pub(crate) fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Absolute URL of `endpoint`, for handing to a browser.
    ///
    /// # Errors
    /// Returns an error if the base URL and endpoint do not form a valid URL.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, Error> {
        let url = format!("{}{}", self.base_url, endpoint);
        Url::parse(&url).map_err(|source| Error::InvalidUrl { url, source })
    }

    /// Sends `request` and decodes the JSON response.
    ///
    /// # Errors
    /// Returns `Network` on transport failure, `HttpStatus` on a non-2xx
    /// response, `Decode` if the body is not the expected JSON.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let response = self.send(&self.client, request).await?;
        decode(response).await
    }

    /// Sends `request` and discards any response body.
    ///
    /// # Errors
    /// Returns `Network` on transport failure or `HttpStatus` on a non-2xx response.
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<(), Error> {
        self.send(&self.client, request).await.map(drop)
    }

    /// Sends `request` without following redirects. A 3xx with a `Location`
    /// header comes back as [`Reply::Redirect`].
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute).
    pub async fn execute_or_redirect<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Reply<T>, Error> {
        let response = self.send(&self.manual, request).await?;
        if response.status().is_redirection() {
            if let Some(target) = redirect_target(&response) {
                debug!(location = %target, "server redirected");
                return Ok(Reply::Redirect(target));
            }
        }
        decode(response).await.map(Reply::Body)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        self.execute(ApiRequest::get(endpoint)).await
    }

    pub(crate) async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(ApiRequest::post(endpoint).json(body)?).await
    }

    pub(crate) async fn put<T, B>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(ApiRequest::put(endpoint).json(body)?).await
    }

    pub(crate) async fn delete(&self, endpoint: &str) -> Result<(), Error> {
        self.execute_empty(ApiRequest::delete(endpoint)).await
    }

    /// Probes the mood listing and reports status, latency and item count.
    /// Never fails; transport problems are part of the report.
    pub async fn check_connection(&self) -> ConnectionReport {
        let url = format!("{}moods", self.base_url);
        let started = Instant::now();
        let result = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await;
        let outcome = match result {
            Ok(response) => {
                let status = response.status();
                let reason = status.canonical_reason().unwrap_or("").to_string();
                if status.is_success() {
                    let items = response
                        .json::<serde_json::Value>()
                        .await
                        .ok()
                        .and_then(|value| value.as_array().map(Vec::len));
                    ConnectionOutcome::Reachable {
                        status: status.as_u16(),
                        reason,
                        items,
                    }
                } else {
                    ConnectionOutcome::Rejected {
                        status: status.as_u16(),
                        reason,
                    }
                }
            }
            Err(err) => ConnectionOutcome::Unreachable {
                error: err.to_string(),
            },
        };
        ConnectionReport {
            url,
            elapsed: started.elapsed(),
            outcome,
        }
    }

    fn build(&self, client: &Client, request: ApiRequest) -> RequestBuilder {
        let mut builder = client
            .request(
                request.method,
                format!("{}{}", self.base_url, request.endpoint),
            )
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.anonymous {
            if let Some(token) = self.tokens.get() {
                builder = builder.bearer_auth(token);
            }
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Form(fields) => builder.form(&fields),
        };
        builder.headers(request.headers)
    }

    async fn send(&self, client: &Client, request: ApiRequest) -> Result<Response, Error> {
        let method = request.method.clone();
        let endpoint = request.endpoint.clone();
        debug!(%method, endpoint = %endpoint, "API request started");

        let response = self
            .build(client, request)
            .send()
            .await
            .map_err(Error::Network)?;
        let status = response.status();
        debug!(%method, endpoint = %endpoint, status = status.as_u16(), "API request finished");

        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }
        Err(error_from_response(status, response).await)
    }
}

fn no_redirect_builder() -> reqwest::ClientBuilder {
    Client::builder().redirect(redirect::Policy::none())
}

fn redirect_target(response: &Response) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    response.url().join(location).ok()
}

async fn error_from_response(status: StatusCode, response: Response) -> Error {
    let body = response.text().await.unwrap_or_default();
    Error::from_status(status, &body)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(status, response).await);
    }
    let bytes = response.bytes().await.map_err(Error::Network)?;
    serde_json::from_slice(&bytes).map_err(Error::Decode)
}
