//! reqwest request layer.
//!
//! ERROR HANDLING
//! ==============
//! Responses are classified once by [`lendgate::classify_response`]. The
//! authenticated path applies the same global 401 policy as the browser:
//! the persisted session is cleared and the error still returned.

use std::time::Duration;

use async_trait::async_trait;
use lendgate::clock::Clock;
use lendgate::endpoints::{Endpoint, Method};
use lendgate::envelope::{authorization_header, handle_unauthorized};
use lendgate::revalidate::Revalidator;
use lendgate::session::SessionStore;
use lendgate::{ApiConfig, ApiError, SessionStorage};
use serde_json::Value;

pub struct HttpClient {
    client: reqwest::Client,
    api: ApiConfig,
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns the reqwest builder error when TLS setup fails.
    pub fn new(api: ApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()?;
        Ok(Self { client, api })
    }

    /// One request, no session side effects.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; connection failures and timeouts map to
    /// [`ApiError::Transport`].
    pub async fn send(
        &self,
        endpoint: &Endpoint,
        authorization: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.api.url(&endpoint.path);
        tracing::debug!(method = %endpoint.method, %url, "sending request");

        let mut request = self.client.request(reqwest_method(endpoint.method), &url);
        if let Some(value) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, value);
        }
        if let Some(json) = body {
            request = request.json(json);
        }

        let response = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        lendgate::classify_response(status, &text)
    }

    /// Authenticated request; a 401 clears the stored session.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from [`Self::send`].
    pub async fn request<S: SessionStorage, C: Clock>(
        &self,
        store: &mut SessionStore<S, C>,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let authorization = authorization_header(store);
        let result = self.send(endpoint, authorization.as_deref(), body).await;
        if let Err(e) = &result {
            if e.is_unauthorized() {
                handle_unauthorized(store, "/");
            }
        }
        result
    }
}

/// Server-side session check for `lendgate::revalidate`.
pub struct SessionProbe<'a> {
    http: &'a HttpClient,
    endpoint: Endpoint,
    authorization: Option<String>,
}

impl<'a> SessionProbe<'a> {
    pub fn new(http: &'a HttpClient, endpoint: Endpoint, authorization: Option<String>) -> Self {
        Self { http, endpoint, authorization }
    }
}

#[async_trait(?Send)]
impl Revalidator for SessionProbe<'_> {
    async fn validate(&self) -> Result<(), ApiError> {
        self.http
            .send(&self.endpoint, self.authorization.as_deref(), None)
            .await
            .map(|_| ())
    }
}
