//! Backend client used by the pages around the core: sign-in, registration,
//! endpoint management and checkout.

pub mod auth;
pub mod billing;
pub mod endpoints;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::TokenStore;
use crate::config::ApiConfig;
use crate::error::{ClientError, SESSION_EXPIRED_MESSAGE};
use crate::guard::SIGN_IN_MESSAGE;

pub use auth::{LoginRequest, LoginResponse, RegisterRequest, TenantChoice};
pub use billing::CheckoutSession;
pub use endpoints::{Endpoint, NewEndpoint};

/// DRF-style list: either a bare array or a page with `results`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Page { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> ListResponse<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Page { results } => results,
            ListResponse::Plain(items) => items,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match body {
            Some(body) => builder.json(body),
            None => builder,
        }
    }

    /// Unauthenticated call, e.g. login or registration.
    async fn public<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(method, path, Some(body)).send().await?;
        decode(response).await
    }

    /// Sends with the stored access token. A 401 triggers one refresh and
    /// one retry; if either fails the token store is cleared.
    async fn authorized<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ClientError> {
        let access = self
            .tokens
            .get_access()
            .ok_or_else(|| ClientError::Unauthorized(SIGN_IN_MESSAGE.to_string()))?;

        let response = self
            .request(method.clone(), path, body)
            .bearer_auth(&access)
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(%path, "access token rejected, attempting refresh");
        let refreshed = match self.refresh().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, signing out");
                self.tokens.clear()?;
                return Err(ClientError::Unauthorized(SESSION_EXPIRED_MESSAGE.to_string()));
            }
        };

        let retry = self
            .request(method, path, body)
            .bearer_auth(&refreshed.access)
            .send()
            .await?;

        if retry.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(%path, "refreshed token rejected, signing out");
            self.tokens.clear()?;
            return Err(ClientError::Unauthorized(SESSION_EXPIRED_MESSAGE.to_string()));
        }

        Ok(retry)
    }

    async fn authorized_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.authorized(method, path, body).await?;
        decode(response).await
    }
}

async fn error_from(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    ClientError::from_response(status, &body)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

async fn expect_success(response: Response) -> Result<(), ClientError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from(response).await)
    }
}
