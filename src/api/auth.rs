use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::auth::TokenPair;
use crate::error::{ClientError, SESSION_EXPIRED_MESSAGE};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub organization_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// A workspace the user belongs to, offered when they have several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantChoice {
    #[serde(alias = "tenant_schema", alias = "schema_name")]
    pub schema: String,
    #[serde(alias = "tenant_name")]
    pub name: String,
    #[serde(alias = "tenant_domain")]
    pub domain: String,
}

/// Tokens plus tenant routing info, as returned by login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub tenant_schema: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub tenant_domain: Option<String>,
    #[serde(default)]
    pub multiple_tenants: bool,
    #[serde(default)]
    pub tenants: Vec<TenantChoice>,
}

impl LoginResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair::new(self.access.clone(), self.refresh.clone().filter(|r| !r.is_empty()))
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

impl ApiClient {
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        tracing::info!(email = %request.email, "signing in");
        self.public(Method::POST, "/api/auth/login/", request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<LoginResponse, ClientError> {
        if request.password != request.password_confirm {
            let mut field_errors = std::collections::BTreeMap::new();
            field_errors.insert(
                "password_confirm".to_string(),
                "Passwords do not match".to_string(),
            );
            return Err(ClientError::Validation {
                message: "Passwords do not match".to_string(),
                field_errors,
            });
        }

        tracing::info!(organization = %request.organization_name, "registering organization");
        self.public(Method::POST, "/api/auth/register/", request).await
    }

    /// Exchanges the stored refresh token for a new pair and stores it. A
    /// response without a new refresh token keeps the current one.
    pub async fn refresh(&self) -> Result<TokenPair, ClientError> {
        let refresh = self
            .tokens
            .get_refresh()
            .ok_or_else(|| ClientError::Unauthorized(SESSION_EXPIRED_MESSAGE.to_string()))?;

        let response: RefreshResponse = self
            .public(Method::POST, "/api/auth/token/refresh/", &RefreshRequest { refresh: &refresh })
            .await?;

        let pair = TokenPair::new(response.access, response.refresh.or(Some(refresh)));
        self.tokens.store(&pair)?;
        tracing::debug!("access token refreshed");
        Ok(pair)
    }
}
