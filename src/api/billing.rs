use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::error::ClientError;

/// Hosted checkout page at the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    #[serde(alias = "url")]
    pub checkout_url: String,
    #[serde(default, alias = "id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    plan: &'a str,
}

impl ApiClient {
    /// Asks the backend for a checkout session; the visitor is then sent to
    /// `checkout_url` and comes back on `/billing/success` or `/billing/cancel`.
    pub async fn create_checkout_session(
        &self,
        plan: &str,
    ) -> Result<CheckoutSession, ClientError> {
        let session: CheckoutSession = self
            .authorized_json(
                Method::POST,
                "/api/billing/create-checkout-session/",
                Some(&CheckoutRequest { plan }),
            )
            .await?;

        if url::Url::parse(&session.checkout_url).is_err() {
            return Err(ClientError::InvalidResponse(format!(
                "checkout URL is not absolute: {}",
                session.checkout_url
            )));
        }

        tracing::info!(%plan, "checkout session created");
        Ok(session)
    }
}
