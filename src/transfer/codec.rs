// Wire format: `#session=<base64(JSON)>&source=<tag>`

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use super::TransferError;

pub const SESSION_KEY: &str = "session";
pub const SOURCE_KEY: &str = "source";

/// Where in the product the transfer was started. Observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferSource {
    LoginPage,
    TenantSelector,
    HomepageDemo,
}

impl TransferSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferSource::LoginPage => "login_page",
            TransferSource::TenantSelector => "tenant_selector",
            TransferSource::HomepageDemo => "homepage_demo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "login_page" => Some(TransferSource::LoginPage),
            "tenant_selector" => Some(TransferSource::TenantSelector),
            "homepage_demo" => Some(TransferSource::HomepageDemo),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransferSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials and tenant routing info carried across an origin change.
/// Only ever exists inside a URL fragment; never written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub access: String,
    pub refresh: Option<String>,
    pub tenant_schema: Option<String>,
    pub tenant_name: Option<String>,
    pub username: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub source: TransferSource,
}

/// Lenient decode target; required fields are checked after parsing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IncomingPayload {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default, alias = "tenant_schema")]
    pub tenant_schema: Option<String>,
    #[serde(default, alias = "tenant_name")]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "issued_at")]
    pub issued_at: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Key/value pairs found in a URL fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferFragment {
    pub session: Option<String>,
    pub source: Option<String>,
}

impl TransferFragment {
    /// Accepts the fragment with or without its leading `#`.
    pub fn parse(fragment: &str) -> Self {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let mut parsed = TransferFragment::default();

        for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
            match key.as_ref() {
                SESSION_KEY if parsed.session.is_none() => {
                    parsed.session = Some(value.into_owned())
                }
                SOURCE_KEY if parsed.source.is_none() => parsed.source = Some(value.into_owned()),
                _ => {}
            }
        }

        parsed
    }
}

pub fn encode_fragment(payload: &TransferPayload) -> Result<String, TransferError> {
    let json = serde_json::to_vec(payload).map_err(|e| TransferError::InvalidJson(e.to_string()))?;
    let session = URL_SAFE_NO_PAD.encode(json);

    Ok(form_urlencoded::Serializer::new(String::new())
        .append_pair(SESSION_KEY, &session)
        .append_pair(SOURCE_KEY, payload.source.as_str())
        .finish())
}

/// Accepts standard or URL-safe alphabets, with or without padding. Form
/// decoding turns a literal `+` into a space, so spaces are mapped back.
pub(crate) fn decode_session(encoded: &str) -> Result<IncomingPayload, TransferError> {
    let normalized: String = encoded
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let normalized = normalized.trim_end_matches('=');

    let bytes = STANDARD_NO_PAD
        .decode(normalized)
        .map_err(|e| TransferError::InvalidEncoding(e.to_string()))?;

    // serde_json messages can quote the offending value, so only its
    // position is kept
    serde_json::from_slice(&bytes).map_err(|e| {
        TransferError::InvalidJson(format!(
            "{:?} error at line {} column {}",
            e.classify(),
            e.line(),
            e.column()
        ))
    })
}
