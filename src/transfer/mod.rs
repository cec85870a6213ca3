//! Cross-subdomain session transfer.
//!
//! A session issued on the public domain is moved to a tenant subdomain by
//! navigating to `{tenant-origin}/login#session=...`. The receiving page
//! decodes the fragment once, stores the tokens and erases the fragment.

pub mod codec;

use chrono::{DateTime, Utc};
use url::{Host, Url};
use uuid::Uuid;

use crate::auth::TokenPair;
use crate::browser::{Location, Navigator};

pub use codec::{encode_fragment, TransferFragment, TransferPayload, TransferSource};

pub const TRANSFER_FAILED_MESSAGE: &str =
    "Your session could not be transferred. Please sign in again.";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("Session payload is not valid base64: {0}")]
    InvalidEncoding(String),
    #[error("Session payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Session payload has no access token")]
    MissingAccessToken,
}

impl TransferError {
    /// What the visitor is told; details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        TRANSFER_FAILED_MESSAGE
    }
}

/// Everything needed to hand a freshly issued session to a tenant origin.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub tokens: TokenPair,
    /// Bare `host[:port]` or a full URL.
    pub tenant_domain: String,
    pub tenant_schema: Option<String>,
    pub tenant_name: Option<String>,
    pub username: Option<String>,
    pub source: TransferSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Destination {
    host: String,
    port: Option<u16>,
}

fn parse_destination(domain: &str) -> Option<Destination> {
    let domain = domain.trim();
    if domain.is_empty() {
        return None;
    }

    if domain.contains("://") {
        match Url::parse(domain) {
            Ok(url) => {
                if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
                    return Some(Destination {
                        host: host.to_ascii_lowercase(),
                        port: url.port(),
                    });
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "tenant domain is not a URL, splitting host:port")
            }
        }
    }

    let without_scheme = domain.split_once("://").map_or(domain, |(_, rest)| rest);
    let bare = without_scheme.split('/').next().unwrap_or_default();
    let (host, port) = match bare.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (bare, None),
    };

    if host.is_empty() {
        return None;
    }

    let port = match port.map(str::trim) {
        None | Some("") => None,
        Some(p) => Some(p.parse::<u16>().ok()?),
    };

    // Must be a host a URL can carry, e.g. no spaces
    let host = match Host::parse(host) {
        Ok(host) => host.to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "tenant domain has an invalid host");
            return None;
        }
    };

    Some(Destination {
        host: host.to_ascii_lowercase(),
        port,
    })
}

fn default_port(protocol: &str) -> Option<u16> {
    match protocol {
        "http:" => Some(80),
        "https:" => Some(443),
        _ => None,
    }
}

/// Origin a transfer to `tenant_domain` would land on, using the current
/// protocol and, when the domain names none, the current port.
pub fn destination_origin(current: &Location, tenant_domain: &str) -> Option<String> {
    let destination = parse_destination(tenant_domain)?;
    let port = destination.port.or(current.port);

    Some(match port {
        Some(p) if Some(p) != default_port(&current.protocol) => {
            format!("{}//{}:{}", current.protocol, destination.host, p)
        }
        _ => format!("{}//{}", current.protocol, destination.host),
    })
}

/// Navigates to the tenant origin with the session in the fragment.
///
/// Returns `false` without navigating when the destination is unparseable
/// or is the current origin; the caller then routes in-app instead.
pub fn initiate_transfer(navigator: &mut dyn Navigator, request: &TransferRequest) -> bool {
    if request.tokens.access.is_empty() {
        tracing::warn!(
            source = %request.source,
            "refusing to transfer a session without an access token"
        );
        return false;
    }

    let current_origin = navigator.location().origin();
    let Some(origin) = destination_origin(navigator.location(), &request.tenant_domain) else {
        tracing::warn!(
            source = %request.source,
            domain = %request.tenant_domain,
            "unparseable tenant domain, staying on current origin"
        );
        return false;
    };

    if origin == current_origin {
        tracing::debug!(
            source = %request.source,
            %origin,
            "tenant is on the current origin, no transfer needed"
        );
        return false;
    }

    let payload = TransferPayload {
        access: request.tokens.access.clone(),
        refresh: request.tokens.refresh.clone(),
        tenant_schema: request.tenant_schema.clone(),
        tenant_name: request.tenant_name.clone(),
        username: request.username.clone(),
        issued_at: Utc::now(),
        source: request.source,
    };

    let fragment = match encode_fragment(&payload) {
        Ok(fragment) => fragment,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode session transfer");
            return false;
        }
    };

    let target = format!("{origin}/login#{fragment}");
    match navigator.assign(&target) {
        Ok(()) => {
            tracing::info!(
                source = %request.source,
                %origin,
                "transferring session to tenant origin"
            );
            true
        }
        Err(_) => {
            // The error may echo the target, which carries the tokens
            tracing::error!(%origin, "session transfer navigation failed");
            false
        }
    }
}

/// Decoded transfer, ready to be written to the token store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedTransfer {
    pub tokens: TokenPair,
    pub tenant_schema: Option<String>,
    pub tenant_name: Option<String>,
    pub username: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub source: Option<TransferSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Fragment has no `session` key.
    NoTransfer,
    /// This page load already processed its transfer.
    AlreadyConsumed,
    Received(ReceivedTransfer),
}

/// Marker for one full page load. A transfer fragment is processed at most
/// once per load, whether or not it decoded.
#[derive(Debug, Clone)]
pub struct PageLoad {
    id: Uuid,
    consumed: bool,
}

impl Default for PageLoad {
    fn default() -> Self {
        Self::new()
    }
}

impl PageLoad {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            consumed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    pub fn consume_transfer(&mut self, fragment: &str) -> Result<TransferOutcome, TransferError> {
        let parsed = TransferFragment::parse(fragment);
        let Some(session) = parsed.session else {
            return Ok(TransferOutcome::NoTransfer);
        };

        if self.consumed {
            tracing::debug!(load = %self.id, "transfer already consumed on this page load");
            return Ok(TransferOutcome::AlreadyConsumed);
        }
        self.consumed = true;

        let incoming = codec::decode_session(&session).inspect_err(|e| {
            tracing::warn!(load = %self.id, error = %e, "discarding malformed session transfer");
        })?;

        let access = incoming
            .access
            .filter(|a| !a.is_empty())
            .ok_or(TransferError::MissingAccessToken)
            .inspect_err(|_| {
                tracing::warn!(load = %self.id, "session transfer has no access token")
            })?;

        let source = incoming
            .source
            .as_deref()
            .and_then(TransferSource::parse)
            .or_else(|| parsed.source.as_deref().and_then(TransferSource::parse));

        let issued_at = incoming
            .issued_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc));

        tracing::info!(load = %self.id, source = ?source, "received session transfer");

        Ok(TransferOutcome::Received(ReceivedTransfer {
            tokens: TokenPair::new(access, incoming.refresh.filter(|r| !r.is_empty())),
            tenant_schema: incoming.tenant_schema,
            tenant_name: incoming.tenant_name,
            username: incoming.username,
            issued_at,
            source,
        }))
    }
}
