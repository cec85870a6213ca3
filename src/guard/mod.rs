//! Pre-navigation checks. Pure: the same hostname, path and token presence
//! always produce the same decision, so it is re-run on every navigation
//! including back/forward.

use serde::Serialize;

use crate::config::DomainConfig;

pub const SIGN_IN_MESSAGE: &str = "Please sign in to continue.";
pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";

/// Paths the public domain serves when the domain gate is enforced.
pub const PUBLIC_PATHS: &[&str] = &[HOME_PATH, LOGIN_PATH, REGISTER_PATH];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    Public,
    Tenant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainPolicy {
    pub root_domain: Option<String>,
    pub enforce_public_gate: bool,
}

impl DomainPolicy {
    pub fn new(root_domain: Option<&str>, enforce_public_gate: bool) -> Self {
        Self {
            root_domain: root_domain
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty()),
            enforce_public_gate,
        }
    }

    pub fn from_config(config: &DomainConfig) -> Self {
        Self::new(config.root_domain.as_deref(), config.enforce_public_gate)
    }

    /// Loopback hosts and the exact root domain are public; everything else
    /// is a tenant subdomain.
    pub fn classify(&self, hostname: &str) -> HostKind {
        let hostname = hostname.trim().trim_end_matches('.').to_ascii_lowercase();
        if is_loopback(&hostname) || self.root_domain.as_deref() == Some(hostname.as_str()) {
            HostKind::Public
        } else {
            HostKind::Tenant
        }
    }
}

pub fn is_loopback(hostname: &str) -> bool {
    hostname == "localhost"
        || hostname == "0.0.0.0"
        || hostname == "::1"
        || hostname == "[::1]"
        || (hostname.starts_with("127.")
            && hostname.split('.').all(|part| part.parse::<u8>().is_ok()))
}

/// State carried to the redirect target, e.g. the login page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectState {
    pub message: Option<String>,
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteGuardDecision {
    Allow,
    RedirectTo { path: String, state: RedirectState },
}

impl RouteGuardDecision {
    pub fn redirect(path: impl Into<String>) -> Self {
        RouteGuardDecision::RedirectTo {
            path: path.into(),
            state: RedirectState::default(),
        }
    }
}

/// `/billing/?x=1` -> `/billing`
pub fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.trim_end_matches('/') {
        "" => HOME_PATH,
        trimmed => trimmed,
    }
}

/// Evaluates the domain gate and then the authentication gate.
///
/// `requested` is the path as typed (query included); it is carried
/// verbatim to the login page so sign-in can return there.
pub fn evaluate(
    policy: &DomainPolicy,
    hostname: &str,
    requested: &str,
    requires_auth: bool,
    has_access_token: bool,
) -> RouteGuardDecision {
    let path = normalize_path(requested);

    if policy.enforce_public_gate
        && policy.classify(hostname) == HostKind::Public
        && !PUBLIC_PATHS.contains(&path)
    {
        tracing::debug!(%hostname, %path, "path not served on the public domain");
        return RouteGuardDecision::redirect(HOME_PATH);
    }

    if requires_auth && !has_access_token {
        tracing::debug!(%path, "authentication required");
        return RouteGuardDecision::RedirectTo {
            path: LOGIN_PATH.to_string(),
            state: RedirectState {
                message: Some(SIGN_IN_MESSAGE.to_string()),
                redirect_to: Some(requested.to_string()),
            },
        };
    }

    RouteGuardDecision::Allow
}
