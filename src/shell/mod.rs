//! Navigation shell: runs the route guard on every navigation, follows its
//! redirects and decides which page renders. Also hosts the sign-in
//! handoff, which either transfers the session to the tenant origin or
//! stores it locally.

pub mod routes;

use std::sync::Arc;

use serde::Serialize;

use crate::api::{LoginResponse, TenantChoice};
use crate::auth::TokenStore;
use crate::browser::{NavigationError, Navigator};
use crate::guard::{self, DomainPolicy, RedirectState, RouteGuardDecision, LOGIN_PATH};
use crate::storage::StorageError;
use crate::transfer::{self, PageLoad, TransferOutcome, TransferRequest, TransferSource};

pub use routes::{match_route, Page, RouteDef, DASHBOARD_PATH, ROUTES};

const MAX_REDIRECTS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What is on screen after a navigation settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub page: Page,
    pub path: String,
    /// Carried by the redirect that led here, if any.
    pub state: RedirectState,
}

/// A sign-in that still needs the user to pick a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLogin {
    pub response: LoginResponse,
    pub username: Option<String>,
}

impl PendingLogin {
    pub fn tenants(&self) -> &[TenantChoice] {
        &self.response.tenants
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The browser left for the tenant origin.
    Transferred { url: String },
    /// Stayed on this origin and routed in-app.
    Navigated(View),
    SelectTenant(PendingLogin),
}

pub struct Shell<N: Navigator> {
    navigator: N,
    tokens: Arc<dyn TokenStore>,
    policy: DomainPolicy,
    page_load: PageLoad,
    view: Option<View>,
}

impl<N: Navigator> Shell<N> {
    pub fn new(navigator: N, tokens: Arc<dyn TokenStore>, policy: DomainPolicy) -> Self {
        Self {
            navigator,
            tokens,
            policy,
            page_load: PageLoad::new(),
            view: None,
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    pub fn into_navigator(self) -> N {
        self.navigator
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn page_load(&self) -> &PageLoad {
        &self.page_load
    }

    /// Full page load at the navigator's current location. The login page
    /// consumes a session transfer fragment here, once per load.
    pub fn load(&mut self) -> Result<View, ShellError> {
        self.page_load = PageLoad::new();
        let location = self.navigator.location().clone();
        tracing::debug!(load = %self.page_load.id(), path = %location.pathname, "page load");

        if guard::normalize_path(&location.pathname) != LOGIN_PATH
            || location.fragment().is_empty()
        {
            return self.render(RedirectState::default());
        }

        match self.page_load.consume_transfer(location.fragment()) {
            Ok(TransferOutcome::Received(received)) => {
                self.tokens.store(&received.tokens)?;
                // The fragment holds live credentials; drop it before anything else
                self.navigator.replace_state(&location.route_path())?;
                self.navigator.replace_state(DASHBOARD_PATH)?;
                tracing::info!(
                    tenant = received.tenant_schema.as_deref().unwrap_or("-"),
                    "session transfer complete"
                );
                self.render(RedirectState::default())
            }
            Ok(TransferOutcome::NoTransfer) | Ok(TransferOutcome::AlreadyConsumed) => {
                self.render(RedirectState::default())
            }
            Err(e) => {
                self.navigator.replace_state(&location.route_path())?;
                self.render(RedirectState {
                    message: Some(e.user_message().to_string()),
                    redirect_to: None,
                })
            }
        }
    }

    /// In-app navigation (new history entry, no page load).
    pub fn navigate(&mut self, path: &str) -> Result<View, ShellError> {
        self.navigator.push_state(path)?;
        self.render(RedirectState::default())
    }

    /// Re-evaluate after the history cursor moved (back/forward).
    pub fn popstate(&mut self) -> Result<View, ShellError> {
        self.render(RedirectState::default())
    }

    fn render(&mut self, mut state: RedirectState) -> Result<View, ShellError> {
        for _ in 0..=MAX_REDIRECTS {
            let location = self.navigator.location().clone();
            let requested = location.route_path();
            let route = match_route(&requested);

            let decision = guard::evaluate(
                &self.policy,
                &location.hostname,
                &requested,
                route.is_some_and(|r| r.requires_auth),
                self.tokens.has_session(),
            );

            match decision {
                RouteGuardDecision::Allow => {
                    let view = View {
                        page: route.map_or(Page::NotFound, |r| r.page),
                        path: requested,
                        state,
                    };
                    if view.page == Page::NotFound {
                        tracing::info!(path = %view.path, "no route matched");
                    }
                    self.view = Some(view.clone());
                    return Ok(view);
                }
                RouteGuardDecision::RedirectTo {
                    path,
                    state: carried,
                } => {
                    tracing::debug!(from = %requested, to = %path, "guard redirect");
                    self.navigator.replace_state(&path)?;
                    state = carried;
                }
            }
        }

        Err(NavigationError::RedirectLoop(self.navigator.location().route_path()).into())
    }

    /// Where to go after sign-in: the page the guard bounced the visitor
    /// from, if it is a local path, otherwise the dashboard.
    fn post_login_target(&self) -> String {
        self.view
            .as_ref()
            .and_then(|view| view.state.redirect_to.as_deref())
            .filter(|target| target.starts_with('/') && !target.starts_with("//"))
            .unwrap_or(DASHBOARD_PATH)
            .to_string()
    }

    /// Hand a fresh sign-in to the right origin.
    ///
    /// Tokens are stored locally only when no cross-origin transfer happens.
    pub fn complete_login(
        &mut self,
        response: LoginResponse,
        username: Option<String>,
        source: TransferSource,
    ) -> Result<LoginOutcome, ShellError> {
        let domain = response.tenant_domain.clone().filter(|d| !d.trim().is_empty());

        if domain.is_none() && response.multiple_tenants && !response.tenants.is_empty() {
            tracing::info!(count = response.tenants.len(), "user belongs to several tenants");
            return Ok(LoginOutcome::SelectTenant(PendingLogin { response, username }));
        }

        if let Some(domain) = domain {
            let request = TransferRequest {
                tokens: response.tokens(),
                tenant_domain: domain,
                tenant_schema: response.tenant_schema.clone(),
                tenant_name: response.tenant_name.clone(),
                username,
                source,
            };
            if transfer::initiate_transfer(&mut self.navigator, &request) {
                return Ok(LoginOutcome::Transferred {
                    url: self.navigator.location().href(),
                });
            }
        }

        self.finish_local_login(&response)
    }

    pub fn select_tenant(
        &mut self,
        pending: PendingLogin,
        tenant: &TenantChoice,
    ) -> Result<LoginOutcome, ShellError> {
        let request = TransferRequest {
            tokens: pending.response.tokens(),
            tenant_domain: tenant.domain.clone(),
            tenant_schema: Some(tenant.schema.clone()),
            tenant_name: Some(tenant.name.clone()),
            username: pending.username,
            source: TransferSource::TenantSelector,
        };

        if transfer::initiate_transfer(&mut self.navigator, &request) {
            return Ok(LoginOutcome::Transferred {
                url: self.navigator.location().href(),
            });
        }

        self.finish_local_login(&pending.response)
    }

    fn finish_local_login(&mut self, response: &LoginResponse) -> Result<LoginOutcome, ShellError> {
        self.tokens.store(&response.tokens())?;
        let target = self.post_login_target();
        Ok(LoginOutcome::Navigated(self.navigate(&target)?))
    }

    pub fn logout(&mut self) -> Result<View, ShellError> {
        self.tokens.clear()?;
        tracing::info!("signed out");
        self.navigate(LOGIN_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{StorageTokenStore, TokenPair};
    use crate::browser::History;
    use crate::guard::SIGN_IN_MESSAGE;
    use crate::storage::MemoryStorage;
    use crate::transfer::TRANSFER_FAILED_MESSAGE;

    fn shell(href: &str, policy: DomainPolicy) -> Shell<History> {
        let tokens: Arc<dyn TokenStore> = Arc::new(StorageTokenStore::new(MemoryStorage::new()));
        Shell::new(History::new(href).unwrap(), tokens, policy)
    }

    fn login_response(domain: Option<&str>) -> LoginResponse {
        LoginResponse {
            access: "acc".to_string(),
            refresh: Some("ref".to_string()),
            tenant_schema: Some("acme".to_string()),
            tenant_name: Some("Acme".to_string()),
            tenant_domain: domain.map(str::to_string),
            multiple_tenants: false,
            tenants: Vec::new(),
        }
    }

    #[test]
    fn protected_page_bounces_to_login_with_state() {
        let mut shell = shell("https://acme.example.com/dashboard", DomainPolicy::default());
        let view = shell.load().unwrap();
        assert_eq!(view.page, Page::Login);
        assert_eq!(view.path, "/login");
        assert_eq!(view.state.message.as_deref(), Some(SIGN_IN_MESSAGE));
        assert_eq!(view.state.redirect_to.as_deref(), Some("/dashboard"));
        // Redirect replaced the entry rather than pushing
        assert_eq!(shell.navigator().entries().len(), 1);
    }

    #[test]
    fn unknown_path_renders_not_found() {
        let mut shell = shell("https://acme.example.com/nope", DomainPolicy::default());
        assert_eq!(shell.load().unwrap().page, Page::NotFound);
    }

    #[test]
    fn public_domain_redirects_home() {
        let policy = DomainPolicy::new(Some("statuswatch.example.com"), true);
        let mut shell = shell("https://statuswatch.example.com/nope", policy);
        let view = shell.load().unwrap();
        assert_eq!(view.page, Page::Home);
        assert_eq!(view.path, "/");
    }

    #[test]
    fn same_origin_login_returns_to_requested_page() {
        let mut shell = shell("http://localhost:5173/billing", DomainPolicy::default());
        assert_eq!(shell.load().unwrap().page, Page::Login);

        let outcome = shell
            .complete_login(login_response(Some("localhost:5173")), None, TransferSource::LoginPage)
            .unwrap();
        match outcome {
            LoginOutcome::Navigated(view) => assert_eq!(view.page, Page::Billing),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(shell.tokens().get_access().as_deref(), Some("acc"));
    }

    #[test]
    fn cross_origin_login_does_not_store_locally() {
        let mut shell = shell("https://app.example.com/login", DomainPolicy::default());
        shell.load().unwrap();
        let outcome = shell
            .complete_login(
                login_response(Some("acme.example.com")),
                Some("ops".into()),
                TransferSource::LoginPage,
            )
            .unwrap();
        match outcome {
            LoginOutcome::Transferred { url } => {
                assert!(url.starts_with("https://acme.example.com/login#session="))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!shell.tokens().has_session());
    }

    #[test]
    fn several_tenants_ask_for_a_choice() {
        let mut shell = shell("https://app.example.com/login", DomainPolicy::default());
        let mut response = login_response(None);
        response.multiple_tenants = true;
        response.tenants = vec![TenantChoice {
            schema: "globex".to_string(),
            name: "Globex".to_string(),
            domain: "globex.example.com".to_string(),
        }];

        let outcome = shell.complete_login(response, None, TransferSource::LoginPage).unwrap();
        let pending = match outcome {
            LoginOutcome::SelectTenant(pending) => pending,
            other => panic!("unexpected outcome {other:?}"),
        };
        let choice = pending.tenants()[0].clone();
        let outcome = shell.select_tenant(pending, &choice).unwrap();
        assert!(matches!(outcome, LoginOutcome::Transferred { .. }));
        assert!(shell.navigator().location().hash.contains("source=tenant_selector"));
    }

    #[test]
    fn transfer_is_consumed_and_fragment_removed() {
        let mut origin = shell("https://app.example.com/login", DomainPolicy::default());
        origin
            .complete_login(
                login_response(Some("acme.example.com")),
                None,
                TransferSource::HomepageDemo,
            )
            .unwrap();
        let href = origin.navigator().location().href();

        let mut tenant = shell(&href, DomainPolicy::default());
        let view = tenant.load().unwrap();
        assert_eq!(view.page, Page::Dashboard);
        assert_eq!(tenant.navigator().location().href(), "https://acme.example.com/dashboard");
        assert_eq!(tenant.tokens().get_refresh().as_deref(), Some("ref"));
        assert!(tenant.page_load().is_consumed());
    }

    #[test]
    fn malformed_transfer_shows_sign_in_prompt() {
        let href = "https://acme.example.com/login#session=%%%";
        let mut shell = shell(href, DomainPolicy::default());
        let view = shell.load().unwrap();
        assert_eq!(view.page, Page::Login);
        assert_eq!(view.state.message.as_deref(), Some(TRANSFER_FAILED_MESSAGE));
        assert_eq!(shell.navigator().location().hash, "");
        assert!(!shell.tokens().has_session());
    }

    #[test]
    fn back_navigation_is_guarded_after_logout() {
        let mut shell = shell("https://acme.example.com/login", DomainPolicy::default());
        shell.tokens().store(&TokenPair::new("acc", None)).unwrap();
        assert_eq!(shell.navigate("/dashboard").unwrap().page, Page::Dashboard);
        shell.logout().unwrap();

        shell.navigator_mut().back();
        let view = shell.popstate().unwrap();
        assert_eq!(view.page, Page::Login);
        assert_eq!(view.state.redirect_to.as_deref(), Some("/dashboard"));
    }

    #[test]
    fn open_redirect_targets_are_ignored() {
        let mut shell = shell("http://localhost:5173/login", DomainPolicy::default());
        shell.load().unwrap();
        if let Some(view) = shell.view.as_mut() {
            view.state.redirect_to = Some("//evil.example.com/".to_string());
        }
        match shell.complete_login(login_response(None), None, TransferSource::LoginPage).unwrap() {
            LoginOutcome::Navigated(view) => assert_eq!(view.page, Page::Dashboard),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
