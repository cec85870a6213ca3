use serde::Serialize;

use crate::guard::{self, HOME_PATH, LOGIN_PATH, REGISTER_PATH};

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const BILLING_PATH: &str = "/billing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Home,
    Login,
    Register,
    Dashboard,
    Billing,
    BillingSuccess,
    BillingCancel,
    NotFound,
}

impl Page {
    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "StatusWatch",
            Page::Login => "Sign in",
            Page::Register => "Create your organization",
            Page::Dashboard => "Dashboard",
            Page::Billing => "Billing",
            Page::BillingSuccess => "Subscription active",
            Page::BillingCancel => "Checkout cancelled",
            Page::NotFound => "Page not found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    pub path: &'static str,
    pub page: Page,
    pub requires_auth: bool,
}

pub const ROUTES: &[RouteDef] = &[
    RouteDef {
        path: HOME_PATH,
        page: Page::Home,
        requires_auth: false,
    },
    RouteDef {
        path: LOGIN_PATH,
        page: Page::Login,
        requires_auth: false,
    },
    RouteDef {
        path: REGISTER_PATH,
        page: Page::Register,
        requires_auth: false,
    },
    RouteDef {
        path: DASHBOARD_PATH,
        page: Page::Dashboard,
        requires_auth: true,
    },
    RouteDef {
        path: BILLING_PATH,
        page: Page::Billing,
        requires_auth: true,
    },
    RouteDef {
        path: "/billing/success",
        page: Page::BillingSuccess,
        requires_auth: true,
    },
    RouteDef {
        path: "/billing/cancel",
        page: Page::BillingCancel,
        requires_auth: true,
    },
];

/// Unmatched paths return `None` and render [`Page::NotFound`].
pub fn match_route(path: &str) -> Option<&'static RouteDef> {
    let path = guard::normalize_path(path);
    ROUTES.iter().find(|route| route.path == path)
}
