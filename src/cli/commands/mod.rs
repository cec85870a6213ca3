pub mod auth;
pub mod billing;
pub mod endpoints;
pub mod open;
