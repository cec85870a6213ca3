pub mod api;
pub mod auth;
pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod shell;
pub mod storage;
pub mod transfer;
