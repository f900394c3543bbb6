//! Alchemist Status Daemon Library
//!
//! Core modules for deriving agent deployment state from deployment records.

pub mod app;
pub mod cache;
pub mod errors;
pub mod http;
pub mod logs;
pub mod models;
pub mod server;
pub mod settings;
pub mod status;
pub mod utils;
pub mod watch;
pub mod workers;
