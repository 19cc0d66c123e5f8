//! scanvault: stores nmap XML reports in SQLite and serves them back.

pub mod config;
pub mod logging;
pub mod service;

#[cfg(feature = "server")]
pub mod api;
