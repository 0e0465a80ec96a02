//! LogPilot dashboard server
//!
//! Hosts the dashboard controller and chat session behind a small HTTP API
//! alongside health and Prometheus endpoints.

pub mod api;
pub mod config;
