//! CLI command implementations

pub mod ask;
pub mod chat;
pub mod dashboard;
pub mod health;
