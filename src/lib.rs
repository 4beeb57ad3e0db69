//! # Reefdesk API Library
//!
//! This library provides the core functionality for the Reefdesk dive shop
//! management service: the organization-scoped repositories, the stock and
//! payment ledgers, and the HTTP surface in front of them.

pub mod auth;
pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
