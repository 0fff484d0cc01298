//! # Taskboard Shared Library
//!
//! Domain types, persistence and business rules used by the Taskboard API
//! server.
//!
//! ## Module Organization
//!
//! - `auth`: credential hashing, session tokens, authorization oracle
//! - `db`: connection pool and migrations
//! - `models`: database models and request/response shapes
//! - `store`: persistence gateway ports and their implementations
//! - `services`: provisioning, task visibility, sessions, password reset
//! - `storage`: uploaded file bytes on disk

pub mod auth;
pub mod db;
pub mod models;
pub mod services;
pub mod storage;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
