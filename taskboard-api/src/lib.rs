//! # Taskboard API Server Library
//!
//! HTTP surface of Taskboard: projects and tasks with role- and
//! permission-based access control.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors
//! - `middleware`: Response middleware
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
