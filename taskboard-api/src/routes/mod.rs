/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Registration (user provisioning)
/// - `sessions`: Email/password login
/// - `passwords`: Password reset request and redemption
/// - `files`: Upload and download
/// - `projects`: Project CRUD
/// - `tasks`: Task CRUD with visibility filtering
/// - `roles`: Role CRUD and role permission assignment
/// - `permissions`: Permission CRUD

pub mod files;
pub mod health;
pub mod passwords;
pub mod permissions;
pub mod projects;
pub mod roles;
pub mod sessions;
pub mod tasks;
pub mod users;
