/// Middleware modules for the API server
///
/// Authentication and route guards live in `app` next to the router they
/// wrap; this module holds response middleware.
///
/// - `security`: OWASP security headers

pub mod security;
