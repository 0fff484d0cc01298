/// Domain services
///
/// Workflows that span several gateway calls. Each takes the gateway (or the
/// narrowest port it needs) and, where credentials are written, the hasher as
/// explicit parameters.
///
/// - `provisioning`: user registration with addresses and access grants
/// - `visibility`: task list filtering and single-read checks
/// - `sessions`: email/password login
/// - `password_reset`: reset token issue and redemption

pub mod password_reset;
pub mod provisioning;
pub mod sessions;
pub mod visibility;
