/// Authorization oracle
///
/// This module answers "does principal P hold capability C" for the fixed
/// vocabulary the API checks, and combines those answers into route guards.
///
/// # Permission Model
///
/// 1. **Roles**: named groups (`administrator`, `moderator`, ...) assigned to users
/// 2. **Permissions**: named capabilities (`read_task`, `read_private_task`, ...)
///    granted to users directly or through a role
/// 3. **Guards**: OR-combinations of role or capability checks attached to routes
///
/// Role and permission slugs are data, but every check in the code names an
/// enumerated [`RoleName`] or [`Capability`]; unknown slugs simply never match.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{has_capability, Capability, Grants, Guard, RoleName};
///
/// let grants = Grants::new(["moderator"], ["read_task"]);
///
/// assert!(has_capability(&grants, Capability::ReadTask));
/// assert!(!has_capability(&grants, Capability::ReadPrivateTask));
/// assert!(Guard::MANAGE.allows(&grants));
/// assert!(Guard::AnyRole(&[RoleName::Moderator]).allows(&grants));
/// ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Principal fails a route guard
    #[error("Access denied: requires {0}")]
    Denied(Guard),

    /// Principal lacks a capability required by the handler itself
    #[error("Missing capability: {0}")]
    MissingCapability(Capability),
}

/// Capabilities checked by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read projects and public tasks
    ReadTask,

    /// Read tasks whose visibility is `private`
    ReadPrivateTask,
}

impl Capability {
    /// Permission slug backing this capability
    pub fn slug(&self) -> &'static str {
        match self {
            Capability::ReadTask => "read_task",
            Capability::ReadPrivateTask => "read_private_task",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Roles checked by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    /// Full management access
    Administrator,

    /// Management access to projects, tasks, files and the ACL
    Moderator,
}

impl RoleName {
    /// Role slug backing this role
    pub fn slug(&self) -> &'static str {
        match self {
            RoleName::Administrator => "administrator",
            RoleName::Moderator => "moderator",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Role and permission slugs held by a principal
///
/// `permissions` is the effective set: direct grants plus every permission
/// granted through a held role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants {
    /// Role slugs
    pub roles: BTreeSet<String>,

    /// Effective permission slugs
    pub permissions: BTreeSet<String>,
}

impl Grants {
    /// Builds grants from role and permission slugs
    pub fn new<R, P>(roles: R, permissions: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Checks whether the principal holds a capability
///
/// Absence evaluates to `false`; this never fails.
pub fn has_capability(grants: &Grants, capability: Capability) -> bool {
    grants.permissions.contains(capability.slug())
}

/// Checks whether the principal holds a role
pub fn has_role(grants: &Grants, role: RoleName) -> bool {
    grants.roles.contains(role.slug())
}

/// Requires a capability, for checks made inside handlers
pub fn require_capability(grants: &Grants, capability: Capability) -> Result<(), AuthzError> {
    if !has_capability(grants, capability) {
        return Err(AuthzError::MissingCapability(capability));
    }

    Ok(())
}

/// Route guard: a boolean OR over roles or capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Passes if the principal holds any of the roles
    AnyRole(&'static [RoleName]),

    /// Passes if the principal holds any of the capabilities
    AnyCapability(&'static [Capability]),
}

impl Guard {
    /// `administrator || moderator`
    pub const MANAGE: Guard = Guard::AnyRole(&[RoleName::Administrator, RoleName::Moderator]);

    /// `read_task || read_private_task`
    pub const READ: Guard =
        Guard::AnyCapability(&[Capability::ReadTask, Capability::ReadPrivateTask]);

    /// Evaluates the guard against a principal's grants
    pub fn allows(&self, grants: &Grants) -> bool {
        match self {
            Guard::AnyRole(roles) => roles.iter().any(|role| has_role(grants, *role)),
            Guard::AnyCapability(capabilities) => capabilities
                .iter()
                .any(|capability| has_capability(grants, *capability)),
        }
    }

    /// Evaluates the guard, returning an error on denial
    pub fn check(&self, grants: &Grants) -> Result<(), AuthzError> {
        if !self.allows(grants) {
            return Err(AuthzError::Denied(*self));
        }

        Ok(())
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = match self {
            Guard::AnyRole(roles) => roles.iter().map(RoleName::slug).collect(),
            Guard::AnyCapability(capabilities) => capabilities.iter().map(Capability::slug).collect(),
        };
        write!(f, "{}", names.join(" || "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_slugs() {
        assert_eq!(Capability::ReadTask.slug(), "read_task");
        assert_eq!(Capability::ReadPrivateTask.slug(), "read_private_task");
        assert_eq!(RoleName::Administrator.slug(), "administrator");
        assert_eq!(RoleName::Moderator.slug(), "moderator");
    }

    #[test]
    fn test_has_capability() {
        let grants = Grants::new(Vec::<String>::new(), ["read_private_task"]);

        assert!(has_capability(&grants, Capability::ReadPrivateTask));
        assert!(!has_capability(&grants, Capability::ReadTask));
        assert!(!has_capability(&Grants::default(), Capability::ReadTask));
    }

    #[test]
    fn test_unknown_slugs_never_match() {
        let grants = Grants::new(["superuser"], ["read_everything"]);

        assert!(!has_role(&grants, RoleName::Administrator));
        assert!(!has_capability(&grants, Capability::ReadTask));
    }

    #[test]
    fn test_manage_guard() {
        assert!(Guard::MANAGE.allows(&Grants::new(["administrator"], Vec::<String>::new())));
        assert!(Guard::MANAGE.allows(&Grants::new(["moderator"], Vec::<String>::new())));
        assert!(!Guard::MANAGE.allows(&Grants::new(["guest"], ["read_task"])));
    }

    #[test]
    fn test_read_guard() {
        assert!(Guard::READ.allows(&Grants::new(Vec::<String>::new(), ["read_task"])));
        assert!(Guard::READ.allows(&Grants::new(Vec::<String>::new(), ["read_private_task"])));
        // Roles alone do not satisfy a capability guard
        assert!(!Guard::READ.allows(&Grants::new(["administrator"], Vec::<String>::new())));
    }

    #[test]
    fn test_require_capability() {
        let grants = Grants::new(Vec::<String>::new(), ["read_task"]);

        assert!(require_capability(&grants, Capability::ReadTask).is_ok());
        assert!(matches!(
            require_capability(&grants, Capability::ReadPrivateTask),
            Err(AuthzError::MissingCapability(Capability::ReadPrivateTask))
        ));
    }

    #[test]
    fn test_guard_display() {
        assert_eq!(Guard::MANAGE.to_string(), "administrator || moderator");
        assert_eq!(Guard::READ.to_string(), "read_task || read_private_task");

        let err = Guard::READ.check(&Grants::default()).unwrap_err();
        assert!(err.to_string().contains("read_task || read_private_task"));
    }
}
