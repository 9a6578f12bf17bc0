//! Capability levels.
//!
//! A caller's role is resolved once per operation by
//! [`IdentityRegistry::role_of`](crate::IdentityRegistry::role_of) and checked
//! with [`authorize`] before any state is touched.

use crate::error::RegistryError;
use std::fmt;

/// Capability level, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Anonymous,
    Registered,
    Moderator,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Anonymous => "anonymous",
            Role::Registered => "registered",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Require `role` to be at least `required`.
pub fn authorize(role: Role, required: Role) -> Result<(), RegistryError> {
    if role >= required {
        Ok(())
    } else {
        Err(RegistryError::Unauthorized(format!(
            "requires {} role, caller is {}",
            required, role
        )))
    }
}
