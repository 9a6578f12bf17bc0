use thiserror::Error;

/// Errors that can occur in registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("User not registered")]
    NotRegistered,

    #[error("Invalid voting weight: {0} (allowed 1..=100)")]
    InvalidWeight(u32),

    #[error("User already banned")]
    AlreadyBanned,

    #[error("User not banned")]
    NotBanned,

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("System paused")]
    SystemPaused,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(RegistryError::SystemPaused.to_string(), "System paused");
        assert!(RegistryError::InvalidWeight(101).to_string().contains("101"));
        assert!(RegistryError::Unauthorized("admin only".to_string())
            .to_string()
            .contains("admin only"));
    }
}
