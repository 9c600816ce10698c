//! Externally granted moderator role
//!
//! Whoever presents the shared moderator key when connecting is privileged regardless of
//! arrival order. The game only consumes the resulting boolean.

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Shared secret (None = nobody gets the external role)
    pub moderator_key: Option<String>,
}

impl AuthConfig {
    /// Load auth config from the MODERATOR_KEY environment variable
    pub fn from_env() -> Self {
        let moderator_key = std::env::var("MODERATOR_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if moderator_key.is_some() {
            tracing::info!("Moderator key enabled");
        } else {
            tracing::info!("No MODERATOR_KEY set, moderator role follows arrival order only");
        }
        Self { moderator_key }
    }

    pub fn is_enabled(&self) -> bool {
        self.moderator_key.is_some()
    }

    /// Whether `key` grants the external privileged role
    pub fn validate(&self, key: Option<&str>) -> bool {
        match (&self.moderator_key, key) {
            (Some(expected), Some(given)) => {
                constant_time_eq(expected.as_bytes(), given.trim().as_bytes())
            }
            _ => false,
        }
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_validate() {
        let config = AuthConfig {
            moderator_key: Some("s3cret".to_string()),
        };
        assert!(config.validate(Some("s3cret")));
        assert!(config.validate(Some(" s3cret ")));
        assert!(!config.validate(Some("guess")));
        assert!(!config.validate(None));
    }

    #[test]
    fn test_disabled_grants_nothing() {
        let config = AuthConfig::default();
        assert!(!config.is_enabled());
        assert!(!config.validate(Some("")));
        assert!(!config.validate(Some("anything")));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("MODERATOR_KEY", "  ");
        assert!(!AuthConfig::from_env().is_enabled());

        std::env::set_var("MODERATOR_KEY", "abc");
        let config = AuthConfig::from_env();
        assert!(config.validate(Some("abc")));

        std::env::remove_var("MODERATOR_KEY");
    }
}
