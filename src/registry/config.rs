//! Registry configuration

/// Configuration for the client registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Prefix for generated identities (`client_1`, `client_2`, ...)
    pub id_prefix: String,

    /// Longest identity a client may request, in bytes
    ///
    /// Longer requests are replaced by a generated identity.
    pub max_id_len: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_prefix: "client_".to_string(),
            max_id_len: 128,
        }
    }
}

impl RegistryConfig {
    /// Set the prefix for generated identities
    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Set the maximum requested identity length
    pub fn max_id_len(mut self, len: usize) -> Self {
        self.max_id_len = len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.id_prefix, "client_");
        assert_eq!(config.max_id_len, 128);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default().id_prefix("peer-").max_id_len(16);

        assert_eq!(config.id_prefix, "peer-");
        assert_eq!(config.max_id_len, 16);
    }
}
