//! Ordered provider credentials used in fixed failover priority.

use std::fmt;

use crate::config::ConfigError;

/// One provider API key and its position in the pool.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    key: String,
    ordinal: usize,
}

impl Credential {
    /// Secret key, only for building the `Authorization` header.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Zero-based failover position.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("ordinal", &self.ordinal)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Immutable, ordered set of provider credentials.
///
/// Built once at startup. Blank keys are dropped while loading, and a pool
/// left empty afterwards is rejected so the process never starts without a
/// usable key.
#[derive(Clone, Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    /// Build a pool from keys in priority order.
    ///
    /// # Errors
    /// Returns `ConfigError::NoCredentials` if no non-blank key remains.
    pub fn from_keys<I, S>(keys: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let credentials: Vec<Credential> = keys
            .into_iter()
            .map(|key| key.as_ref().trim().to_string())
            .filter(|key| !key.is_empty())
            .enumerate()
            .map(|(ordinal, key)| Credential { key, ordinal })
            .collect();

        if credentials.is_empty() {
            return Err(ConfigError::NoCredentials);
        }

        Ok(Self { credentials })
    }

    /// Number of usable credentials.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false for a constructed pool; kept for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Iterate credentials in failover order, each exactly once.
    pub fn iter(&self) -> std::slice::Iter<'_, Credential> {
        self.credentials.iter()
    }
}

impl<'a> IntoIterator for &'a CredentialPool {
    type Item = &'a Credential;
    type IntoIter = std::slice::Iter<'a, Credential>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_preserves_order_and_skips_blank() {
        let pool = CredentialPool::from_keys(["alpha", "  ", "", "gamma"]);
        assert!(pool.is_ok());
        let pool = pool.unwrap_or_else(|_| unreachable!());

        let keys: Vec<(&str, usize)> = pool.iter().map(|c| (c.key(), c.ordinal())).collect();
        assert_eq!(keys, vec![("alpha", 0), ("gamma", 1)]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_empty_pool_is_config_error() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            CredentialPool::from_keys(empty),
            Err(ConfigError::NoCredentials)
        ));
        assert!(matches!(
            CredentialPool::from_keys(["", " "]),
            Err(ConfigError::NoCredentials)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let pool = CredentialPool::from_keys(["sk-secret"]).unwrap_or_else(|_| unreachable!());
        let rendered = format!("{pool:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("redacted"));
    }
}
