//! Static shared secret presented by trusted backend callers.
//!
//! Both sides are reduced to SHA-256 digests before a constant-time comparison, so
//! neither the secret's length nor a matching prefix shows up in timing.
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

#[derive(Clone)]
pub struct InternalKey {
    // None => no key configured, nothing matches
    digest: Option<[u8; 32]>,
}

impl std::fmt::Debug for InternalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalKey")
            .field("configured", &self.digest.is_some())
            .finish()
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl InternalKey {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: (!secret.is_empty()).then(|| digest(secret)),
        }
    }

    pub fn matches(&self, presented: &str) -> bool {
        match &self.digest {
            Some(expected) => expected[..].ct_eq(&digest(presented)[..]).into(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_only() {
        let key = InternalKey::new("s3cr3t-internal");
        assert!(key.matches("s3cr3t-internal"));
        assert!(!key.matches("s3cr3t-internaL"));
        assert!(!key.matches("s3cr3t"));
        assert!(!key.matches("s3cr3t-internal "));
        assert!(!key.matches(""));
    }

    #[test]
    fn unconfigured_key_matches_nothing() {
        let key = InternalKey::new("");
        assert!(!key.matches(""));
        assert!(!key.matches("anything"));
    }
}
