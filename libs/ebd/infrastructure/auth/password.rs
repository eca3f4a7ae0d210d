//! Salted PBKDF2 password hashes
//!
//! Hashes are stored as `pbkdf2:sha256:<rounds>$<salt>$<hex digest>`, the
//! layout produced by Werkzeug, so rows written by earlier deployments of
//! the service keep verifying.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const METHOD: &str = "pbkdf2";
const DIGEST: &str = "sha256";
const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;

/// Hashes and verifies user passwords
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> String {
        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SALT_LENGTH)
            .map(char::from)
            .collect();
        self.hash_with_salt(password, &salt)
    }

    fn hash_with_salt(&self, password: &str, salt: &str) -> String {
        let digest = derive(password, salt, self.iterations, KEY_LENGTH);
        format!(
            "{}:{}:{}${}${}",
            METHOD,
            DIGEST,
            self.iterations,
            salt,
            hex::encode(digest)
        )
    }

    /// Check a candidate password against a stored hash
    ///
    /// Malformed hashes and unsupported methods never verify.
    pub fn verify(&self, stored: &str, candidate: &str) -> bool {
        let Some(parsed) = ParsedHash::parse(stored) else {
            return false;
        };
        let Ok(expected) = hex::decode(parsed.digest) else {
            return false;
        };
        if expected.is_empty() {
            return false;
        }

        let actual = derive(candidate, parsed.salt, parsed.iterations, expected.len());
        actual.ct_eq(&expected).into()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(600_000)
    }
}

struct ParsedHash<'a> {
    iterations: u32,
    salt: &'a str,
    digest: &'a str,
}

impl<'a> ParsedHash<'a> {
    fn parse(stored: &'a str) -> Option<Self> {
        let mut parts = stored.splitn(3, '$');
        let method = parts.next()?;
        let salt = parts.next()?;
        let digest = parts.next()?;

        let mut method_parts = method.split(':');
        if method_parts.next()? != METHOD || method_parts.next()? != DIGEST {
            return None;
        }
        let iterations: u32 = method_parts.next()?.parse().ok()?;
        if method_parts.next().is_some() || iterations == 0 {
            return None;
        }

        Some(Self {
            iterations,
            salt,
            digest,
        })
    }
}

fn derive(password: &str, salt: &str, iterations: u32, length: usize) -> Vec<u8> {
    let mut out = vec![0u8; length];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[test]
    fn test_hash_verifies_plain_password() {
        let hasher = hasher();
        let stored = hasher.hash("correct horse");

        assert!(stored.starts_with("pbkdf2:sha256:1000$"));
        assert!(hasher.verify(&stored, "correct horse"));
        assert!(!hasher.verify(&stored, "correct horse "));
    }

    #[test]
    fn test_truncated_digest_never_verifies() {
        let hasher = hasher();
        let stored = hasher.hash("pw");
        assert!(!hasher.verify(&stored[..stored.len() - 2], "pw"));

        let other = hasher.hash("other");
        let (prefix, _) = stored.rsplit_once('$').unwrap();
        let (_, digest) = other.rsplit_once('$').unwrap();
        assert!(!hasher.verify(&format!("{}${}", prefix, digest), "pw"));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher();
        assert_ne!(hasher.hash("same"), hasher.hash("same"));
    }

    #[test]
    fn test_known_vector() {
        // Published PBKDF2-HMAC-SHA256 vector: P = "password", S = "salt", c = 1
        let stored = "pbkdf2:sha256:1$salt$120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b";
        assert!(hasher().verify(stored, "password"));
    }

    #[test]
    fn test_verify_uses_stored_rounds() {
        let stored = PasswordHasher::new(50).hash("pw");
        // A hasher configured differently still honors the stored round count
        assert!(PasswordHasher::new(9_000).verify(&stored, "pw"));
    }

    #[test]
    fn test_malformed_hashes_never_verify() {
        let hasher = hasher();
        assert!(!hasher.verify("", "pw"));
        assert!(!hasher.verify("plain-text", "plain-text"));
        assert!(!hasher.verify("scrypt:32768:8:1$salt$abcd", "pw"));
        assert!(!hasher.verify("pbkdf2:sha256:0$salt$abcd", "pw"));
        assert!(!hasher.verify("pbkdf2:sha256:10$salt$zz", "pw"));
        assert!(!hasher.verify("pbkdf2:sha256:10$salt$", "pw"));
    }
}
