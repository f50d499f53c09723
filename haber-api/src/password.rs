//! Password hashing
//!
//! Stored format: `pbkdf2-sha256$<iterations>$<salt>$<hash>` with salt and
//! hash in unpadded standard base64. Verification uses the iteration count
//! stored with the hash, so raising the configured count only affects new
//! hashes.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 hasher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash with a fresh random salt
    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut key = [0u8; HASH_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, self.iterations, &mut key);

        format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(key)
        )
    }

    /// Check `password` against a stored hash.
    ///
    /// Anything that does not parse as our format (including the empty
    /// hash of accounts created before passwords were stored) never matches.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((iterations, salt, expected)) = parse(stored) else {
            return false;
        };

        let mut key = vec![0u8; expected.len()];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut key);

        key.as_slice().ct_eq(expected.as_slice()).into()
    }
}

fn parse(stored: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok().filter(|&n| n > 0)?;
    let salt = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    let hash = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    if parts.next().is_some() || hash.is_empty() {
        return None;
    }
    Some((iterations, salt, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = PasswordHasher::new(1_000);
        let stored = hasher.hash("gizli-şifre");

        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(hasher.verify("gizli-şifre", &stored));
        assert!(!hasher.verify("gizli-sifre", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = PasswordHasher::new(1_000);
        assert_ne!(hasher.hash("aynı"), hasher.hash("aynı"));
    }

    #[test]
    fn test_verify_uses_stored_iterations() {
        let stored = PasswordHasher::new(500).hash("parola");
        assert!(PasswordHasher::new(2_000).verify("parola", &stored));
    }

    #[test]
    fn test_malformed_hashes_never_match() {
        let hasher = PasswordHasher::new(1_000);
        for stored in [
            "",
            "parola",
            "pbkdf2-sha256$0$AAAA$AAAA",
            "pbkdf2-sha256$1000$!!$AAAA",
            "md5$1000$AAAA$AAAA",
            "pbkdf2-sha256$1000$AAAA$AAAA$extra",
        ] {
            assert!(!hasher.verify("parola", stored), "{:?} matched", stored);
        }
    }
}
