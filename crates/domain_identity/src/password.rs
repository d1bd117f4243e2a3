//! Password hashing
//!
//! PBKDF2-HMAC-SHA256 with a random 16-byte salt, stored as
//! `$pbkdf2-sha256$i=<iterations>$<salt>$<hash>` (unpadded base64). The
//! iteration count travels with the hash so it can be raised later without
//! invalidating existing users.

use std::num::NonZeroU32;

use base64ct::{Base64Unpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};

use crate::error::IdentityError;

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;
const ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

/// Hashes a password with a fresh salt
pub fn hash_password(password: &str) -> Result<String, IdentityError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| IdentityError::Hashing("system randomness unavailable".to_string()))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(ALGORITHM, ITERATIONS, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "${}$i={}${}${}",
        SCHEME,
        ITERATIONS,
        Base64Unpadded::encode_string(&salt),
        Base64Unpadded::encode_string(&hash)
    ))
}

/// Checks a password against a stored hash in constant time
///
/// Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((iterations, salt, hash)) = parse(stored) else {
        return false;
    };
    pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok()
}

fn parse(stored: &str) -> Option<(NonZeroU32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.split('$');
    if !parts.next()?.is_empty() || parts.next()? != SCHEME {
        return None;
    }
    let iterations = parts.next()?.strip_prefix("i=")?.parse::<NonZeroU32>().ok()?;
    let salt = Base64Unpadded::decode_vec(parts.next()?).ok()?;
    let hash = Base64Unpadded::decode_vec(parts.next()?).ok()?;
    if parts.next().is_some() || hash.len() != HASH_LEN {
        return None;
    }
    Some((iterations, salt, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verifies() {
        let stored = hash_password("correct horse battery").unwrap();
        assert!(stored.starts_with("$pbkdf2-sha256$i=100000$"));
        assert!(verify_password("correct horse battery", &stored));
        assert!(!verify_password("correct horse battery!", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "$bcrypt$i=10$abc$def"));
        assert!(!verify_password("x", "$pbkdf2-sha256$i=0$AAAA$AAAA"));
        assert!(!verify_password("x", "$pbkdf2-sha256$i=1000$!!$AAAA"));
    }
}
