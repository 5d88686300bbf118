use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};
use data_encoding::BASE64URL_NOPAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Bytes of entropy behind every session and reset token.
const TOKEN_BYTES: usize = 32;

pub fn hash_password(password: &str, params: &Params) -> Result<String, argon2::password_hash::Error> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;

    Ok(password_hash.to_string())
}

/// Checks `password` against a PHC-encoded hash. A mismatch is `Ok(false)`; only a
/// malformed stored hash is an error.
pub fn verify_password_hash(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let hash = PasswordHash::new(hash)?;

    match Argon2::default().verify_password(password.as_bytes(), &hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn generate_uuid() -> String {
    Uuid::new_v4().simple().to_string()
}

/// URL-safe random token handed to clients. Only its digest is persisted.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];

    rand::thread_rng().fill_bytes(&mut bytes);

    BASE64URL_NOPAD.encode(&bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(token);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_params() -> Params {
        Params::new(8, 1, 1, None).unwrap()
    }

    #[test]
    fn password_hash_is_salted() {
        let params = cheap_params();
        let first = hash_password("correct horse", &params).unwrap();
        let second = hash_password("correct horse", &params).unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_accepts_matching_and_rejects_other_passwords() {
        let hash = hash_password("correct horse", &cheap_params()).unwrap();

        assert!(verify_password_hash("correct horse", &hash).unwrap());
        assert!(!verify_password_hash("battery staple", &hash).unwrap());
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(verify_password_hash("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn tokens_are_url_safe_and_distinct() {
        let a = generate_token();
        let b = generate_token();

        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn token_digest_is_stable_hex() {
        let digest = hash_token("abc");

        assert_eq!(digest, hash_token("abc"));
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, hash_token("abd"));
    }
}
