use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};

use crate::error::ApiError;

/// Length of a session token in characters.
pub const SESSION_TOKEN_LEN: usize = 64;
/// Length of an activation or recovery code in characters.
pub const ACTIVATION_CODE_LEN: usize = 16;

/// hash_password
///
/// Hashes a plaintext password into a PHC-format Argon2id string with a fresh
/// OS-random salt. The adaptive work factor makes offline brute force impractical.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| ApiError::Internal(format!("salt generation failed: {e}")))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ApiError::Internal(format!("salt encoding failed: {e}")))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?
        .to_string();
    Ok(phc)
}

/// verify_password
///
/// Verifies a plaintext password against a stored PHC hash. A malformed hash
/// verifies false rather than erroring, so a corrupt credential row can never
/// be mistaken for a successful login.
pub fn verify_password(password: &str, hash: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    } else {
        false
    }
}

/// random_token
///
/// Generates `length` characters drawn uniformly from the 62-character
/// alphanumeric alphabet (A-Z, a-z, 0-9) using the operating system's CSPRNG.
/// Session tokens and activation codes share this format at different lengths,
/// and both are bearer credentials, so the randomness source must be unguessable.
pub fn random_token(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
