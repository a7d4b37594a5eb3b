use crate::error::AppError;

/// Hash a password with bcrypt. The cost factor and a per-hash random
/// salt are embedded in the output string.
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored hash - constant-time via bcrypt.
/// A malformed hash verifies as false rather than erroring.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}
