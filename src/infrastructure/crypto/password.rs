//! Password hashing utilities

use bcrypt::{hash, verify};

/// bcrypt work factor for stored passwords.
pub const PASSWORD_HASH_COST: u32 = 10;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, PASSWORD_HASH_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}
