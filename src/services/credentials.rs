//! Salted password digests for stored accounts.

use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::dao::models::UserEntity;

/// Number of characters in a generated salt.
pub const SALT_LENGTH: usize = 16;

/// Fresh random salt drawn from `[a-zA-Z0-9]`.
pub fn generate_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

/// Lowercase hex SHA-256 of `salt` followed by `password`.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build the stored account for `username`, hashing `password` with a new salt.
pub fn new_account(username: String, password: &str) -> UserEntity {
    let salt = generate_salt();
    let password = hash_password(&salt, password);
    UserEntity {
        username,
        password,
        salt,
    }
}

/// Whether `candidate` hashes to the stored digest of `user`.
pub fn verify_password(user: &UserEntity, candidate: &str) -> bool {
    let digest = hash_password(&user.salt, candidate);
    digest.as_bytes().ct_eq(user.password.as_bytes()).into()
}
