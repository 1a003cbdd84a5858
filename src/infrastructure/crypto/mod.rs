//! Key generation, JWT signing and password hashing.

pub mod api_key;
pub mod jwt;
pub mod password;
