//! Credential primitives: password digests and bearer tokens

pub mod password;
pub mod token;

pub use password::{dummy_verify, hash_password, verify_password};
pub use token::{generate_token, hash_token};
