//! Bearer token generation and digests

use sha2::{Digest, Sha256};

/// Generate a fresh random bearer token.
///
/// UUID v4 strings carry 122 random bits drawn from the OS RNG.
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// SHA-256 of a raw bearer token, hex-encoded.
///
/// This is the value stored in `tokens.token_hash` and used for lookups.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_tokens_are_unique() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn hash_is_stable_hex() {
        let digest = hash_token("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_token("abc"), digest);
        assert_ne!(hash_token("abd"), digest);
    }
}
