//! PKCE (RFC 7636) and anti-forgery state helpers

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// The only challenge method issued
pub const CHALLENGE_METHOD: &str = "S256";

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Fresh code verifier: 32 random bytes, base64url without padding
pub fn generate_verifier() -> String {
    random_token()
}

/// S256 challenge: base64url(SHA-256(verifier))
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Fresh anti-forgery state token
pub fn generate_state() -> String {
    random_token()
}
