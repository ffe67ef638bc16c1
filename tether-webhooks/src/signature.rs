//! Webhook signature generation and verification

use crate::{Result, SignatureMethod};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// HMAC signer and verifier for the `<algo>=<hex>` format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignatureValidator {
    method: SignatureMethod,
}

impl SignatureValidator {
    /// Create a validator for a signature method
    pub fn new(method: SignatureMethod) -> Self {
        Self { method }
    }

    /// Select a validator by algorithm name
    pub fn for_algorithm(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn method(&self) -> SignatureMethod {
        self.method
    }

    /// Sign a payload, e.g. `sha256=5d61...`
    pub fn generate(&self, payload: &[u8], secret: &str) -> String {
        format!("{}={}", self.method.prefix(), self.digest(payload, secret))
    }

    /// Verify a provided signature against the payload.
    ///
    /// The signature must match byte for byte, hex case and surrounding
    /// whitespace included; anything else yields `false`.
    pub fn verify(&self, payload: &[u8], signature: &str, secret: &str) -> bool {
        let expected = self.generate(payload, secret);
        constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }

    fn digest(&self, payload: &[u8], secret: &str) -> String {
        match self.method {
            SignatureMethod::HmacSha256 => {
                let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                    .expect("HMAC can take any size key");
                mac.update(payload);
                hex::encode(mac.finalize().into_bytes())
            }
            SignatureMethod::HmacSha1 => {
                let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
                    .expect("HMAC can take any size key");
                mac.update(payload);
                hex::encode(mac.finalize().into_bytes())
            }
        }
    }
}
