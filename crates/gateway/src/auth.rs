//! HMAC-SHA256 request signatures for `POST /enviar`.
//!
//! The signature covers the compact JSON serialization of the `datos`
//! object, keys in the order the caller sent them, hex-encoded in lowercase.

use std::fmt::Write as _;

use {
    hmac::{Hmac, Mac},
    secrecy::{ExposeSecret, Secret},
    sha2::Sha256,
    subtle::ConstantTimeEq,
};

use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct RequestSigner {
    mac: HmacSha256,
}

impl RequestSigner {
    pub fn new(key: &Secret<String>) -> Result<Self, GatewayError> {
        let mac = HmacSha256::new_from_slice(key.expose_secret().as_bytes())
            .map_err(|_| GatewayError::SigningKey)?;
        Ok(Self { mac })
    }

    pub fn sign(&self, datos: &serde_json::Value) -> String {
        self.sign_bytes(datos.to_string().as_bytes())
    }

    fn sign_bytes(&self, data: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(data);
        let digest = mac.finalize().into_bytes();

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }

    /// Constant-time check of `hash` against the signature of `datos`.
    pub fn verify(&self, datos: &serde_json::Value, hash: &str) -> bool {
        self.sign(datos).as_bytes().ct_eq(hash.as_bytes()).into()
    }
}
