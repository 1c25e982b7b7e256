//! At-rest sealing for credentials.
//!
//! Access and refresh tokens are stored AES-256-CBC encrypted and base64
//! encoded, with the key baked in at build time (see `build.rs`).

use anyhow::Result;
use aes::Aes256;
use base64::prelude::*;
use block_modes::block_padding::Pkcs7;
use block_modes::{BlockMode, Cbc};

// Include generated metadata with encryption keys
include!(concat!(env!("OUT_DIR"), "/app_metadata.rs"));

type Aes256Cbc = Cbc<Aes256, Pkcs7>;

/// Prefix marking a sealed value, so plain legacy values can still be read.
const SEALED_PREFIX: &str = "sealed:";

#[derive(Clone, Debug)]
pub struct Secret {
    key: Vec<u8>,
    iv: Vec<u8>,
}

impl Default for Secret {
    fn default() -> Self {
        Self::new()
    }
}

impl Secret {
    pub fn new() -> Self {
        Self {
            key: APP_METADATA_ENCRYPTION_KEY.to_vec(),
            iv: APP_METADATA_ENCRYPTION_IV.to_vec(),
        }
    }

    pub fn seal(&self, plain: &str) -> Result<String> {
        let cipher = Aes256Cbc::new_from_slices(&self.key, &self.iv)?;
        let ciphertext = cipher.encrypt_vec(plain.as_bytes());
        Ok(format!("{}{}", SEALED_PREFIX, BASE64_STANDARD.encode(ciphertext)))
    }

    /// Reverses [`seal`](Self::seal). Values without the sealed prefix are returned as-is.
    pub fn open(&self, stored: &str) -> Result<String> {
        let Some(encoded) = stored.strip_prefix(SEALED_PREFIX) else {
            return Ok(stored.to_string());
        };
        let ciphertext = BASE64_STANDARD.decode(encoded)?;
        let cipher = Aes256Cbc::new_from_slices(&self.key, &self.iv)?;
        let plain = cipher.decrypt_vec(&ciphertext)?;
        Ok(String::from_utf8(plain)?)
    }
}
