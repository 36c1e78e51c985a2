//! AES-256-CTR envelope cipher (AES security level).
//!
//! The envelope is `iv(16) || ciphertext` with no authentication tag.
//! Ciphertext produced by this variant is malleable; it exists for
//! throughput comparisons against the authenticated suites.

use aes::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::constants::KEY_LEN;
use crate::error::{Error, Result};

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// CTR-mode IV length (one AES block).
pub const IV_LEN: usize = 16;

pub struct AesCtrCipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl AesCtrCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            key: Zeroizing::new(*key),
        }
    }

    /// Encrypt with a fresh random IV; returns `iv || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let mut buffer = plaintext.to_vec();
        let mut cipher = Aes256Ctr::new((&*self.key).into(), (&iv).into());
        cipher.apply_keystream(&mut buffer);

        let mut envelope = Vec::with_capacity(IV_LEN + buffer.len());
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&buffer);
        envelope
    }

    /// Split the IV off the front and apply the keystream.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        if envelope.len() < IV_LEN {
            return Err(Error::crypto("encrypted message too short"));
        }

        let (iv, ciphertext) = envelope.split_at(IV_LEN);
        let iv: &[u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| Error::crypto("encrypted message too short"))?;
        let mut buffer = ciphertext.to_vec();
        let mut cipher = Aes256Ctr::new((&*self.key).into(), iv.into());
        cipher.apply_keystream(&mut buffer);
        Ok(buffer)
    }
}
