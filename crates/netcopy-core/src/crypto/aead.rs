//! Authenticated cipher envelopes.
//!
//! Both AEAD variants use the same layout: a 12-byte random nonce/IV is
//! prepended and the 16-byte authentication tag is appended, so the
//! envelope is `nonce || ciphertext || tag` and fully self-describing.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;

use crate::constants::KEY_LEN;
use crate::error::{Error, Result};

/// Nonce/IV length for both AEAD variants.
pub const NONCE_LEN: usize = 12;

/// Poly1305/GHASH tag length.
pub const TAG_LEN: usize = 16;

fn random_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// ChaCha20-Poly1305 envelope cipher (HIGH security level).
pub struct ChaChaSeal {
    cipher: ChaCha20Poly1305,
}

impl ChaChaSeal {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(key.into()),
        }
    }

    /// Encrypt with a fresh random nonce; returns `nonce || ciphertext || tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = random_nonce();
        let ciphertext = self
            .cipher
            .encrypt(chacha20poly1305::Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| Error::crypto("encryption failed"))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    /// Split the envelope and decrypt, verifying the tag.
    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        if envelope.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::crypto("encrypted message too short"));
        }

        let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
        self.cipher
            .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::crypto("decryption failed"))
    }
}

/// AES-256-GCM envelope cipher.
pub struct GcmSeal {
    cipher: Aes256Gcm,
}

impl GcmSeal {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Encrypt with a fresh random IV; returns `iv || ciphertext || tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let iv = random_nonce();
        let ciphertext = self
            .cipher
            .encrypt(aes_gcm::Nonce::from_slice(&iv), plaintext)
            .map_err(|_| Error::crypto("encryption failed"))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    /// Split the envelope and decrypt, verifying the tag.
    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        if envelope.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::crypto("encrypted message too short"));
        }

        let (iv, ciphertext) = envelope.split_at(NONCE_LEN);
        self.cipher
            .decrypt(aes_gcm::Nonce::from_slice(iv), ciphertext)
            .map_err(|_| Error::crypto("decryption failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chacha_round_trip() {
        let seal = ChaChaSeal::new(&[0x42u8; 32]);
        let envelope = seal.seal(b"hello world").unwrap();
        assert_eq!(seal.open(&envelope).unwrap(), b"hello world");
    }

    #[test]
    fn chacha_same_plaintext_different_envelopes() {
        let seal = ChaChaSeal::new(&[0x42u8; 32]);
        let a = seal.seal(b"same").unwrap();
        let b = seal.seal(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn chacha_rejects_short_input() {
        let seal = ChaChaSeal::new(&[0u8; 32]);
        assert!(seal.open(&[0u8; NONCE_LEN + TAG_LEN - 1]).is_err());
        assert!(seal.open(&[]).is_err());
    }

    #[test]
    fn gcm_round_trip() {
        let seal = GcmSeal::new(&[0x07u8; 32]);
        let envelope = seal.seal(b"payload bytes").unwrap();
        assert_eq!(seal.open(&envelope).unwrap(), b"payload bytes");
    }

    #[test]
    fn gcm_tag_tamper_detected() {
        let seal = GcmSeal::new(&[0x07u8; 32]);
        let mut envelope = seal.seal(b"payload").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0xFF;
        assert!(seal.open(&envelope).is_err());
    }

    #[test]
    fn gcm_rejects_short_input() {
        let seal = GcmSeal::new(&[0u8; 32]);
        assert!(seal.open(&[0u8; 10]).is_err());
    }
}
