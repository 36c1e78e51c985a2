//! The pluggable cipher suite behind the secure channel.
//!
//! Four interchangeable ciphers share one encrypt/decrypt contract. Each
//! variant embeds any randomness it needs (nonce or IV) directly in its
//! output, so the framing layer never needs to know which one is active.
//! Cipher selection happens once per session during the handshake.

pub mod aead;
pub mod aes_ctr;
pub mod kdf;
pub mod xor;

use zeroize::Zeroizing;

use crate::constants::KEY_LEN;
use crate::error::{Error, Result};

/// Security level negotiated during the handshake. The discriminant is the
/// wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SecurityLevel {
    /// ChaCha20-Poly1305 AEAD.
    High = 0,
    /// Rolling XOR keystream. Benchmarking only; no security guarantee.
    Fast = 1,
    /// AES-256-CTR. Unauthenticated: ciphertext is malleable.
    Aes = 2,
    /// AES-256-GCM AEAD.
    Aes256Gcm = 3,
}

impl SecurityLevel {
    /// Decode a wire byte.
    pub fn from_wire(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SecurityLevel::High),
            1 => Ok(SecurityLevel::Fast),
            2 => Ok(SecurityLevel::Aes),
            3 => Ok(SecurityLevel::Aes256Gcm),
            other => Err(Error::protocol(format!(
                "unknown security level: {}",
                other
            ))),
        }
    }

    pub fn as_wire(self) -> u8 {
        self as u8
    }

    /// True for the ciphers whose envelopes carry an authentication tag.
    pub fn is_authenticated(self) -> bool {
        matches!(self, SecurityLevel::High | SecurityLevel::Aes256Gcm)
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SecurityLevel::High => "HIGH (ChaCha20-Poly1305)",
            SecurityLevel::Fast => "FAST (XOR cipher)",
            SecurityLevel::Aes => "AES (AES-256-CTR)",
            SecurityLevel::Aes256Gcm => "AES-256-GCM",
        };
        f.write_str(name)
    }
}

/// The 32-byte pre-shared key.
///
/// The only accepted key material is a 64-character hex string, optionally
/// `0x`-prefixed. Key bytes are zeroized on drop.
pub struct SecretKey(Zeroizing<[u8; KEY_LEN]>);

impl SecretKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parse a hex-encoded key.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let stripped = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        if stripped.len() != KEY_LEN * 2 {
            return Err(Error::crypto(format!(
                "invalid secret key length: expected {} hex characters, got {}",
                KEY_LEN * 2,
                stripped.len()
            )));
        }

        let bytes = hex::decode(stripped)
            .map_err(|_| Error::crypto("secret key is not valid hex"))?;
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        Ok(Self(Zeroizing::new(key)))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// A per-session cipher instance.
///
/// `encrypt` produces the self-describing envelope for one frame; `decrypt`
/// consumes it. Both are pure with respect to session state: the XOR variant
/// resets its keystream for every frame, and the AEAD variants draw a fresh
/// random nonce/IV per call.
pub enum CipherSuite {
    High(aead::ChaChaSeal),
    Fast(xor::XorCipher),
    Aes(aes_ctr::AesCtrCipher),
    Aes256Gcm(aead::GcmSeal),
}

impl CipherSuite {
    /// Construct the cipher for the negotiated level from the pre-shared key.
    pub fn new(level: SecurityLevel, key: &SecretKey) -> Self {
        match level {
            SecurityLevel::High => CipherSuite::High(aead::ChaChaSeal::new(key.as_bytes())),
            SecurityLevel::Fast => CipherSuite::Fast(xor::XorCipher::new(key.as_bytes())),
            SecurityLevel::Aes => CipherSuite::Aes(aes_ctr::AesCtrCipher::new(key.as_bytes())),
            SecurityLevel::Aes256Gcm => {
                CipherSuite::Aes256Gcm(aead::GcmSeal::new(key.as_bytes()))
            }
        }
    }

    pub fn security_level(&self) -> SecurityLevel {
        match self {
            CipherSuite::High(_) => SecurityLevel::High,
            CipherSuite::Fast(_) => SecurityLevel::Fast,
            CipherSuite::Aes(_) => SecurityLevel::Aes,
            CipherSuite::Aes256Gcm(_) => SecurityLevel::Aes256Gcm,
        }
    }

    /// Encrypt one frame payload into its envelope.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match self {
            CipherSuite::High(cipher) => cipher.seal(plaintext),
            CipherSuite::Fast(cipher) => Ok(cipher.process(plaintext)),
            CipherSuite::Aes(cipher) => Ok(cipher.encrypt(plaintext)),
            CipherSuite::Aes256Gcm(cipher) => cipher.seal(plaintext),
        }
    }

    /// Decrypt one envelope back to the frame payload.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        match self {
            CipherSuite::High(cipher) => cipher.open(envelope),
            CipherSuite::Fast(cipher) => Ok(cipher.process(envelope)),
            CipherSuite::Aes(cipher) => cipher.decrypt(envelope),
            CipherSuite::Aes256Gcm(cipher) => cipher.open(envelope),
        }
    }
}
