//! Key derivation for the keygen tool and password fallback paths.
//!
//! PBKDF2-HMAC-SHA-256 over a fixed salt, so the same master password
//! always yields the same 32-byte key on every installation.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::constants::KEY_LEN;

/// Fixed derivation salt. Shared by every installation: changing it breaks
/// every already-distributed key.
pub const FIXED_SALT: &[u8; 32] = b"NetCopySalt1234567890ABCDEFGHIJK";

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derive the 32-byte pre-shared key from a master password.
pub fn derive_key(password: &str) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        FIXED_SALT,
        PBKDF2_ITERATIONS,
        &mut *key,
    );
    key
}
