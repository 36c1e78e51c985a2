//! Rolling-XOR keystream cipher (FAST security level).
//!
//! Benchmarking only; carries no security guarantee. The keystream is
//! derived deterministically from the key: data is processed in 1024-byte
//! blocks, each XORed with the current 32-byte key, and between blocks the
//! key mutates (a round-dependent XOR followed by a one-bit left rotation).
//! State resets for every frame, so both peers stay in sync without any
//! shared counter.

use zeroize::Zeroizing;

use crate::constants::KEY_LEN;

const BLOCK_SIZE: usize = 1024;

pub struct XorCipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl XorCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            key: Zeroizing::new(*key),
        }
    }

    /// Apply the keystream. XOR is symmetric, so this is both encrypt and
    /// decrypt; the rolling state is local to the call.
    pub fn process(&self, data: &[u8]) -> Vec<u8> {
        let mut output = data.to_vec();
        let mut current_key = *self.key;
        let mut round: u64 = 0;

        let mut pos = 0;
        while pos < output.len() {
            let block_len = BLOCK_SIZE.min(output.len() - pos);
            for i in 0..block_len {
                output[pos + i] ^= current_key[i % KEY_LEN];
            }
            pos += block_len;

            if pos < output.len() {
                round += 1;
                for (i, byte) in current_key.iter_mut().enumerate() {
                    *byte ^= ((round * 31 + i as u64 * 17) & 0xFF) as u8;
                    *byte = byte.rotate_left(1);
                }
            }
        }

        output
    }
}
