//! DES-ECB framing of backup files.
//!
//! Every 8-byte block is encrypted independently with a single key; there is
//! no IV, no chaining and no padding scheme. Callers pad plaintext to a
//! multiple of [`BLOCK_LEN`] before encrypting.

use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use des::Des;
use tracing::trace;

use crate::constants::{BLOCK_LEN, DES_KEY};
use crate::error::{Result, TpconfError};

/// DES-ECB encrypt/decrypt wrapper holding an immutable key
#[derive(Clone)]
pub struct CipherFrame {
    key: [u8; 8],
    cipher: Des,
}

impl CipherFrame {
    /// Create a frame for the given key
    pub fn new(key: [u8; 8]) -> Self {
        let cipher = Des::new(&GenericArray::from(key));
        Self { key, cipher }
    }

    /// Create a frame from a 16-digit hex key
    pub fn from_hex(key: &str) -> Result<Self> {
        let bytes = hex::decode(key.trim())
            .map_err(|e| TpconfError::DecryptionFailure(format!("invalid hex key: {}", e)))?;
        let key: [u8; 8] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            TpconfError::DecryptionFailure(format!("DES keys are 8 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::new(key))
    }

    /// The key this frame was built with
    pub fn key(&self) -> [u8; 8] {
        self.key
    }

    /// Decrypt a whole number of blocks
    pub fn decrypt(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        check_block_aligned(bytes)?;
        trace!(len = bytes.len(), "decrypting DES-ECB frame");

        let mut plain = bytes.to_vec();
        for block in plain.chunks_exact_mut(BLOCK_LEN) {
            self.cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(plain)
    }

    /// Encrypt a whole number of blocks
    pub fn encrypt(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        check_block_aligned(bytes)?;
        trace!(len = bytes.len(), "encrypting DES-ECB frame");

        let mut ciphertext = bytes.to_vec();
        for block in ciphertext.chunks_exact_mut(BLOCK_LEN) {
            self.cipher.encrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(ciphertext)
    }
}

impl Default for CipherFrame {
    fn default() -> Self {
        Self::new(DES_KEY)
    }
}

impl std::fmt::Debug for CipherFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherFrame")
            .field("key", &hex::encode(self.key))
            .finish()
    }
}

fn check_block_aligned(bytes: &[u8]) -> Result<()> {
    if bytes.len() % BLOCK_LEN != 0 {
        return Err(TpconfError::InvalidSize(bytes.len()));
    }
    Ok(())
}
