//! Public-key encryption of outgoing configuration payloads.
//!
//! Uses:
//! - RSA-OAEP with SHA-256 as both the label hash and MGF1 hash
//! - The operating system RNG for padding
//!
//! Each payload must fit a single RSA block; there is no hybrid scheme.

use rand::rngs::OsRng;
use rsa::{traits::PublicKeyParts, Oaep, RsaPublicKey};
use sha2::Sha256;

use crate::error::{ClientError, ClientResult};

/// OAEP padding overhead for a 32-byte hash: `2 * hLen + 2`.
pub const OAEP_SHA256_OVERHEAD: usize = 2 * 32 + 2;

/// Largest plaintext, in bytes, that fits in one block under `key`.
pub fn oaep_capacity(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(OAEP_SHA256_OVERHEAD)
}

/// Encrypt `plaintext` with RSA-OAEP-SHA256.
pub fn encrypt(plaintext: &[u8], key: &RsaPublicKey) -> ClientResult<Vec<u8>> {
    let capacity = oaep_capacity(key);
    if plaintext.len() > capacity {
        return Err(ClientError::EncryptionCapacity {
            len: plaintext.len(),
            capacity,
        });
    }

    key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| match e {
            rsa::Error::MessageTooLong => ClientError::EncryptionCapacity {
                len: plaintext.len(),
                capacity,
            },
            other => ClientError::Encryption(other.to_string()),
        })
}
