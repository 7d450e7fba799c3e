//! Acquisition and verification of the service's public key.
//!
//! The CRC-32 checksum is checked over the decoded key bytes before they
//! are parsed, so a corrupted key never becomes usable.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::{pkcs8::DecodePublicKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;

/// Response body of `GET /v1/keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMessage {
    pub algorithm: String,
    /// Base64 of the PKIX/SPKI DER public key
    pub key: String,
    pub crc: u32,
}

/// A public key whose checksum has been verified.
#[derive(Debug, Clone)]
pub struct PublicKeyMaterial {
    algorithm: String,
    der: Vec<u8>,
    checksum: u32,
    key: RsaPublicKey,
}

impl PublicKeyMaterial {
    /// Algorithm identifier declared by the service.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Raw SPKI DER bytes as received.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }
}

/// CRC-32 with the reflected IEEE polynomial 0xEDB88320.
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Verify a key message and parse it into usable key material.
pub fn verify_key_message(message: KeyMessage) -> ClientResult<PublicKeyMaterial> {
    let der = BASE64
        .decode(message.key.trim())
        .map_err(|e| ClientError::key_format(format!("key is not valid base64: {}", e)))?;

    let computed = crc32(&der);
    if computed != message.crc {
        error!("key checksum is false {} != {}", message.crc, computed);
        return Err(ClientError::KeyIntegrity {
            declared: message.crc,
            computed,
        });
    }
    debug!("crc is {} == {}", message.crc, computed);

    if !message.algorithm.eq_ignore_ascii_case("rsa") {
        warn!(
            "Service declared key algorithm {:?}, expecting an RSA key container",
            message.algorithm
        );
    }

    let key = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| ClientError::key_format(format!("not an RSA SPKI public key: {}", e)))?;

    Ok(PublicKeyMaterial {
        algorithm: message.algorithm,
        der,
        checksum: computed,
        key,
    })
}

/// Fetch the service key from `{endpoint}/v1/keys` and verify it.
pub async fn fetch_key(transport: &Transport) -> ClientResult<PublicKeyMaterial> {
    let url = transport.keys_url()?;
    debug!("Fetching service key from {}", url);

    let response = transport.http().get(url).send().await.map_err(|e| {
        error!("failed to get key {}", e);
        ClientError::Network(e)
    })?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        error!("Key endpoint returned {}: {}", status, body);
        return Err(ClientError::rejected(status.as_u16(), body));
    }

    let message: KeyMessage = serde_json::from_str(&body).map_err(|e| {
        error!("failed to read key {}", e);
        ClientError::Serialization(e)
    })?;

    verify_key_message(message)
}
