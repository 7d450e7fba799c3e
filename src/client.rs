//! Orchestration of key acquisition, splitting, encryption and delivery.

use reqwest::Url;
use tracing::{error, info, warn};

use crate::config::ClientConfig;
use crate::crypto::encrypt;
use crate::error::ClientResult;
use crate::key::{fetch_key, PublicKeyMaterial};
use crate::model::{BlueprintDescriptor, RealmConfiguration};
use crate::split::split_by_size;
use crate::transport::{Ack, Transport};

/// Outcome of a successful [`ConfigClient::send_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Encrypted messages accepted by the service
    pub messages: usize,
    /// Whether the configuration was split by user
    pub split: bool,
}

/// Client for the keycloak-config service.
///
/// Holds the verified service key and endpoint, both fixed at construction.
/// A client only exists once key acquisition has succeeded.
///
/// Multi-message deliveries are not atomic: when a later message is
/// rejected, the messages before it stay committed on the service.
pub struct ConfigClient {
    transport: Transport,
    key: PublicKeyMaterial,
    split_threshold: usize,
}

impl std::fmt::Debug for ConfigClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigClient")
            .field("endpoint", &self.transport.endpoint().as_str())
            .field("key_checksum", &self.key.checksum())
            .field("split_threshold", &self.split_threshold)
            .finish_non_exhaustive()
    }
}

impl ConfigClient {
    /// Fetch and verify the service key, then build a ready client.
    pub async fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let transport = Transport::new(config)?;

        let key = fetch_key(&transport).await.map_err(|e| {
            error!("failed to create client for {}: {}", transport.endpoint(), e);
            e
        })?;
        info!(
            "Acquired {} service key from {} (crc {:#010x})",
            key.algorithm(),
            transport.endpoint(),
            key.checksum()
        );

        Ok(Self {
            transport,
            key,
            split_threshold: config.split_threshold,
        })
    }

    pub fn endpoint(&self) -> &Url {
        self.transport.endpoint()
    }

    pub fn key(&self) -> &PublicKeyMaterial {
        &self.key
    }

    pub fn split_threshold(&self) -> usize {
        self.split_threshold
    }

    /// Register a blueprint. The descriptor carries no credentials and is
    /// sent unencrypted.
    pub async fn send_blueprint(&self, descriptor: BlueprintDescriptor) -> ClientResult<Ack> {
        let ack = self.transport.post_blueprint_init(&descriptor).await?;
        info!("Blueprint {} initialised", descriptor.blueprint_id);
        Ok(ack)
    }

    /// Encrypt and deliver a realm configuration, splitting it by user when
    /// its serialized form exceeds the threshold.
    ///
    /// Stops at the first failed message and returns that failure. A
    /// blueprint id that cannot name a delivery path fails before anything
    /// is encrypted.
    pub async fn send_config(&self, config: RealmConfiguration) -> ClientResult<DeliveryReport> {
        for (username, role) in config.undeclared_roles() {
            warn!(
                "User {} has role {} which is not declared for blueprint {}",
                username, role, config.blueprint_id
            );
        }

        let blueprint_id = config.blueprint_id.clone();
        self.transport.config_url(&blueprint_id)?;
        let plan = split_by_size(config, self.split_threshold)?;
        let split = plan.is_split();
        let total = plan.len();
        let mut delivered = 0;

        for unit in plan {
            let outcome = match unit {
                Ok(unit) => self.deliver(unit.blueprint_id(), unit.payload()).await,
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                if delivered > 0 {
                    warn!(
                        "Delivery for {} stopped after {}/{} messages; delivered messages remain committed",
                        blueprint_id, delivered, total
                    );
                }
                return Err(e);
            }
            delivered += 1;
        }

        info!(
            "Delivered configuration for {} in {} message(s)",
            blueprint_id, delivered
        );
        Ok(DeliveryReport {
            messages: delivered,
            split,
        })
    }

    async fn deliver(&self, blueprint_id: &str, payload: &[u8]) -> ClientResult<Ack> {
        let ciphertext = encrypt(payload, self.key.rsa()).map_err(|e| {
            error!("failed to encrypt config for {}: {}", blueprint_id, e);
            e
        })?;
        self.transport.post_encrypted_config(blueprint_id, &ciphertext).await
    }
}
