//! Encrypted configuration delivery for the keycloak-config service.
//!
//! ```ignore
//! let client = ConfigClient::connect(&ClientConfig::load()?).await?;
//! client.send_blueprint(blueprint).await?;
//! let report = client.send_config(realm).await?;
//! ```

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod key;
pub mod loader;
pub mod model;
pub mod split;
pub mod transport;

pub use self::client::{ConfigClient, DeliveryReport};
pub use self::config::{ClientConfig, DeliveryPolicy};
pub use self::error::{ClientError, ClientResult};
pub use self::key::PublicKeyMaterial;
pub use self::model::{BlueprintDescriptor, RealmConfiguration, SplitConfiguration, UserCredential};
pub use self::transport::Ack;
