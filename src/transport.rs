//! HTTP delivery to the keycloak-config service.
//!
//! Exposes the two POST operations:
//! - Blueprint initialisation (plaintext JSON, `POST /v1/init`)
//! - Encrypted realm configuration (base64 text, `POST /v1/{blueprintID}`)
//!
//! The two endpoints judge success differently and the difference is kept
//! as two named constants.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{header::CONTENT_TYPE, Client, Url};
use std::future::Future;
use tracing::{debug, error, warn};

use crate::config::{ClientConfig, DeliveryPolicy};
use crate::error::{ClientError, ClientResult};
use crate::model::BlueprintDescriptor;

/// Blueprint initialisation succeeds for any status strictly below this.
pub const BLUEPRINT_SUCCESS_CEILING: u16 = 300;

/// Configuration delivery succeeds only for exactly this status.
pub const CONFIG_SUCCESS_STATUS: u16 = 200;

const API_VERSION: &str = "v1";
const KEYS_PATH: &str = "keys";
const INIT_PATH: &str = "init";

pub fn blueprint_accepted(status: u16) -> bool {
    status < BLUEPRINT_SUCCESS_CEILING
}

pub fn config_accepted(status: u16) -> bool {
    status == CONFIG_SUCCESS_STATUS
}

/// Successful response from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub status: u16,
    pub body: String,
}

/// HTTP transport bound to one service endpoint.
pub struct Transport {
    http: Client,
    endpoint: Url,
    policy: DeliveryPolicy,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.endpoint.as_str())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Create a transport from config.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let endpoint = parse_endpoint(&config.endpoint)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.delivery.timeout() {
            builder = builder.timeout(timeout);
        }
        if config.insecure {
            warn!("TLS certificate verification is disabled for {}", endpoint);
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint,
            policy: config.delivery.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// `{endpoint}/v1/keys`
    pub fn keys_url(&self) -> ClientResult<Url> {
        self.url(KEYS_PATH)
    }

    /// `{endpoint}/v1/init`
    pub fn init_url(&self) -> ClientResult<Url> {
        self.url(INIT_PATH)
    }

    /// `{endpoint}/v1/{blueprint_id}`, with the id percent-encoded as one
    /// path segment.
    ///
    /// Empty ids and the dot segments `.` and `..` would resolve to another
    /// path and are rejected.
    pub fn config_url(&self, blueprint_id: &str) -> ClientResult<Url> {
        if matches!(blueprint_id, "" | "." | "..") {
            return Err(ClientError::InvalidEndpoint(format!(
                "blueprint id {:?} is not a usable path segment",
                blueprint_id
            )));
        }
        self.url(blueprint_id)
    }

    fn url(&self, segment: &str) -> ClientResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend([API_VERSION, segment]);
        Ok(url)
    }

    /// Send a blueprint descriptor in plaintext.
    pub async fn post_blueprint_init(&self, descriptor: &BlueprintDescriptor) -> ClientResult<Ack> {
        let url = self.init_url()?;
        let body = serde_json::to_vec(descriptor)?;

        self.with_retry("blueprint init", || {
            let request = self
                .http
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
            async move {
                let response = request.send().await.map_err(|e| {
                    error!("Blueprint init request failed: {}", e);
                    ClientError::Network(e)
                })?;
                read_ack(response, blueprint_accepted).await
            }
        })
        .await
    }

    /// Send one encrypted configuration message.
    pub async fn post_encrypted_config(&self, blueprint_id: &str, ciphertext: &[u8]) -> ClientResult<Ack> {
        let url = self.config_url(blueprint_id)?;
        let body = BASE64.encode(ciphertext);

        self.with_retry("config delivery", || {
            let request = self
                .http
                .post(url.clone())
                .header(CONTENT_TYPE, "text/plain")
                .body(body.clone());
            async move {
                let response = request.send().await.map_err(|e| {
                    error!("Config delivery request failed: {}", e);
                    ClientError::Network(e)
                })?;
                read_ack(response, config_accepted).await
            }
        })
        .await
    }

    async fn with_retry<F, Fut>(&self, operation: &str, mut attempt_once: F) -> ClientResult<Ack>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<Ack>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_once().await {
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "Retrying {} (attempt {}/{}) after {}, waiting {:?}",
                        operation, attempt, self.policy.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

fn parse_endpoint(endpoint: &str) -> ClientResult<Url> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(ClientError::InvalidEndpoint("no endpoint configured".to_string()));
    }
    let url = Url::parse(trimmed).map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", trimmed, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidEndpoint(trimmed.to_string()));
    }
    Ok(url)
}

async fn read_ack(response: reqwest::Response, accepted: fn(u16) -> bool) -> ClientResult<Ack> {
    let status = response.status().as_u16();
    let body = response.text().await?;

    if !accepted(status) {
        error!("Service rejected request with status {}: {}", status, body);
        return Err(ClientError::rejected(status, body));
    }
    debug!("service response is {}", body);
    Ok(Ack { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(endpoint: &str) -> Transport {
        Transport::new(&ClientConfig::with_endpoint(endpoint)).unwrap()
    }

    #[test]
    fn test_blueprint_boundary() {
        assert!(blueprint_accepted(200));
        assert!(blueprint_accepted(204));
        assert!(blueprint_accepted(299));
        assert!(!blueprint_accepted(300));
        assert!(!blueprint_accepted(500));
    }

    #[test]
    fn test_config_boundary() {
        assert!(config_accepted(200));
        assert!(!config_accepted(201));
        assert!(!config_accepted(204));
        assert!(!config_accepted(199));
    }

    #[test]
    fn test_urls() {
        let t = transport("http://localhost:8080");
        assert_eq!(t.keys_url().unwrap().as_str(), "http://localhost:8080/v1/keys");
        assert_eq!(t.init_url().unwrap().as_str(), "http://localhost:8080/v1/init");
        assert_eq!(
            t.config_url("bp-7").unwrap().as_str(),
            "http://localhost:8080/v1/bp-7"
        );
    }

    #[test]
    fn test_urls_keep_base_path() {
        let t = transport("https://gateway.example.org/kcc/");
        assert_eq!(
            t.keys_url().unwrap().as_str(),
            "https://gateway.example.org/kcc/v1/keys"
        );
    }

    #[test]
    fn test_blueprint_id_is_one_segment() {
        let t = transport("http://localhost:8080");
        assert_eq!(
            t.config_url("a/b c").unwrap().as_str(),
            "http://localhost:8080/v1/a%2Fb%20c"
        );
    }

    #[test]
    fn test_dot_segment_blueprint_ids_are_rejected() {
        let t = transport("http://localhost:8080/base/");
        for id in ["", ".", ".."] {
            assert!(
                matches!(t.config_url(id), Err(ClientError::InvalidEndpoint(_))),
                "{id:?} should be rejected"
            );
        }
        assert_eq!(
            t.config_url("..bp").unwrap().as_str(),
            "http://localhost:8080/base/v1/..bp"
        );
    }

    #[test]
    fn test_invalid_endpoints() {
        for endpoint in ["", "   ", "not a url", "mailto:ops@example.org"] {
            let result = Transport::new(&ClientConfig::with_endpoint(endpoint));
            assert!(
                matches!(result, Err(ClientError::InvalidEndpoint(_))),
                "{endpoint:?} should be rejected"
            );
        }
    }
}
