//! Size-driven splitting of realm configurations.
//!
//! A configuration whose JSON form fits within the threshold travels as one
//! message. Anything larger is split at user granularity: one message per
//! user, each carrying the full role set. Users are never packed together,
//! even when several would fit, and an oversized configuration without
//! users produces no message at all.

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::ClientResult;
use crate::model::{RealmConfiguration, SplitByUser};

/// Serialized size, in bytes, above which a configuration is split.
pub const DEFAULT_SPLIT_THRESHOLD: usize = 256;

/// One serialized message ready for encryption.
pub struct DeliveryUnit {
    blueprint_id: String,
    users: usize,
    payload: Zeroizing<Vec<u8>>,
}

impl DeliveryUnit {
    pub fn blueprint_id(&self) -> &str {
        &self.blueprint_id
    }

    /// Number of users carried by this message.
    pub fn users(&self) -> usize {
        self.users
    }

    /// Plaintext JSON of the message.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl std::fmt::Debug for DeliveryUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryUnit")
            .field("blueprint_id", &self.blueprint_id)
            .field("users", &self.users)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

enum Plan {
    Whole(Option<DeliveryUnit>),
    PerUser(SplitByUser),
}

/// Messages produced by [`split_by_size`], in delivery order.
///
/// Split messages are serialized only as they are pulled; the plan is
/// consumed once.
pub struct SplitPlan {
    plan: Plan,
}

impl SplitPlan {
    /// Whether the configuration was split by user.
    pub fn is_split(&self) -> bool {
        matches!(self.plan, Plan::PerUser(_))
    }
}

impl Iterator for SplitPlan {
    type Item = ClientResult<DeliveryUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.plan {
            Plan::Whole(unit) => unit.take().map(Ok),
            Plan::PerUser(splits) => {
                let split = splits.next()?;
                Some(serde_json::to_vec(&split).map_err(Into::into).map(|payload| DeliveryUnit {
                    blueprint_id: split.blueprint_id().to_string(),
                    users: 1,
                    payload: Zeroizing::new(payload),
                }))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.plan {
            Plan::Whole(unit) => {
                let n = usize::from(unit.is_some());
                (n, Some(n))
            }
            Plan::PerUser(splits) => splits.size_hint(),
        }
    }
}

impl ExactSizeIterator for SplitPlan {}

/// Decide how `config` travels given a `threshold` in bytes.
///
/// An oversized configuration is split unconditionally, so one without
/// users yields an empty plan.
pub fn split_by_size(config: RealmConfiguration, threshold: usize) -> ClientResult<SplitPlan> {
    let payload = Zeroizing::new(serde_json::to_vec(&config)?);

    if payload.len() <= threshold {
        debug!(
            "configuration for {} is {} bytes, sending as one message",
            config.blueprint_id,
            payload.len()
        );
        let unit = DeliveryUnit {
            users: config.users.len(),
            blueprint_id: config.blueprint_id,
            payload,
        };
        return Ok(SplitPlan {
            plan: Plan::Whole(Some(unit)),
        });
    }

    if config.users.is_empty() {
        warn!(
            "configuration for {} is {} bytes (threshold {}) and has no users, no message will be sent",
            config.blueprint_id,
            payload.len(),
            threshold
        );
    }

    debug!(
        "configuration for {} is {} bytes (threshold {}), splitting into {} messages",
        config.blueprint_id,
        payload.len(),
        threshold,
        config.users.len()
    );
    Ok(SplitPlan {
        plan: Plan::PerUser(config.split_by_user()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserCredential;
    use std::collections::BTreeSet;

    fn config(users: usize) -> RealmConfiguration {
        RealmConfiguration {
            blueprint_id: "bp-42".to_string(),
            roles: ["operator", "viewer"].into_iter().map(String::from).collect(),
            users: (0..users)
                .map(|i| {
                    UserCredential::new(
                        format!("user-{}", i),
                        format!("correct-horse-battery-{}", i),
                        ["viewer"],
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_small_configuration_is_one_message() {
        let config = config(1);
        let expected = serde_json::to_vec(&config).unwrap();
        assert!(expected.len() <= DEFAULT_SPLIT_THRESHOLD);

        let plan = split_by_size(config, DEFAULT_SPLIT_THRESHOLD).unwrap();
        assert!(!plan.is_split());
        assert_eq!(plan.len(), 1);

        let units: Vec<_> = plan.collect::<ClientResult<_>>().unwrap();
        assert_eq!(units[0].users(), 1);
        assert_eq!(units[0].blueprint_id(), "bp-42");
        assert_eq!(units[0].payload(), expected.as_slice());
    }

    #[test]
    fn test_exact_threshold_is_not_split() {
        let config = config(3);
        let size = serde_json::to_vec(&config).unwrap().len();
        let plan = split_by_size(config, size).unwrap();
        assert!(!plan.is_split());
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_large_configuration_is_split_per_user() {
        let config = config(3);
        assert!(serde_json::to_vec(&config).unwrap().len() > DEFAULT_SPLIT_THRESHOLD);

        let plan = split_by_size(config, DEFAULT_SPLIT_THRESHOLD).unwrap();
        assert!(plan.is_split());
        assert_eq!(plan.len(), 3);

        for (i, unit) in plan.enumerate() {
            let unit = unit.unwrap();
            assert_eq!(unit.users(), 1);
            let decoded: RealmConfiguration = serde_json::from_slice(unit.payload()).unwrap();
            assert_eq!(decoded.blueprint_id, "bp-42");
            assert_eq!(decoded.roles.len(), 2);
            assert_eq!(decoded.users.len(), 1);
            assert_eq!(decoded.users[0].username, format!("user-{}", i));
        }
    }

    #[test]
    fn test_users_are_not_packed_together() {
        // Two users would fit in one message, but splitting is per user.
        let config = config(2);
        let size = serde_json::to_vec(&config).unwrap().len();
        let plan = split_by_size(config, size - 1).unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_oversized_configuration_without_users_sends_nothing() {
        let config = RealmConfiguration {
            blueprint_id: "bp-roles".to_string(),
            roles: (0..40).map(|i| format!("role-{:02}", i)).collect(),
            users: Vec::new(),
        };
        let mut plan = split_by_size(config, DEFAULT_SPLIT_THRESHOLD).unwrap();
        assert!(plan.is_split());
        assert_eq!(plan.len(), 0);
        assert!(plan.next().is_none());
    }

    #[test]
    fn test_small_configuration_without_users_is_one_message() {
        let config = RealmConfiguration {
            blueprint_id: "bp-empty".to_string(),
            roles: BTreeSet::new(),
            users: Vec::new(),
        };
        let plan = split_by_size(config, DEFAULT_SPLIT_THRESHOLD).unwrap();
        assert!(!plan.is_split());
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_plan_is_consumed_once() {
        let mut plan = split_by_size(config(1), DEFAULT_SPLIT_THRESHOLD).unwrap();
        assert!(plan.next().is_some());
        assert!(plan.next().is_none());
        assert_eq!(plan.len(), 0);
    }
}
