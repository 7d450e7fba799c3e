//! Values handed to the client by its callers.
//!
//! Field names match the wire format of the keycloak-config service.
//! Passwords are zeroized on drop and never appear in `Debug` output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use zeroize::Zeroize;

/// Client registration data for a blueprint realm, sent once in plaintext.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintDescriptor {
    #[serde(rename = "blueprintID")]
    pub blueprint_id: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    #[serde(rename = "defaultRedirectUri", default)]
    pub default_redirect_uri: String,
}

/// A user to provision in the realm.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredential {
    pub username: String,
    pub password: String,
    #[serde(rename = "realmRoles", default)]
    pub roles: BTreeSet<String>,
}

impl UserCredential {
    pub fn new<I, S>(username: impl Into<String>, password: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            password: password.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

impl Drop for UserCredential {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

impl std::fmt::Debug for UserCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

/// Roles and users to provision under a blueprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmConfiguration {
    #[serde(rename = "blueprintID", default)]
    pub blueprint_id: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub users: Vec<UserCredential>,
}

impl RealmConfiguration {
    /// User roles that are missing from the configuration's role set.
    ///
    /// The service does not enforce this contract, so callers only get a
    /// report of the offending `(username, role)` pairs.
    pub fn undeclared_roles(&self) -> Vec<(&str, &str)> {
        self.users
            .iter()
            .flat_map(|user| {
                user.roles
                    .iter()
                    .filter(|role| !self.roles.contains(*role))
                    .map(move |role| (user.username.as_str(), role.as_str()))
            })
            .collect()
    }

    /// One single-user configuration per user, in order.
    pub fn split_by_user(self) -> SplitByUser {
        let RealmConfiguration {
            blueprint_id,
            roles,
            users,
        } = self;
        SplitByUser {
            blueprint_id,
            roles,
            users: users.into_iter(),
        }
    }
}

/// A realm configuration restricted to exactly one user. It keeps the full
/// role set and blueprint id and serializes like a [`RealmConfiguration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitConfiguration {
    blueprint_id: String,
    roles: BTreeSet<String>,
    user: UserCredential,
}

impl SplitConfiguration {
    pub fn blueprint_id(&self) -> &str {
        &self.blueprint_id
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn user(&self) -> &UserCredential {
        &self.user
    }
}

#[derive(Serialize)]
struct SplitWire<'a> {
    #[serde(rename = "blueprintID")]
    blueprint_id: &'a str,
    roles: &'a BTreeSet<String>,
    users: [&'a UserCredential; 1],
}

impl Serialize for SplitConfiguration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SplitWire {
            blueprint_id: &self.blueprint_id,
            roles: &self.roles,
            users: [&self.user],
        }
        .serialize(serializer)
    }
}

/// Iterator returned by [`RealmConfiguration::split_by_user`].
#[derive(Debug)]
pub struct SplitByUser {
    blueprint_id: String,
    roles: BTreeSet<String>,
    users: std::vec::IntoIter<UserCredential>,
}

impl Iterator for SplitByUser {
    type Item = SplitConfiguration;

    fn next(&mut self) -> Option<Self::Item> {
        let user = self.users.next()?;
        Some(SplitConfiguration {
            blueprint_id: self.blueprint_id.clone(),
            roles: self.roles.clone(),
            user,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.users.size_hint()
    }
}

impl ExactSizeIterator for SplitByUser {}
