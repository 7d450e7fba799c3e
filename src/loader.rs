//! Loading blueprint descriptors and realm configurations from JSON files.

use std::path::Path;
use tracing::debug;

use crate::error::ClientResult;
use crate::model::{BlueprintDescriptor, RealmConfiguration};

pub fn load_blueprint(path: impl AsRef<Path>) -> ClientResult<BlueprintDescriptor> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)?;
    let blueprint: BlueprintDescriptor = serde_json::from_str(&data)?;
    debug!("Loaded blueprint {} from {}", blueprint.blueprint_id, path.display());
    Ok(blueprint)
}

/// Load a realm configuration. A non-empty `blueprint_id` takes precedence
/// over the one in the file.
pub fn load_realm_configuration(
    path: impl AsRef<Path>,
    blueprint_id: Option<&str>,
) -> ClientResult<RealmConfiguration> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)?;
    let mut config: RealmConfiguration = serde_json::from_str(&data)?;

    if let Some(id) = blueprint_id.filter(|id| !id.is_empty()) {
        config.blueprint_id = id.to_string();
    }
    debug!(
        "Loaded configuration for {} with {} roles and {} users from {}",
        config.blueprint_id,
        config.roles.len(),
        config.users.len(),
        path.display()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_blueprint() {
        let file = file_with(
            r#"{"blueprintID":"bp-1","clientId":"vdc-client","defaultRedirectUri":"https://vdc/*"}"#,
        );
        let blueprint = load_blueprint(file.path()).unwrap();
        assert_eq!(blueprint.blueprint_id, "bp-1");
        assert_eq!(blueprint.client_id, "vdc-client");
        assert_eq!(blueprint.default_redirect_uri, "https://vdc/*");
    }

    #[test]
    fn test_load_configuration_keeps_file_blueprint() {
        let file = file_with(
            r#"{"blueprintID":"bp-file","roles":["admin"],"users":[{"username":"alice","password":"pw","realmRoles":["admin"]}]}"#,
        );
        let config = load_realm_configuration(file.path(), None).unwrap();
        assert_eq!(config.blueprint_id, "bp-file");
        assert_eq!(config.users[0].username, "alice");
        assert!(config.users[0].roles.contains("admin"));
    }

    #[test]
    fn test_explicit_blueprint_overrides_file() {
        let file = file_with(r#"{"roles":["admin"],"users":[]}"#);
        let config = load_realm_configuration(file.path(), Some("bp-cli")).unwrap();
        assert_eq!(config.blueprint_id, "bp-cli");

        let config = load_realm_configuration(file.path(), Some("")).unwrap();
        assert_eq!(config.blueprint_id, "");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_blueprint("/definitely/not/here.json");
        assert!(matches!(result, Err(ClientError::Io(_))));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let file = file_with("{ not json");
        let result = load_realm_configuration(file.path(), None);
        assert!(matches!(result, Err(ClientError::Serialization(_))));
    }
}
