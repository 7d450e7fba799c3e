//! One-shot subcommands.

use anyhow::{bail, Context};
use clap::Args;
use kcc::loader::{load_blueprint, load_realm_configuration};
use kcc::{BlueprintDescriptor, ConfigClient, RealmConfiguration};
use std::path::PathBuf;

use crate::output;

#[derive(Args, Debug, Default)]
pub struct BlueprintArgs {
    /// JSON file holding the blueprint descriptor
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Blueprint identifier (overrides the file)
    #[arg(long)]
    pub blueprint_id: Option<String>,

    /// Client identifier (overrides the file)
    #[arg(long)]
    pub client_id: Option<String>,

    /// Default redirect URI (overrides the file)
    #[arg(long)]
    pub redirect_uri: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// JSON file holding the realm configuration
    #[arg(short, long)]
    pub file: PathBuf,

    /// Blueprint identifier (overrides the file)
    #[arg(long)]
    pub blueprint_id: Option<String>,
}

/// Resolve a descriptor from an optional file plus flag overrides.
pub fn blueprint_from_args(args: BlueprintArgs) -> anyhow::Result<BlueprintDescriptor> {
    let mut blueprint = match &args.file {
        Some(path) => load_blueprint(path)
            .with_context(|| format!("can't read blueprint file {}", path.display()))?,
        None => BlueprintDescriptor::default(),
    };

    if let Some(id) = args.blueprint_id {
        blueprint.blueprint_id = id;
    }
    if let Some(id) = args.client_id {
        blueprint.client_id = id;
    }
    if let Some(uri) = args.redirect_uri {
        blueprint.default_redirect_uri = uri;
    }

    if blueprint.blueprint_id.trim().is_empty() {
        bail!("a blueprint id is required (--blueprint-id or \"blueprintID\" in the file)");
    }
    if blueprint.client_id.trim().is_empty() {
        bail!("a client id is required (--client-id or \"clientId\" in the file)");
    }
    Ok(blueprint)
}

pub fn realm_configuration_from_args(args: ConfigArgs) -> anyhow::Result<RealmConfiguration> {
    let config = load_realm_configuration(&args.file, args.blueprint_id.as_deref())
        .with_context(|| format!("can't read config file {}", args.file.display()))?;
    if config.blueprint_id.trim().is_empty() {
        bail!("a blueprint id is required (--blueprint-id or \"blueprintID\" in the file)");
    }
    Ok(config)
}

pub async fn send_blueprint(client: &ConfigClient, blueprint: BlueprintDescriptor) -> anyhow::Result<()> {
    let blueprint_id = blueprint.blueprint_id.clone();
    let ack = client
        .send_blueprint(blueprint)
        .await
        .with_context(|| format!("blueprint {} was not initialized", blueprint_id))?;
    output::success(&format!(
        "Blueprint {} initialized (HTTP {}) {}",
        blueprint_id, ack.status, ack.body
    ));
    Ok(())
}

pub async fn send_config(client: &ConfigClient, config: RealmConfiguration) -> anyhow::Result<()> {
    let blueprint_id = config.blueprint_id.clone();
    let report = client
        .send_config(config)
        .await
        .with_context(|| format!("configuration for {} was not delivered", blueprint_id))?;
    if report.messages == 0 {
        output::warning(&format!(
            "Configuration for {} has no users to deliver; nothing was sent",
            blueprint_id
        ));
    } else if report.split {
        output::success(&format!(
            "Configuration for {} delivered in {} per-user messages",
            blueprint_id, report.messages
        ));
    } else {
        output::success(&format!("Configuration for {} delivered", blueprint_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn blueprint_from_flags_only() {
        let blueprint = blueprint_from_args(BlueprintArgs {
            blueprint_id: Some("bp-1".into()),
            client_id: Some("client".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(blueprint.blueprint_id, "bp-1");
        assert_eq!(blueprint.default_redirect_uri, "");
    }

    #[test]
    fn flags_override_blueprint_file() {
        let file = json_file(r#"{"blueprintID":"from-file","clientId":"c","defaultRedirectUri":"https://a/*"}"#);
        let blueprint = blueprint_from_args(BlueprintArgs {
            file: Some(file.path().to_path_buf()),
            blueprint_id: Some("from-flag".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(blueprint.blueprint_id, "from-flag");
        assert_eq!(blueprint.client_id, "c");
        assert_eq!(blueprint.default_redirect_uri, "https://a/*");
    }

    #[test]
    fn blueprint_without_client_id_is_rejected() {
        let err = blueprint_from_args(BlueprintArgs {
            blueprint_id: Some("bp-1".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("client id"));
    }

    #[test]
    fn config_requires_a_blueprint_id() {
        let file = json_file(r#"{"roles":["admin"],"users":[]}"#);
        let err = realm_configuration_from_args(ConfigArgs {
            file: file.path().to_path_buf(),
            blueprint_id: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("blueprint id"));

        let config = realm_configuration_from_args(ConfigArgs {
            file: file.path().to_path_buf(),
            blueprint_id: Some("bp-9".into()),
        })
        .unwrap();
        assert_eq!(config.blueprint_id, "bp-9");
    }
}
