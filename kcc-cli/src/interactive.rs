//! Menu-driven operator dialogue.
//!
//! The builders only assemble values; delivery goes through
//! [`ConfigClient`] once the operator confirms.

use anyhow::Context;
use crossterm::style::Color;
use kcc::loader::{load_blueprint, load_realm_configuration};
use kcc::{BlueprintDescriptor, ClientConfig, ConfigClient, RealmConfiguration, UserCredential};
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use crate::prompt::Prompter;

const MAIN_MENU: [&str; 3] = [
    "Create a new Blueprint Realm",
    "Create or Update a Realm Config",
    "quit",
];

/// Ask for a blueprint descriptor, from a file or field by field.
///
/// Returns `None` when the operator declines.
pub fn build_blueprint<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> anyhow::Result<Option<BlueprintDescriptor>> {
    if !prompter.confirm("Do you want to initialize a new Blueprint?")? {
        return Ok(None);
    }

    if prompter.confirm("Load a Blueprint Config from a file?")? {
        let path = prompter.existing_path("Enter the path to the file you want to load:")?;
        let blueprint = load_blueprint(&path)
            .with_context(|| format!("can't read blueprint file {}", path.display()))?;
        return Ok(Some(blueprint));
    }

    Ok(Some(BlueprintDescriptor {
        blueprint_id: prompter.required("What is the BlueprintID?")?,
        client_id: prompter.required("What is the clientID?")?,
        default_redirect_uri: prompter.text("What is the default redirect URI? (may be empty)")?,
    }))
}

/// Ask for a realm configuration. `known_blueprint` skips the blueprint
/// question when the session already initialised one.
pub fn build_realm_configuration<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    known_blueprint: Option<&str>,
) -> anyhow::Result<Option<RealmConfiguration>> {
    if !prompter.confirm("Do you want to create/update a Config?")? {
        return Ok(None);
    }

    let blueprint_id = match known_blueprint {
        Some(id) => id.to_string(),
        None => prompter.required("What is the BlueprintID?")?,
    };

    if prompter.confirm("Load a User Config from a file?")? {
        let path = prompter.existing_path("Enter the path to the file you want to load:")?;
        let config = load_realm_configuration(&path, Some(&blueprint_id))
            .with_context(|| format!("can't read config file {}", path.display()))?;
        return Ok(Some(config));
    }

    let mut roles = BTreeSet::new();
    loop {
        roles.insert(prompter.required("Enter a role name used by your VDC")?);
        if !prompter.confirm("Add another role?")? {
            break;
        }
    }
    let role_names: Vec<String> = roles.iter().cloned().collect();

    let mut users = Vec::new();
    loop {
        let username = prompter.required("Enter a username")?;
        let password = prompter.secret("Enter a password")?;

        let mut user_roles = BTreeSet::new();
        loop {
            let index = prompter.menu(&format!("Select role for {}", username), &role_names)?;
            user_roles.insert(role_names[index].clone());
            if !prompter.confirm("Add another role?")? {
                break;
            }
        }
        users.push(UserCredential::new(username, password, user_roles));

        if !prompter.confirm("Add another user?")? {
            break;
        }
    }

    Ok(Some(RealmConfiguration {
        blueprint_id,
        roles,
        users,
    }))
}

fn is_end_of_input(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::UnexpectedEof)
}

/// Run the dialogue until the operator quits or input ends.
pub async fn run<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    mut config: ClientConfig,
) -> anyhow::Result<()> {
    if config.endpoint.trim().is_empty() {
        config.endpoint =
            prompter.required("What is the keycloak-config endpoint you want to use?")?;
    }

    let client = ConfigClient::connect(&config)
        .await
        .context("Could not create client")?;
    prompter.say(&format!("Connected to {}", client.endpoint()), Color::Green)?;

    let mut known_blueprint: Option<String> = None;
    loop {
        match prompter.menu("What do you want to do?", &MAIN_MENU)? {
            0 => {
                let blueprint = match build_blueprint(prompter) {
                    Ok(Some(blueprint)) => blueprint,
                    Ok(None) => continue,
                    Err(e) if is_end_of_input(&e) => return Err(e),
                    Err(e) => {
                        prompter.say(&format!("{:#}", e), Color::Red)?;
                        continue;
                    }
                };
                let question = format!("Do you want to commit this blueprint?\n{:#?}", blueprint);
                if !prompter.confirm(&question)? {
                    continue;
                }
                let blueprint_id = blueprint.blueprint_id.clone();
                match client.send_blueprint(blueprint).await {
                    Ok(ack) => {
                        prompter.say(&format!("Blueprint {} initialized: {}", blueprint_id, ack.body), Color::Green)?;
                        known_blueprint = Some(blueprint_id);
                    }
                    Err(e) => prompter.say(&format!("Failed to send blueprint: {}", e), Color::Red)?,
                }
            }
            1 => {
                let realm = match build_realm_configuration(prompter, known_blueprint.as_deref()) {
                    Ok(Some(realm)) => realm,
                    Ok(None) => continue,
                    Err(e) if is_end_of_input(&e) => return Err(e),
                    Err(e) => {
                        prompter.say(&format!("{:#}", e), Color::Red)?;
                        continue;
                    }
                };
                known_blueprint = Some(realm.blueprint_id.clone());
                let question = format!("Do you want to commit this config?\n{:#?}", realm);
                if !prompter.confirm(&question)? {
                    continue;
                }
                match client.send_config(realm).await {
                    Ok(report) => prompter.say(
                        &format!("Configuration delivered in {} message(s)", report.messages),
                        Color::Green,
                    )?,
                    Err(e) => prompter.say(&format!("Failed to send config: {}", e), Color::Red)?,
                }
            }
            _ => {
                prompter.say("Bye.", Color::Green)?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn declined_blueprint_is_none() {
        let mut p = prompter("n\n");
        assert!(build_blueprint(&mut p).unwrap().is_none());
    }

    #[test]
    fn blueprint_from_answers() {
        let mut p = prompter("y\nn\nbp-7\nvdc-client\nhttps://vdc.example.org/*\n");
        let blueprint = build_blueprint(&mut p).unwrap().unwrap();
        assert_eq!(
            blueprint,
            BlueprintDescriptor {
                blueprint_id: "bp-7".to_string(),
                client_id: "vdc-client".to_string(),
                default_redirect_uri: "https://vdc.example.org/*".to_string(),
            }
        );
    }

    #[test]
    fn realm_configuration_from_answers() {
        let input = [
            "y",      // create config
            "bp-7",   // blueprint id
            "n",      // not from file
            "admin",  // role
            "y",      // another role
            "viewer", // role
            "n",      // no more roles
            "alice",  // username
            "pw-a",   // password
            "0",      // admin
            "y",      // another role
            "1",      // viewer
            "n",      // no more roles
            "y",      // another user
            "bob",    // username
            "pw-b",   // password
            "9",      // invalid selection
            "1",      // viewer
            "n",      // no more roles
            "n",      // no more users
        ]
        .join("\n")
            + "\n";

        let mut p = prompter(&input);
        let config = build_realm_configuration(&mut p, None).unwrap().unwrap();

        assert_eq!(config.blueprint_id, "bp-7");
        assert_eq!(config.roles.len(), 2);
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users[0].username, "alice");
        assert_eq!(config.users[0].password, "pw-a");
        assert_eq!(config.users[0].roles.len(), 2);
        assert_eq!(config.users[1].username, "bob");
        assert!(config.users[1].roles.contains("viewer"));
        assert!(config.undeclared_roles().is_empty());
    }

    #[test]
    fn known_blueprint_is_not_asked_again() {
        let mut p = prompter("y\nn\nadmin\nn\nalice\npw\n0\nn\nn\n");
        let config = build_realm_configuration(&mut p, Some("bp-known")).unwrap().unwrap();
        assert_eq!(config.blueprint_id, "bp-known");
        assert_eq!(config.users.len(), 1);
    }

    #[test]
    fn truncated_dialogue_reports_end_of_input() {
        let mut p = prompter("y\n");
        let err = build_realm_configuration(&mut p, None).unwrap_err();
        assert!(is_end_of_input(&err));
    }
}
