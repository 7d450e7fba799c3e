mod commands;
mod interactive;
mod output;
mod prompt;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kcc::{ClientConfig, ConfigClient};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::{BlueprintArgs, ConfigArgs};
use crate::prompt::Prompter;

#[derive(Parser)]
#[command(name = "kcc")]
#[command(about = "Deliver encrypted realm configurations to a keycloak-config service")]
#[command(version)]
struct Cli {
    /// Service address, e.g. https://config.example.org
    #[arg(short, long, global = true, env = "KCC_ENDPOINT")]
    endpoint: Option<String>,

    /// Accept any TLS certificate presented by the service
    #[arg(long, global = true)]
    insecure: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Retries for transient delivery failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a blueprint realm
    Blueprint(BlueprintArgs),
    /// Create or update a realm configuration
    Config(ConfigArgs),
    /// Menu-driven session (default)
    Interactive,
}

fn init_logging(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "kcc=debug,kcc_cli=debug"
    } else {
        "kcc=info,kcc_cli=info"
    };
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

impl Cli {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::load().context("can't load client configuration")?;
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if self.insecure {
            config.insecure = true;
        }
        if let Some(secs) = self.timeout_secs {
            config.delivery.timeout_secs = Some(secs);
        }
        if let Some(retries) = self.max_retries {
            config.delivery.max_retries = retries;
        }
        debug!("Client configuration: {:?}", config);
        Ok(config)
    }
}

async fn connect(config: &ClientConfig) -> anyhow::Result<ConfigClient> {
    if config.endpoint.trim().is_empty() {
        anyhow::bail!("no endpoint configured (use --endpoint or KCC_ENDPOINT)");
    }
    ConfigClient::connect(config)
        .await
        .with_context(|| format!("Could not create client for {}", config.endpoint))
}

async fn run(command: Commands, config: ClientConfig) -> anyhow::Result<()> {
    if config.insecure {
        output::warning("TLS certificate verification is disabled");
    }

    match command {
        Commands::Blueprint(args) => {
            let blueprint = commands::blueprint_from_args(args)?;
            let client = connect(&config).await?;
            commands::send_blueprint(&client, blueprint).await
        }
        Commands::Config(args) => {
            let realm = commands::realm_configuration_from_args(args)?;
            let client = connect(&config).await?;
            commands::send_config(&client, realm).await
        }
        Commands::Interactive => interactive::run(&mut Prompter::stdio(), config).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let config = cli.client_config()?;
    let command = cli.command.unwrap_or(Commands::Interactive);

    if let Err(e) = run(command, config).await {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
