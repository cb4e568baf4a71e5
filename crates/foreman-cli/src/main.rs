use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::ForemanConfig;
use foreman_core::{
    CredentialStore, DelegationEngine, ModelCatalog, ProviderRegistry, Roster, Store, Transcript,
};
use foreman_store::SqliteStore;

#[derive(Parser)]
#[command(name = "foreman")]
#[command(version)]
#[command(about = "Foreman — delegate work to a team of model-backed agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Owner identity (overrides the config file)
    #[arg(short, long, global = true)]
    owner: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Manage provider credentials
    #[command(subcommand)]
    Credential(CredentialCommands),

    /// Manage enabled models
    #[command(subcommand)]
    Model(ModelCommands),

    /// Manage teams
    #[command(subcommand)]
    Team(TeamCommands),

    /// Manage agents
    #[command(subcommand)]
    Agent(AgentCommands),

    /// Talk to a team
    #[command(subcommand)]
    Chat(ChatCommands),
}

#[derive(Subcommand)]
enum CredentialCommands {
    /// Validate and store a provider credential
    Set {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        secret: String,
        /// Custom API endpoint override
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// List stored credentials (secrets are not printed)
    List,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Enable a model the provider offers
    Enable {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        model: String,
    },
    /// Disable a previously enabled model
    Disable {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        model: String,
    },
    /// List enabled models
    List,
    /// List the models a provider currently offers
    Available {
        #[arg(long)]
        provider: String,
    },
}

#[derive(Subcommand)]
enum TeamCommands {
    /// Create a team with its project manager
    Create {
        #[arg(long)]
        name: String,
        /// What the team is for
        #[arg(long)]
        function: Option<String>,
        /// Enabled-model id backing the project manager
        #[arg(long)]
        pm_model: String,
    },
    /// List your teams
    List,
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Add a member agent to a team
    Add {
        #[arg(long)]
        team: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: Option<String>,
        /// Enabled-model id backing the agent
        #[arg(long)]
        model: String,
    },
    /// List a team's agents
    List {
        #[arg(long)]
        team: String,
    },
}

#[derive(Subcommand)]
enum ChatCommands {
    /// Send a message to a team and print the manager's reply
    Send {
        #[arg(long)]
        team: String,
        message: String,
    },
    /// Print a team's transcript
    History {
        #[arg(long)]
        team: String,
    },
}

/// All services wired over one store and one provider registry.
struct App {
    credentials: Arc<CredentialStore>,
    catalog: Arc<ModelCatalog>,
    roster: Arc<Roster>,
    transcript: Arc<Transcript>,
    engine: Arc<DelegationEngine>,
    registry: Arc<ProviderRegistry>,
    owner: String,
}

impl App {
    fn build(config: &ForemanConfig, owner_override: Option<String>) -> Result<Self> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::new(&db_path)
                .with_context(|| format!("Failed to open database at {}", db_path.display()))?,
        );

        let registry = Arc::new(ProviderRegistry::with_defaults());
        let credentials = Arc::new(CredentialStore::new(Arc::clone(&store), Arc::clone(&registry)));
        let catalog = Arc::new(ModelCatalog::new(Arc::clone(&store), Arc::clone(&registry)));
        let roster = Arc::new(Roster::new(Arc::clone(&store), Arc::clone(&catalog)));
        let transcript = Arc::new(Transcript::new(Arc::clone(&store)));
        let engine = Arc::new(DelegationEngine::new(
            Arc::clone(&roster),
            Arc::clone(&catalog),
            Arc::clone(&credentials),
            Arc::clone(&registry),
            Arc::clone(&transcript),
            config.engine_config(),
        ));

        Ok(Self {
            credentials,
            catalog,
            roster,
            transcript,
            engine,
            registry,
            owner: owner_override.unwrap_or_else(|| config.owner.clone()),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    if matches!(cli.command, Commands::Init) {
        return cmd_init().await;
    }

    let config = ForemanConfig::load(cli.config.as_ref())?;
    let app = App::build(&config, cli.owner)?;

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Credential(cmd) => cmd_credential(&app, cmd).await,
        Commands::Model(cmd) => cmd_model(&app, cmd).await,
        Commands::Team(cmd) => cmd_team(&app, cmd).await,
        Commands::Agent(cmd) => cmd_agent(&app, cmd).await,
        Commands::Chat(cmd) => cmd_chat(&app, cmd).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        let default_config = toml::to_string_pretty(&ForemanConfig::default())?;
        tokio::fs::write(&config_path, default_config).await?;
        info!("Created default config at {}", config_path.display());
        println!("Foreman initialized at {}", config_dir.display());
        println!("Edit {} to set your owner identity.", config_path.display());
    }
    Ok(())
}

async fn cmd_credential(app: &App, cmd: CredentialCommands) -> Result<()> {
    match cmd {
        CredentialCommands::Set {
            provider,
            secret,
            endpoint,
        } => {
            app.credentials
                .set(&app.owner, &provider, &secret, endpoint)
                .await?;
            println!("Credential for provider '{provider}' saved.");
        }
        CredentialCommands::List => {
            let creds = app.credentials.list(&app.owner).await?;
            if creds.is_empty() {
                println!("No credentials stored.");
            }
            for cred in creds {
                match cred.endpoint {
                    Some(endpoint) => println!("{}  (endpoint: {endpoint})", cred.provider),
                    None => println!("{}", cred.provider),
                }
            }
        }
    }
    Ok(())
}

async fn cmd_model(app: &App, cmd: ModelCommands) -> Result<()> {
    match cmd {
        ModelCommands::Enable { provider, model } => {
            let enabled = app.catalog.enable(&app.owner, &provider, &model).await?;
            println!("Enabled {}/{} (id: {})", enabled.provider, enabled.model, enabled.id);
        }
        ModelCommands::Disable { provider, model } => {
            app.catalog.disable(&app.owner, &provider, &model).await?;
            println!("Disabled {provider}/{model}");
        }
        ModelCommands::List => {
            let models = app.catalog.list(&app.owner).await?;
            if models.is_empty() {
                println!("No models enabled.");
            }
            for m in models {
                println!("{}  {}/{}", m.id, m.provider, m.model);
            }
        }
        ModelCommands::Available { provider } => {
            let cred = app.credentials.get(&app.owner, &provider).await?;
            let adapter = app.registry.get(&provider)?;
            let models = adapter
                .list_models(&cred.secret, cred.endpoint.as_deref())
                .await?;
            for model in models {
                println!("{model}");
            }
        }
    }
    Ok(())
}

async fn cmd_team(app: &App, cmd: TeamCommands) -> Result<()> {
    match cmd {
        TeamCommands::Create {
            name,
            function,
            pm_model,
        } => {
            let team = app
                .roster
                .create_team(&app.owner, &name, function, &pm_model)
                .await?;
            println!("Created team '{}' (id: {})", team.name, team.id);
        }
        TeamCommands::List => {
            let teams = app.roster.list_teams(&app.owner).await?;
            if teams.is_empty() {
                println!("No teams yet.");
            }
            for team in teams {
                match team.function {
                    Some(function) => println!("{}  {} — {function}", team.id, team.name),
                    None => println!("{}  {}", team.id, team.name),
                }
            }
        }
    }
    Ok(())
}

async fn cmd_agent(app: &App, cmd: AgentCommands) -> Result<()> {
    match cmd {
        AgentCommands::Add {
            team,
            name,
            role,
            model,
        } => {
            let agent = app
                .roster
                .add_agent(&app.owner, &team, &name, role, &model)
                .await?;
            println!("Added agent '{}' (id: {})", agent.name, agent.id);
        }
        AgentCommands::List { team } => {
            let agents = app.roster.list_agents(&app.owner, &team).await?;
            for agent in agents {
                let marker = if agent.is_manager { " [manager]" } else { "" };
                match agent.role {
                    Some(role) => println!("{}  {}{marker} — {role}", agent.id, agent.name),
                    None => println!("{}  {}{marker}", agent.id, agent.name),
                }
            }
        }
    }
    Ok(())
}

async fn cmd_chat(app: &App, cmd: ChatCommands) -> Result<()> {
    match cmd {
        ChatCommands::Send { team, message } => {
            let outcome = app.engine.process(&app.owner, &team, &message).await?;
            println!("{}", outcome.reply);
        }
        ChatCommands::History { team } => {
            let messages = app.transcript.list(&app.owner, &team).await?;
            for msg in messages {
                println!(
                    "[{}] {} ({}):\n{}\n",
                    msg.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    msg.sender,
                    msg.sender_id,
                    msg.body
                );
            }
        }
    }
    Ok(())
}
