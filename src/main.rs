use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rmcp::schemars::JsonSchema;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storychain::config::{self, StorychainConfig};
use storychain::game::{parse_word_list, StartOptions};
use storychain::ledger::{self, LedgerFormat, RoundLedger};
use storychain::{GameSession, StoryEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One-word story game MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to $STORYCHAIN_DIR/storychain.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file, overriding the config
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Read and write the ledger in the legacy text format
    #[arg(long, global = true, default_value_t = false)]
    legacy: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Print the latest story of every round
    History,
    /// Write every ledger entry to a legacy text file
    ExportLegacy { output: PathBuf },
    /// Append every entry of a legacy text file to the ledger
    ImportLegacy { input: PathBuf },
}

#[derive(Clone)]
struct AppState {
    session: GameSession,
    tool_router: ToolRouter<Self>,
}

#[derive(Deserialize, Serialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
struct StartGameArgs {
    /// Story topic (e.g. "new product ideas", "fantasy novel")
    topic: Option<String>,
    /// Number of words that completes the story
    limit: Option<u32>,
    /// Comma-separated forbidden words, e.g. "and,but"
    forbidden: Option<String>,
    /// Opening text the story starts from
    seed_text: Option<String>,
    /// Round number recorded with the finished story
    round: Option<u32>,
}

#[derive(Deserialize, Serialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
struct AddWordArgs {
    /// Name of the player contributing
    user_name: String,
    /// The player's message; the word is cut out of it
    word: String,
}

#[derive(Deserialize, Serialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
struct LoadRoundArgs {
    /// Round number to continue from
    round: u32,
    /// Number of words that completes the story
    limit: Option<u32>,
    /// Comma-separated forbidden words
    forbidden: Option<String>,
}

impl AppState {
    fn new(session: GameSession) -> Self {
        Self {
            session,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl AppState {
    #[tool(
        description = "Start a new one-word story game. Resets any unfinished story. Optionally set the topic, word limit, comma-separated forbidden words, an opening text and a round number."
    )]
    async fn start_game(&self, Parameters(args): Parameters<StartGameArgs>) -> String {
        tracing::info!(topic = ?args.topic, round = ?args.round, "start_game");
        let options = StartOptions {
            topic: args.topic,
            limit: args.limit.map(|l| l as usize),
            forbidden: args.forbidden.as_deref().map(parse_word_list),
            seed_text: args.seed_text,
            round_number: args.round,
        };
        self.session.start_game(options).await
    }

    #[tool(
        description = "Add a player's word to the story. The same player cannot play twice in a row and forbidden words are rejected. Reports progress, and the finished story once the word limit is reached."
    )]
    async fn add_word(&self, Parameters(args): Parameters<AddWordArgs>) -> String {
        self.session.add_word(&args.user_name, &args.word).await
    }

    #[tool(
        description = "Continue from the most recent recorded story of a round. Starts a new game seeded with that story's text."
    )]
    async fn load_round(&self, Parameters(args): Parameters<LoadRoundArgs>) -> String {
        tracing::info!(round = args.round, "load_round");
        let options = StartOptions {
            limit: args.limit.map(|l| l as usize),
            forbidden: args.forbidden.as_deref().map(parse_word_list),
            ..Default::default()
        };
        self.session.load_round(args.round, options).await
    }

    #[tool(description = "List the latest recorded story for each round")]
    async fn list_rounds(&self) -> String {
        self.session.list_rounds().await
    }

    #[tool(description = "Show the current story, progress and rules without changing anything")]
    async fn game_status(&self) -> String {
        self.session.status().await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for AppState {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Storychain - a one-word story building game. Call start_game, then relay each player's word with add_word using their name. Players alternate; forbidden words are rejected; the finished story is saved and can be continued later with load_round.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn open_ledger(
    cli: &Cli,
    config: &StorychainConfig,
    data_dir: &Path,
) -> Result<Arc<dyn RoundLedger>> {
    let format = if cli.legacy {
        LedgerFormat::Legacy
    } else {
        config.ledger.format
    };
    let path = cli
        .ledger
        .clone()
        .unwrap_or_else(|| config.ledger_path(data_dir));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    tracing::info!(path = %path.display(), ?format, "Using round ledger");
    Ok(ledger::open_ledger(format, path))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the MCP transport
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storychain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let data_dir = config::data_dir();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir.join(config::CONFIG_FILE));
    let config = StorychainConfig::load(&config_path)?;
    let store = open_ledger(&cli, &config, &data_dir)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let engine = StoryEngine::new(config.game.engine_config(), store);
            let state = AppState::new(GameSession::new(engine));

            tracing::info!("Storychain MCP started");
            state.serve(stdio()).await?.waiting().await?;
        }
        Command::History => {
            let engine = StoryEngine::new(config.game.engine_config(), store);
            println!("{}", engine.list_rounds());
        }
        Command::ExportLegacy { output } => {
            let target = ledger::LegacyTextLedger::new(output.clone());
            let count = ledger::migrate(store.as_ref(), &target)
                .with_context(|| {
                    format!(
                        "Failed to export to {}; nothing was written",
                        output.display()
                    )
                })?;
            println!("Exported {} rounds to {}", count, output.display());
        }
        Command::ImportLegacy { input } => {
            // unlike the live ledger, a missing import source is an error
            let entries = ledger::LegacyTextLedger::read_existing(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            store.append_all(&entries).with_context(|| {
                format!(
                    "Failed to import from {}; the ledger was left unchanged",
                    input.display()
                )
            })?;
            tracing::info!(
                count = entries.len(),
                from = %input.display(),
                "Imported legacy rounds"
            );
            println!("Imported {} rounds from {}", entries.len(), input.display());
        }
    }

    Ok(())
}
