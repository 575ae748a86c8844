use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eumas::{Config, Connection, EmbeddingClient, MemoryOperations};
use eumas_cli::commands::{
    ConfigCommand, EmbedCommand, HealthCommand, MemoryCommand, SchemaCommand,
};
use eumas_cli::error::CliResult;
use eumas_cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "eumas-cli")]
#[command(about = "EUMAS CLI - Management tool for the memory graph")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(long, short, global = true, help = "Log at the configured level instead of warnings only")]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Check that Weaviate is ready")]
    Health(HealthCommand),

    #[clap(about = "Schema management commands")]
    Schema(SchemaCommand),

    #[clap(about = "Memory query commands")]
    Memory(MemoryCommand),

    #[clap(about = "Generate embeddings for text")]
    Embed(EmbedCommand),

    #[clap(about = "Configuration commands")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> CliResult<Config> {
    let config = match path {
        Some(path) => {
            let mut config = Config::load(path)?;
            config.apply_lookup(|key| std::env::var(key).ok());
            config
        }
        None => Config::load_default()?,
    };
    Ok(config)
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let config = load_config(cli.config.as_deref())?;

    let mut logging = config.logging.clone();
    if !cli.verbose {
        logging.level = "warn".to_string();
    }
    eumas::logging::init(&logging)?;

    match &cli.command {
        Command::Config(cmd) => cmd.execute(&config, format).await,
        Command::Schema(cmd) => cmd.execute(&config, format).await,
        Command::Health(cmd) => {
            let connection = Connection::connect(&config)?;
            cmd.execute(&connection, format).await
        }
        Command::Memory(cmd) => {
            let ops = MemoryOperations::new(Connection::connect(&config)?);
            cmd.execute(&ops, format).await
        }
        Command::Embed(cmd) => {
            let client = EmbeddingClient::new(&config.embedding)?;
            cmd.execute(&client, format).await
        }
    }
}
