mod list;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use remindbot_channel_telegram::TelegramChannel;
use remindbot_config::RemindBotConfig;

#[derive(Parser)]
#[command(name = "remindbot", about = "Telegram reminder bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot until Ctrl-C
    Run {
        /// Config file (default: ~/.remindbot/config.json5)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Liveness port (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Reminder data file (overrides config)
        #[arg(short, long)]
        data_file: Option<PathBuf>,
    },
    /// Print every stored reminder
    List {
        /// Config file (default: ~/.remindbot/config.json5)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reminder data file (overrides config)
        #[arg(short, long)]
        data_file: Option<PathBuf>,
    },
    /// Check configuration
    Health,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<RemindBotConfig> {
    let config = match path {
        Some(path) => {
            let _ = dotenvy::dotenv();
            remindbot_config::load_config_from(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => remindbot_config::load_config().context("Failed to load config")?,
    };
    Ok(config)
}

fn resolve_data_file(config: &RemindBotConfig, data_file: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match data_file {
        Some(path) => Ok(path),
        None => Ok(config.data_file()?),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            port,
            data_file,
        } => {
            let config = load_config(config)?;
            let data_file = resolve_data_file(&config, data_file)?;
            let token = config.bot_token()?;
            let channel = Arc::new(TelegramChannel::new(&token)?);

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(remindbot_gateway::start_bot(
                config, channel, &data_file, port,
            ))?;
        }
        Commands::List { config, data_file } => {
            let config = load_config(config)?;
            let data_file = resolve_data_file(&config, data_file)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(list::run_list(&data_file))?;
        }
        Commands::Health => {
            println!("remindbot is healthy");
            let config = load_config(None)?;
            let token = if config.bot_token().is_ok() {
                "set"
            } else {
                "missing"
            };
            println!("  bot token: {token}");
            match config.data_file() {
                Ok(path) => println!("  data file: {}", path.display()),
                Err(e) => println!("  data file: unresolved ({e})"),
            }
            println!("  timezone: {}", config.scheduler.timezone);
            if config.liveness.enabled {
                println!(
                    "  liveness: {}:{}",
                    config.liveness.host,
                    config.liveness_port()
                );
            } else {
                println!("  liveness: disabled");
            }
        }
    }

    Ok(())
}
