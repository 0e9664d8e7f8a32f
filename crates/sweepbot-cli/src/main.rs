use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sweepbot_bot::commands::create_commands;
use sweepbot_bot::{BotContext, run_dispatch};
use sweepbot_config::BotConfig;
use sweepbot_expiry::delay::DelayPolicy;
use sweepbot_expiry::store::ExpiryStore;
use sweepbot_expiry::sweep::{SweepConfig, Sweeper};
use sweepbot_telegram::api::TelegramApi;
use sweepbot_telegram::polling::run_polling_loop;
use sweepbot_telegram::types::{BotCommand, SetMyCommandsParams};

#[derive(Parser)]
#[command(
    name = "sweepbot",
    about = "Telegram group-manager bot with deferred message deletion"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (polling loop + deletion sweeper)
    Run {
        /// Config file path (defaults to ~/.sweepbot/config.json5)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Verify the configured bot token against the Telegram API
    CheckToken {
        /// Config file path (defaults to ~/.sweepbot/config.json5)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write a default config file to ~/.sweepbot/config.json5
    Init,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Run { config } => rt.block_on(run_bot(config)),
        Commands::CheckToken { config } => rt.block_on(check_token(config)),
        Commands::Init => init_config(),
    }
}

fn init_config() -> anyhow::Result<()> {
    let path = sweepbot_config::config_file_path()?;
    if path.exists() {
        anyhow::bail!("Config file already exists at {}", path.display());
    }

    sweepbot_config::save_config(&BotConfig::default())?;
    println!("Wrote default config to {}", path.display());
    println!("Set bot_token (or the SWEEPBOT_BOT_TOKEN env var) before running the bot.");
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<BotConfig> {
    let config = match path {
        Some(path) => sweepbot_config::load_config_from(&path)?,
        None => sweepbot_config::load_config()?,
    };
    if config.bot_token.is_empty() {
        anyhow::bail!(
            "No bot token configured; set bot_token in config.json5 or the SWEEPBOT_BOT_TOKEN env var"
        );
    }
    Ok(config)
}

async fn run_bot(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    sweepbot_config::ensure_config_dir()?;
    let db_path = config.resolve_db_path()?;
    let store = Arc::new(ExpiryStore::open(&db_path)?);

    let api = Arc::new(TelegramApi::new(&config.bot_token));
    let bot = api
        .get_me()
        .await
        .context("Failed to authenticate bot token")?;
    info!(
        bot_username = bot.username.as_deref().unwrap_or("unknown"),
        "Telegram bot authenticated"
    );

    let registry = create_commands();

    let mut menu: Vec<BotCommand> = registry
        .values()
        .map(|c| BotCommand {
            command: c.name().to_string(),
            description: c.description().to_string(),
        })
        .collect();
    menu.sort_by(|a, b| a.command.cmp(&b.command));
    if let Err(e) = api
        .set_my_commands(&SetMyCommandsParams { commands: menu })
        .await
    {
        warn!("Failed to register command menu: {e}");
    }

    let mut sweep_config = SweepConfig::for_default_delay(config.delete_after_hours);
    if let Some(secs) = config.sweep_interval_secs {
        sweep_config.interval = Duration::from_secs(secs);
    }
    sweep_config.initial_delay = Duration::from_secs(config.sweep_initial_delay_secs);

    let delay = DelayPolicy::new(config.delete_after_hours, config.max_delete_hours);
    let config = Arc::new(config);

    if config.restrict_to_allowed_groups {
        info!(allowed_groups = ?config.allowed_groups, "Group restrictions enabled");
    } else {
        info!("Group restrictions disabled");
    }

    let ctx = Arc::new(BotContext {
        api: api.clone(),
        store: store.clone(),
        config,
        delay,
    });

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(64);

    let sweeper = Arc::new(Sweeper::new(store, api.clone(), sweep_config));
    let sweep_handle = tokio::spawn(sweeper.run(cancel.child_token()));

    let poll_api = api.clone();
    let poll_cancel = cancel.child_token();
    let poll_handle = tokio::spawn(async move {
        run_polling_loop(&poll_api, tx, poll_cancel).await;
    });

    let dispatch_handle = tokio::spawn(run_dispatch(ctx, registry, rx, cancel.child_token()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping");
    cancel.cancel();

    let _ = poll_handle.await;
    let _ = dispatch_handle.await;
    let _ = sweep_handle.await;

    info!("Bot stopped");
    Ok(())
}

async fn check_token(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let api = TelegramApi::new(&config.bot_token);
    let bot = api.get_me().await.context("Token verification failed")?;

    println!(
        "Token OK: @{} ({}, id {})",
        bot.username.as_deref().unwrap_or("unknown"),
        bot.first_name,
        bot.id
    );
    Ok(())
}
