use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use reventlov::application::errors::BotError;
use reventlov::application::messaging::{CommandSurface, MessageDispatcher};
use reventlov::application::services::{CommandService, MessageService};
use reventlov::domain::traits::{Bot, BotInfo};
use reventlov::infrastructure::adapters::console::{ConsoleAdapter, CONSOLE_CHAT};
use reventlov::infrastructure::adapters::telegram::TelegramAdapter;
use reventlov::infrastructure::config::Config;
use reventlov::infrastructure::storage::MemoryStore;
use reventlov::plugins::{PluginDiscovery, PluginRegistry};

#[derive(Parser)]
#[command(name = "reventlov")]
#[command(about = "A chat bot built from pluggable features", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
    /// List bundled plugins and whether they would be enabled
    Plugins,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config, cli.token),
        Commands::Version => {
            println!("reventlov v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
        Commands::Plugins => {
            list_plugins(&cli.config);
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str) -> Config {
    let mut config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };
    config.apply_env();
    config
}

/// Registry over the bundled plugins, with the disabled list seeded from config
fn build_registry(surface: &CommandSurface, config: &Arc<Config>) -> PluginRegistry {
    let store = Arc::new(MemoryStore::new(config.plugins.disabled.clone()));
    PluginRegistry::construct(surface.clone(), &PluginDiscovery::builtin(), store, config.clone())
}

/// Bind the bot's own commands and the plugins' commands on one surface
fn build_service(config: Arc<Config>, bot: Arc<dyn Bot>, info: BotInfo) -> Result<MessageService, BotError> {
    let surface = CommandSurface::new();
    let registry = build_registry(&surface, &config).into_shared();

    let commands = Arc::new(CommandService::new(registry, config.clone(), info));
    commands.install(&surface)?;

    let dispatcher = MessageDispatcher::new(config.bot.prefix.clone(), surface);
    Ok(MessageService::new(dispatcher, bot))
}

fn run_bot(config_path: &str, token_override: Option<String>) -> Result<(), BotError> {
    let config = load_config(config_path);
    tracing::info!("Starting reventlov: {}", config.bot.name);

    let token = token_override.or_else(|| config.telegram_token().map(str::to_string));
    let poll_timeout = config.adapters.telegram.as_ref().map(|t| t.poll_timeout).unwrap_or(30);
    let config = Arc::new(config);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))?;

    match token {
        Some(token) => rt.block_on(run_telegram_bot(token, config, poll_timeout)),
        None => rt.block_on(run_console_bot(config)),
    }
}

async fn run_telegram_bot(token: String, config: Arc<Config>, poll_timeout: i64) -> Result<(), BotError> {
    let mut adapter = TelegramAdapter::new(token);
    adapter.fetch_bot_info().await?;
    let info = adapter.bot_info();
    tracing::info!("I am {} (@{})", info.name, info.username);

    let adapter = Arc::new(adapter);
    let service = build_service(config, adapter.clone(), info)?;

    let surface = service.dispatcher().surface();
    let menu: Vec<(String, String)> = surface
        .names()
        .into_iter()
        .filter_map(|name| {
            let command = surface.get(&name)?;
            let description = command.description.clone().unwrap_or_else(|| name.clone());
            Some((name, description))
        })
        .collect();
    if let Err(e) = adapter.register_commands(&menu).await {
        tracing::warn!("Failed to register commands: {}", e);
    }

    let mut offset: i64 = 0;
    tracing::info!("Starting message loop...");

    loop {
        let updates = match adapter.get_updates(offset, poll_timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!("Failed to get updates: {}", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        if !updates.is_empty() {
            tracing::info!("Received {} updates", updates.len());
        }
        offset = TelegramAdapter::get_next_offset(&updates, offset);

        for update in &updates {
            let Some(message) = TelegramAdapter::to_message(update, service.dispatcher().parser()) else {
                continue;
            };
            if let Err(e) = service.process(message).await {
                tracing::error!("Failed to reply: {}", e);
            }
        }
    }
}

async fn run_console_bot(config: Arc<Config>) -> Result<(), BotError> {
    let adapter = Arc::new(ConsoleAdapter::new(config.bot.name.clone()));
    let info = adapter.bot_info();
    let service = build_service(config, adapter, info)?;

    tracing::info!("Starting console bot (dev mode), type /help");
    let mut lines = ConsoleAdapter::lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| BotError::Internal(format!("Failed to read stdin: {}", e)))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = service.process_text(CONSOLE_CHAT, line).await {
            tracing::error!("Failed to reply: {}", e);
        }
    }
    Ok(())
}

fn init_config() -> Result<(), BotError> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}

fn list_plugins(config_path: &str) {
    let config = Arc::new(load_config(config_path));
    let registry = build_registry(&CommandSurface::new(), &config);

    for name in registry.discovered_names() {
        let status = if registry.is_enabled(&name) { "enabled" } else { "disabled" };
        println!("{:<12} {}", name, status);
    }
}
