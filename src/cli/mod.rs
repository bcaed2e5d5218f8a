//! Process bootstrap: wires config, storage, embedder, cache, and the
//! optional LLM delegate into an `Orchestrator`, then serves the gateway.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::cache::SuggestionCache;
use crate::config::{self, Config};
use crate::embedder::LazyEmbeddingService;
use crate::gateway::{self, AppState, Authenticator, StaticTokenAuthenticator};
use crate::llm::{GeminiDelegate, OutfitDelegate};
use crate::orchestrator::Orchestrator;
use crate::store::CatalogRepository;
use crate::store::sqlite::SqliteCatalogStore;
use crate::store::worker::EmbeddingWorker;

#[derive(Parser)]
#[command(name = "wardrobe-suggest")]
#[command(about = "RAG-backed outfit suggestion service")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway (default if no subcommand is given)
    Serve,
    /// Validate the configuration and exit
    CheckConfig,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::CheckConfig => check_config(),
    }
}

fn check_config() -> Result<()> {
    let config = config::load_config(&config::get_config_path())?;
    println!("configuration OK: bind_addr={}", config.server.bind_addr);
    Ok(())
}

async fn serve() -> Result<()> {
    info!("loading configuration...");
    let config = config::load_config(&config::get_config_path())?;

    let store = SqliteCatalogStore::open(&config.storage.sqlite_path)?;
    let store: Arc<dyn CatalogRepository> = Arc::new(store);

    let embedder = Arc::new(LazyEmbeddingService::new(
        config.embedding.model.clone(),
        config.embedding.query_cache_size,
    ));

    let _worker = EmbeddingWorker::spawn(
        store.clone(),
        embedder.clone(),
        config.embedding.batch_size,
        Duration::from_secs(config.embedding.batch_timeout_secs),
    );

    let cache = Arc::new(SuggestionCache::new(
        config.cache.max_entries,
        Duration::from_secs(config.cache.ttl_secs),
    ));

    let delegate = build_delegate(&config);
    let orchestrator = Arc::new(Orchestrator::new(store, cache, delegate));

    let authenticator: Arc<dyn Authenticator> =
        Arc::new(StaticTokenAuthenticator::new(&config.auth));
    let state = AppState::new(
        orchestrator,
        embedder,
        authenticator,
        config.server.rate_limit_per_minute,
    );

    info!("starting gateway on {}", config.server.bind_addr);
    gateway::start(&config.server.bind_addr, state).await
}

fn build_delegate(config: &Config) -> Option<Arc<dyn OutfitDelegate>> {
    if !config.llm_enabled() {
        info!("GEMINI_API_KEY unset, LLM delegate disabled; rule engine always runs");
        return None;
    }
    let api_key = config.llm.gemini_api_key.clone().unwrap_or_default();
    Some(Arc::new(GeminiDelegate::new(api_key, config.llm.model.clone())))
}
