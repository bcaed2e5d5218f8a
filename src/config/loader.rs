//! Layered configuration: compiled-in defaults, an optional TOML file, then
//! environment variable overrides (§4.10 of the design).

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::schema::Config;

/// Default config file location, overridable via `WARDROBE_CONFIG`.
pub fn get_config_path() -> PathBuf {
    std::env::var("WARDROBE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./wardrobe.toml"))
}

/// Loads config from compiled-in defaults, overlaid with an optional TOML
/// file at `path` (if present), overlaid with recognized environment
/// variables. A missing file is not an error; a malformed one is.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = if path.exists() {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)?
    } else {
        debug!("no config file at {}, using compiled-in defaults", path.display());
        Config::default()
    };

    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("BIND_ADDR") {
        config.server.bind_addr = v;
    }
    if let Ok(v) = std::env::var("CORS_ORIGINS") {
        config.server.cors_origins = v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(v) = std::env::var("SQLITE_PATH") {
        config.storage.sqlite_path = v;
    }
    if let Ok(v) = std::env::var("EMBEDDING_MODEL") {
        config.embedding.model = v;
    }
    if let Ok(v) = std::env::var("EMBEDDING_BATCH_SIZE") {
        match v.parse() {
            Ok(n) => config.embedding.batch_size = n,
            Err(_) => warn!("EMBEDDING_BATCH_SIZE '{}' is not a valid integer, ignoring", v),
        }
    }
    if let Ok(v) = std::env::var("EMBEDDING_BATCH_TIMEOUT") {
        match v.parse() {
            Ok(n) => config.embedding.batch_timeout_secs = n,
            Err(_) => warn!("EMBEDDING_BATCH_TIMEOUT '{}' is not a valid integer, ignoring", v),
        }
    }
    if let Ok(v) = std::env::var("RAG_ENABLED") {
        match v.parse() {
            Ok(b) => config.rag.enabled = b,
            Err(_) => warn!("RAG_ENABLED '{}' is not a valid bool, ignoring", v),
        }
    }
    if let Ok(v) = std::env::var("GEMINI_API_KEY") {
        config.llm.gemini_api_key = Some(v);
    }
    if let Ok(v) = std::env::var("CACHE_BACKEND_URL") {
        config.cache.backend_url = Some(v);
    }
}
