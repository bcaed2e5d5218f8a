use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generates a `Debug` impl that redacts secret fields.
///
/// Field specifiers:
/// - `field_name`            — printed normally via `&self.field_name`
/// - `redact(field_name)`    — `String` field: shows `[empty]` or `[REDACTED]`
/// - `redact_option(field_name)` — `Option<String>` field: shows `None` or `Some("[REDACTED]")`
/// - `redact_map(field_name)` — `HashMap<String, String>` field: shows only the entry count
macro_rules! redact_debug {
    // Internal: emit a single .field() call
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, redact_option($field:ident)) => {
        $builder.field(
            stringify!($field),
            &$self.$field.as_ref().map(|_| "[REDACTED]"),
        );
    };
    (@field $builder:ident, $self:ident, redact_map($field:ident)) => {
        $builder.field(
            stringify!($field),
            &format!("[{} REDACTED entries]", $self.$field.len()),
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    // Internal: recursive TT muncher
    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, redact_option($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact_option($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, redact_map($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact_map($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    // Entry point
    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Server (ambient)
// ---------------------------------------------------------------------------

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Edge-only; the core never reads this, but it's recognized config so a
    /// reverse proxy or embedding harness can pick it up.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Suggestion-route rate limit, requests/minute/IP (see §6).
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

fn default_rate_limit() -> u32 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_origins: Vec::new(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

redact_debug!(ServerConfig, bind_addr, cors_origins, rate_limit_per_minute,);

// ---------------------------------------------------------------------------
// Storage (ambient)
// ---------------------------------------------------------------------------

fn default_sqlite_path() -> String {
    "./wardrobe.sqlite3".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Embedding
// ---------------------------------------------------------------------------

fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

fn default_embedding_cache_size() -> usize {
    10_000
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_timeout_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_cache_size")]
    pub query_cache_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            query_cache_size: default_embedding_cache_size(),
            batch_size: default_batch_size(),
            batch_timeout_secs: default_batch_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Retrieval-augmented filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// If false, the Retriever is bypassed and the full owned catalog is
    /// passed straight to the selector/LLM delegate.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// LLM delegate
// ---------------------------------------------------------------------------

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    /// If unset, the LLM delegate is disabled and the rule engine always runs.
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

redact_debug!(LlmConfig, redact_option(gemini_api_key), model,);

// ---------------------------------------------------------------------------
// Suggestion cache
// ---------------------------------------------------------------------------

fn default_cache_max_entries() -> u64 {
    10_000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Optional external cache backend URL (e.g. a Redis connection string).
    /// Unset or unreachable falls back to the in-process TTL cache.
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth — a stand-in for the out-of-scope auth system (§4.9): a static map of
// bearer tokens to owner ids, loaded from config/env for local and test use.
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

redact_debug!(AuthConfig, redact_map(tokens),);

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Whether the LLM delegate should be constructed at all (§6: unset key
    /// disables C7 and C5+C6 always run).
    pub fn llm_enabled(&self) -> bool {
        self.llm
            .gemini_api_key
            .as_ref()
            .is_some_and(|k| !k.is_empty())
    }

    pub fn validate(&self) -> Result<(), crate::errors::AppError> {
        use crate::errors::AppError;

        if self.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(AppError::InvalidInput(format!(
                "server.bind_addr '{}' is not a valid socket address",
                self.server.bind_addr
            )));
        }
        if self.server.rate_limit_per_minute == 0 {
            return Err(AppError::InvalidInput(
                "server.rate_limit_per_minute must be > 0".into(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(AppError::InvalidInput(
                "embedding.batch_size must be > 0".into(),
            ));
        }
        if !matches!(
            self.embedding.model.as_str(),
            "BAAI/bge-small-en-v1.5" | "BAAI/bge-base-en-v1.5"
        ) {
            return Err(AppError::InvalidInput(format!(
                "embedding.model '{}' is not a supported model",
                self.embedding.model
            )));
        }
        Ok(())
    }
}
