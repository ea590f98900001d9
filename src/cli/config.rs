use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::arbiter::chat::AuthStyle;
use crate::engine::engine_model::AlignConfig;
use crate::error::LoadError;
use crate::retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};

/// Config file looked up in the current directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "flow-aligner.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "flow-aligner",
    version,
    about = "Align free-text app scenarios onto recorded UI scene/action graphs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: flow-aligner.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align every scenario under a recording and write results in place
    Align {
        /// Recording root containing events/ and test_cases/
        #[arg(long)]
        data: String,

        /// Scenario directory (default: <data>/test_cases)
        #[arg(long)]
        cases: Option<String>,

        /// Only align the scenario directory with this name
        #[arg(long)]
        case: Option<String>,

        /// Embedding backend
        #[arg(long, value_enum)]
        embedder: Option<EmbedderKind>,

        /// Arbiter backend
        #[arg(long, value_enum)]
        arbiter: Option<ArbiterKind>,

        /// Graph backend
        #[arg(long, value_enum)]
        graph: Option<GraphKind>,

        /// Append alignment events to this JSON-lines file
        #[arg(long)]
        trace: Option<String>,
    },

    /// Load a recording and print index and graph sizes
    Inspect {
        /// Recording root containing events/
        #[arg(long)]
        data: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// OpenAI-compatible embeddings endpoint
    Http,
    /// Offline feature-hashed bag of words
    #[default]
    Hashing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ArbiterKind {
    /// OpenAI-compatible chat completions endpoint
    Chat,
    /// Offline word-overlap decisions
    #[default]
    Lexical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    /// Graph rebuilt in memory from the recorded events
    #[default]
    Recorded,
    /// Neo4j over its HTTP transactional API
    Neo4j,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `flow-aligner.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub align: AlignSection,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub arbiter: ArbiterConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlignSection {
    #[serde(flatten)]
    pub engine: AlignConfig,

    /// Scenario directories starting with any of these are not aligned
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

impl Default for AlignSection {
    fn default() -> Self {
        Self {
            engine: AlignConfig::default(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbedderKind,

    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Vector size of the hashing backend
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbedderKind::default(),
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            dimensions: default_dimensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArbiterConfig {
    #[serde(default)]
    pub backend: ArbiterKind,

    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub auth: AuthStyle,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_secs: u64,

    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            backend: ArbiterKind::default(),
            endpoint: default_chat_endpoint(),
            model: default_chat_model(),
            api_key_env: default_api_key_env(),
            auth: AuthStyle::default(),
            max_attempts: default_max_attempts(),
            rate_limit_backoff_secs: default_rate_limit_backoff(),
            error_backoff_secs: default_error_backoff(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ArbiterConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            rate_limit_backoff: Duration::from_secs(self.rate_limit_backoff_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphConfig {
    #[serde(default)]
    pub backend: GraphKind,

    #[serde(default = "default_neo4j_uri")]
    pub uri: String,

    #[serde(default = "default_neo4j_name")]
    pub database: String,

    #[serde(default = "default_neo4j_name")]
    pub user: String,

    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: GraphKind::default(),
            uri: default_neo4j_uri(),
            database: default_neo4j_name(),
            user: default_neo4j_name(),
            password_env: default_password_env(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraceConfig {
    pub path: Option<String>,
}

// Serde default helpers
fn default_skip_prefixes() -> Vec<String> {
    ["case-base", "case-hard", "case-finished"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_embedding_endpoint() -> String { "https://api.openai.com/v1/embeddings".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_chat_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_chat_model() -> String { "gpt-4o".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_dimensions() -> usize { 256 }
fn default_max_attempts() -> u32 { DEFAULT_MAX_ATTEMPTS }
fn default_rate_limit_backoff() -> u64 { 20 }
fn default_error_backoff() -> u64 { 5 }
fn default_max_tokens() -> u32 { 4096 }
fn default_neo4j_uri() -> String { "http://localhost:7474".to_string() }
fn default_neo4j_name() -> String { "neo4j".to_string() }
fn default_password_env() -> String { "NEO4J_PASSWORD".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Parse a config file.
pub fn try_load_config(path: &Path) -> Result<AppConfig, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    serde_yaml::from_str(&content).map_err(|source| LoadError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load config from a YAML file. Returns defaults if the file is missing or
/// malformed; a malformed file is reported.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = Path::new(path.unwrap_or(DEFAULT_CONFIG_FILE));
    if !config_path.exists() {
        return AppConfig::default();
    }
    match try_load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!("ignoring config: {}", e);
            AppConfig::default()
        }
    }
}

/// Layer `align` flags over the file config: CLI > config > defaults.
pub fn apply_cli_overrides(
    config: &mut AppConfig,
    embedder: Option<EmbedderKind>,
    arbiter: Option<ArbiterKind>,
    graph: Option<GraphKind>,
    trace: Option<&str>,
) {
    if let Some(kind) = embedder {
        config.embedding.backend = kind;
    }
    if let Some(kind) = arbiter {
        config.arbiter.backend = kind;
    }
    if let Some(kind) = graph {
        config.graph.backend = kind;
    }
    if let Some(path) = trace {
        config.trace.path = Some(path.to_string());
    }
}
