use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub pinecone: PineconeSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub document: DocumentSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub extraction: ExtractionSettings,
    #[serde(default)]
    pub reranking: RerankingSettings,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
    /// Largest accepted request body, in bytes; above the document cap so
    /// oversized uploads get a `DocumentTooLarge` error body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_max_body_bytes() -> usize { 12 * 1024 * 1024 }

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: String::new(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

fn default_openai_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_chat_model() -> String { "gpt-4o-mini".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }

/// Which vector index backs retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Pinecone,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexSettings {
    #[serde(default = "default_index_backend")]
    pub backend: IndexBackend,
    /// Corpus file for the in-memory backend
    #[serde(default = "default_jobs_file")]
    pub jobs_file: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            jobs_file: default_jobs_file(),
        }
    }
}

fn default_index_backend() -> IndexBackend { IndexBackend::Pinecone }
fn default_jobs_file() -> String { "data/jobs.json".to_string() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PineconeSettings {
    /// Data-plane host of the index, e.g. https://jobs-abc123.svc.us-east-1.pinecone.io
    #[serde(default)]
    pub index_host: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Over-fetch count requested from the index; never below `top_k`
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
    #[serde(default = "default_sponsorship")]
    pub sponsorship: SponsorshipMode,
}

/// How a stated need for visa sponsorship constrains results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorshipMode {
    /// Exclude postings that do not sponsor
    Filter,
    /// Keep them and let the reranker apply `sponsorship_penalty`
    Penalize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            candidate_pool: default_candidate_pool(),
            similarity_threshold: default_similarity_threshold(),
            max_top_k: default_max_top_k(),
            sponsorship: default_sponsorship(),
        }
    }
}

fn default_top_k() -> usize { 10 }
fn default_candidate_pool() -> usize { 30 }
fn default_similarity_threshold() -> f64 { 0.5 }
fn default_max_top_k() -> usize { 50 }
fn default_sponsorship() -> SponsorshipMode { SponsorshipMode::Filter }

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSettings {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_pages: default_max_pages(),
            max_text_chars: default_max_text_chars(),
        }
    }
}

fn default_max_file_bytes() -> usize { 10 * 1024 * 1024 }
fn default_max_pages() -> usize { 10 }
fn default_max_text_chars() -> usize { 50_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedding_max_tokens")]
    pub max_tokens: usize,
    /// Zero disables the cache
    #[serde(default = "default_cache_size")]
    pub cache_size: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            max_tokens: default_embedding_max_tokens(),
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_dimension() -> usize { 1536 }
fn default_embedding_max_tokens() -> usize { 8000 }
fn default_cache_size() -> u64 { 1000 }
fn default_cache_ttl() -> u64 { 3600 }

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionSettings {
    #[serde(default = "default_extraction_max_chars")]
    pub max_input_chars: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            max_input_chars: default_extraction_max_chars(),
        }
    }
}

fn default_extraction_max_chars() -> usize { 12_000 }

/// Secondary signal used by the reranker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankMethod {
    Preference,
    CrossEncoder,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerankingSettings {
    #[serde(default = "default_rerank_method")]
    pub method: RerankMethod,
    /// Base URL of the cross-encoder rerank service
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_rerank_model")]
    pub model: String,
    /// Weight of the cross-encoder relevance in the blended score
    #[serde(default = "default_blend_weight")]
    pub blend_weight: f64,
    #[serde(default)]
    pub weights: BoostWeights,
}

impl Default for RerankingSettings {
    fn default() -> Self {
        Self {
            method: default_rerank_method(),
            url: String::new(),
            api_key: String::new(),
            model: default_rerank_model(),
            blend_weight: default_blend_weight(),
            weights: BoostWeights::default(),
        }
    }
}

fn default_rerank_method() -> RerankMethod { RerankMethod::Preference }
fn default_rerank_model() -> String { "rerank-english-v3.0".to_string() }
fn default_blend_weight() -> f64 { 0.5 }

/// Bounded preference-alignment adjustments
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoostWeights {
    #[serde(default = "default_ideal_company_boost")]
    pub ideal_company: f64,
    #[serde(default = "default_equity_boost")]
    pub equity: f64,
    #[serde(default = "default_sponsorship_penalty")]
    pub sponsorship_penalty: f64,
    #[serde(default = "default_max_boost")]
    pub max_boost: f64,
    #[serde(default = "default_max_penalty")]
    pub max_penalty: f64,
}

impl Default for BoostWeights {
    fn default() -> Self {
        Self {
            ideal_company: default_ideal_company_boost(),
            equity: default_equity_boost(),
            sponsorship_penalty: default_sponsorship_penalty(),
            max_boost: default_max_boost(),
            max_penalty: default_max_penalty(),
        }
    }
}

fn default_ideal_company_boost() -> f64 { 0.05 }
fn default_equity_boost() -> f64 { 0.03 }
fn default_sponsorship_penalty() -> f64 { 0.15 }
fn default_max_boost() -> f64 { 0.10 }
fn default_max_penalty() -> f64 { 0.20 }

/// Per-call timeouts for external dependencies
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_extraction_timeout")]
    pub extraction_secs: u64,
    #[serde(default = "default_embedding_timeout")]
    pub embedding_secs: u64,
    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_secs: u64,
    #[serde(default = "default_rerank_timeout")]
    pub rerank_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            extraction_secs: default_extraction_timeout(),
            embedding_secs: default_embedding_timeout(),
            retrieval_secs: default_retrieval_timeout(),
            rerank_secs: default_rerank_timeout(),
        }
    }
}

impl TimeoutSettings {
    pub fn extraction(&self) -> Duration { Duration::from_secs(self.extraction_secs) }
    pub fn embedding(&self) -> Duration { Duration::from_secs(self.embedding_secs) }
    pub fn retrieval(&self) -> Duration { Duration::from_secs(self.retrieval_secs) }
    pub fn rerank(&self) -> Duration { Duration::from_secs(self.rerank_secs) }
}

fn default_extraction_timeout() -> u64 { 30 }
fn default_embedding_timeout() -> u64 { 20 }
fn default_retrieval_timeout() -> u64 { 10 }
fn default_rerank_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_backoff_ms() -> u64 { 250 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with MATCHER_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., MATCHER__MATCHING__TOP_K -> matching.top_k
            .add_source(
                Environment::with_prefix("MATCHER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("MATCHER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }
}

/// Honour the vendor-standard API key variables when the prefixed ones are unset
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let openai_key = env::var("MATCHER__OPENAI__API_KEY")
        .or_else(|_| env::var("OPENAI_API_KEY"))
        .ok();
    let pinecone_key = env::var("MATCHER__PINECONE__API_KEY")
        .or_else(|_| env::var("PINECONE_API_KEY"))
        .ok();
    let pinecone_host = env::var("PINECONE_INDEX_HOST").ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(key) = openai_key {
        builder = builder.set_override("openai.api_key", key)?;
    }
    if let Some(key) = pinecone_key {
        builder = builder.set_override("pinecone.api_key", key)?;
    }
    if let Some(host) = pinecone_host {
        builder = builder.set_default("pinecone.index_host", host)?;
    }

    builder.build()
}
