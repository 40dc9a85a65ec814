mod cache;
mod config;

pub use cache::{content_fingerprint, default_cache_dir, Cache, CacheKey, KeyMode};
pub use config::{CacheConfig, Config, LlmConfig, TranscoderConfig, PROVIDER_ENV};
