pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod segment;
pub mod utils;

// Re-export commonly used types at the crate root for convenience
pub use error::{Error, Result};
pub use extractor::SegmentExtractor;
pub use ffmpeg::{FFmpeg, Transcoder};
pub use llm::{LlmCapability, StructuredResult};
pub use orchestrator::QueryOrchestrator;
pub use prompt::PromptSpec;
pub use provider::{LlmSettings, Provider};
pub use segment::{ClipWindow, MediaInfo, SegmentRequest};
pub use utils::{Cache, CacheKey, Config, KeyMode};
