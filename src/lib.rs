// Loan Risk Analyzer - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod analysis;
pub mod config;
pub mod context;
pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod service;

// Only compile the HTTP layer when the server feature is enabled
#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use analysis::{AnalysisOutput, LoanAnalysisResult};
pub use config::AppConfig;
pub use context::RegulatoryContext;
pub use llm::{
    GeminiClient, Generation, GenerationError, MockTextGenerator, TextGenerator,
    UnconfiguredGenerator,
};
pub use normalizer::{strip_fences, ParseError, ResponseNormalizer};
pub use prompt::PromptBuilder;
pub use service::{AnalysisError, LoanAnalyzer};

#[cfg(feature = "server")]
pub use server::{build_router, ApiError, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the tracing subscriber used by both binaries
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
