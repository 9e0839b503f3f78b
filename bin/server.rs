// Loan Risk Analyzer - Web Server
// POST /analyze with a loan agreement, get a structured risk assessment back

use anyhow::{Context, Result};
use loan_risk::{build_router, init_tracing, AppConfig, AppState, LoanAnalyzer, RegulatoryContext, ResponseNormalizer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    println!("🌐 Loan Risk Analyzer - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = AppConfig::from_env().context("Failed to read configuration")?;

    // Load regulatory context (empty if missing)
    let context = RegulatoryContext::load(&config.corpus_path);
    println!("✓ Regulatory context: {} bytes from {:?}", context.len(), config.corpus_path);

    // Pick generator; a missing key only fails at request time
    let generator = config.text_generator();
    if generator.is_configured() {
        println!("✓ LLM model: {}", generator.name());
    } else {
        warn!("no API key set, /analyze will answer 500 until API_KEY or GENAI_API_KEY is configured");
        println!("⚠️  LLM not configured (set API_KEY or GENAI_API_KEY)");
    }

    let analyzer = LoanAnalyzer::new(
        generator,
        context,
        ResponseNormalizer::new(config.enforce_schema),
    );
    println!(
        "✓ Schema enforcement: {}",
        if config.enforce_schema { "on" } else { "off" }
    );

    let app = build_router(AppState::new(analyzer), config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "listening");
    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: POST http://{}/analyze (multipart field `file`)", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
