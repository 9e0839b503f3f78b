// 🔎 Loan Analyzer - Document → prompt → model → structured result
// One generator call per document; no retries, no partial results

use crate::analysis::AnalysisOutput;
use crate::context::RegulatoryContext;
use crate::llm::{GenerationError, TextGenerator};
use crate::normalizer::{ParseError, ResponseNormalizer};
use crate::prompt::PromptBuilder;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Generator failed (unconfigured or upstream); message passed through
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Failed to parse model output: {0}")]
    Parse(#[from] ParseError),
}

impl AnalysisError {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Generation(GenerationError::Configuration(_)) => "configuration",
            AnalysisError::Generation(GenerationError::Upstream(_)) => "upstream",
            AnalysisError::Parse(_) => "parse",
        }
    }
}

/// Process-wide analysis pipeline, built once and shared across requests
#[derive(Clone)]
pub struct LoanAnalyzer {
    generator: Arc<dyn TextGenerator>,
    prompt_builder: PromptBuilder,
    normalizer: ResponseNormalizer,
}

impl LoanAnalyzer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        context: RegulatoryContext,
        normalizer: ResponseNormalizer,
    ) -> Self {
        LoanAnalyzer {
            generator,
            prompt_builder: PromptBuilder::new(context),
            normalizer,
        }
    }

    pub fn llm_configured(&self) -> bool {
        self.generator.is_configured()
    }

    pub fn schema_enforced(&self) -> bool {
        self.normalizer.schema_enforced()
    }

    /// Analyze one decoded document
    pub async fn analyze(&self, document_text: &str) -> Result<AnalysisOutput, AnalysisError> {
        let span = tracing::info_span!(
            "analyze",
            request_id = %Uuid::new_v4(),
            document_bytes = document_text.len(),
            document_sha256 = %short_digest(document_text),
        );

        self.run(document_text).instrument(span).await
    }

    async fn run(&self, document_text: &str) -> Result<AnalysisOutput, AnalysisError> {
        let prompt = self.prompt_builder.build_prompt(document_text);

        let generation = match self.generator.generate(&prompt).await {
            Ok(generation) => generation,
            Err(e) => {
                error!(generator = %self.generator.name(), error = %e, "LLM call failed");
                return Err(e.into());
            }
        };

        match self.normalizer.normalize(&generation.text) {
            Ok(output) => {
                if let Some(result) = output.as_validated() {
                    if !result.score_in_range() {
                        warn!(risk_score = result.risk_score, "risk score outside [0, 1], passed through");
                    }
                }
                info!(risk_score = ?output.risk_score(), "analysis complete");
                Ok(output)
            }
            Err(e) => {
                error!(error = %e, reply_bytes = generation.text.len(), "model output rejected");
                Err(e.into())
            }
        }
    }
}

/// First 12 hex chars of the SHA-256; documents are never logged in full
fn short_digest(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().take(6).map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::LoanAnalysisResult;
    use crate::llm::{MockTextGenerator, UnconfiguredGenerator};

    const DOC: &str = "Loan agreement with a 25% hidden origination fee.";
    const FENCED_REPLY: &str = "```json\n{\"risk_score\": 0.8, \"summary\": \"High risk due to undisclosed fee.\", \"contradictions\": [], \"hidden_fees\": [\"25% origination fee\"]}\n```";

    fn analyzer_with(mock: &MockTextGenerator, enforce_schema: bool) -> LoanAnalyzer {
        LoanAnalyzer::new(
            Arc::new(mock.clone()),
            RegulatoryContext::new("Truth in Lending Act"),
            ResponseNormalizer::new(enforce_schema),
        )
    }

    #[tokio::test]
    async fn test_fenced_reply_becomes_result() {
        let mock = MockTextGenerator::replying(FENCED_REPLY);
        let output = analyzer_with(&mock, true).analyze(DOC).await.unwrap();

        assert_eq!(
            output,
            AnalysisOutput::Validated(LoanAnalysisResult {
                risk_score: 0.8,
                summary: "High risk due to undisclosed fee.".to_string(),
                contradictions: vec![],
                hidden_fees: vec!["25% origination fee".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn test_prompt_sent_once_with_document_and_context() {
        let mock = MockTextGenerator::replying(FENCED_REPLY);
        analyzer_with(&mock, true).analyze(DOC).await.unwrap();

        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(DOC));
        assert!(prompts[0].contains("Truth in Lending Act"));
    }

    #[tokio::test]
    async fn test_upstream_error_message_is_verbatim() {
        let mock = MockTextGenerator::failing("quota exceeded");
        let err = analyzer_with(&mock, true).analyze(DOC).await.unwrap_err();

        assert_eq!(err.kind(), "upstream");
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn test_non_json_reply_is_parse_error() {
        let mock = MockTextGenerator::replying("I cannot help with that.");
        let err = analyzer_with(&mock, true).analyze(DOC).await.unwrap_err();

        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().starts_with("Failed to parse model output:"));
    }

    #[tokio::test]
    async fn test_raw_mode_returns_unvalidated_json() {
        let mock = MockTextGenerator::replying("{\"summary\": \"partial\"}");
        let output = analyzer_with(&mock, false).analyze(DOC).await.unwrap();

        assert_eq!(output, AnalysisOutput::Raw(serde_json::json!({"summary": "partial"})));
    }

    #[tokio::test]
    async fn test_unconfigured_generator_is_configuration_error() {
        let analyzer = LoanAnalyzer::new(
            Arc::new(UnconfiguredGenerator::default()),
            RegulatoryContext::empty(),
            ResponseNormalizer::default(),
        );

        assert!(!analyzer.llm_configured());
        let err = analyzer.analyze(DOC).await.unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_short_digest_is_stable() {
        assert_eq!(short_digest("abc"), "ba7816bf8f01");
        assert_eq!(short_digest("abc").len(), 12);
    }
}
