// 📊 Analysis Model - Structured risk assessment
// What the model is asked to return for every loan document

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// LOAN ANALYSIS RESULT
// ============================================================================

/// Structured risk assessment parsed from the model's reply.
///
/// `risk_score` is expected in [0, 1] but is passed through as the model
/// produced it. Unknown keys in the reply are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanAnalysisResult {
    pub risk_score: f64,
    pub summary: String,
    pub contradictions: Vec<String>,
    pub hidden_fees: Vec<String>,
}

impl LoanAnalysisResult {
    /// True when the score sits in the range the prompt asks for
    pub fn score_in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.risk_score)
    }
}

// ============================================================================
// ANALYSIS OUTPUT
// ============================================================================

/// What the normalizer hands back to callers.
///
/// With schema enforcement the reply is checked against
/// [`LoanAnalysisResult`]; without it the parsed JSON is returned as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutput {
    Validated(LoanAnalysisResult),
    Raw(Value),
}

impl AnalysisOutput {
    pub fn as_validated(&self) -> Option<&LoanAnalysisResult> {
        match self {
            AnalysisOutput::Validated(result) => Some(result),
            AnalysisOutput::Raw(_) => None,
        }
    }

    /// Risk score if one can be read, used for logging
    pub fn risk_score(&self) -> Option<f64> {
        match self {
            AnalysisOutput::Validated(result) => Some(result.risk_score),
            AnalysisOutput::Raw(value) => value.get("risk_score").and_then(Value::as_f64),
        }
    }
}
