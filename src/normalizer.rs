// 🧹 Response Normalizer - Model text → structured analysis
// Soft on formatting noise (markdown fences), hard on content shape

use crate::analysis::{AnalysisOutput, LoanAnalysisResult};
use serde_json::Value;
use thiserror::Error;

const FENCE: &str = "```";

// ============================================================================
// ERRORS
// ============================================================================

/// Model output could not be read as the expected structure
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ParseError {
    #[from]
    source: serde_json::Error,
}

impl ParseError {
    /// Underlying JSON error category (syntax, data, eof, io)
    pub fn category(&self) -> serde_json::error::Category {
        self.source.classify()
    }
}

// ============================================================================
// FENCE STRIPPING
// ============================================================================

/// Remove a surrounding markdown code fence, if any.
///
/// Text that does not start with a fence is only trimmed. For fenced text the
/// first enclosed segment is kept, minus an info string such as `json`.
pub fn strip_fences(raw: &str) -> &str {
    let text = raw.trim();
    if !text.starts_with(FENCE) {
        return text;
    }

    match text.split(FENCE).nth(1) {
        Some(segment) => drop_info_string(segment.trim()),
        None => text,
    }
}

/// Drop a leading language tag line (```json, ```JSON, ```jsonc ...).
/// A single-line segment is the payload itself and is kept.
fn drop_info_string(segment: &str) -> &str {
    let Some((first_line, rest)) = segment.split_once('\n') else {
        return segment;
    };
    let first_line = first_line.trim();

    let is_tag = !first_line.is_empty()
        && first_line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'));

    if is_tag {
        rest.trim()
    } else {
        segment
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

/// Turns raw model text into an [`AnalysisOutput`].
///
/// Whether the [`LoanAnalysisResult`] schema is enforced is decided once,
/// when the normalizer is built.
#[derive(Debug, Clone, Copy)]
pub struct ResponseNormalizer {
    enforce_schema: bool,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ResponseNormalizer {
    pub fn new(enforce_schema: bool) -> Self {
        ResponseNormalizer { enforce_schema }
    }

    pub fn schema_enforced(&self) -> bool {
        self.enforce_schema
    }

    pub fn normalize(&self, raw_response: &str) -> Result<AnalysisOutput, ParseError> {
        let body = strip_fences(raw_response);

        if self.enforce_schema {
            let result: LoanAnalysisResult = serde_json::from_str(body)?;
            Ok(AnalysisOutput::Validated(result))
        } else {
            let value: Value = serde_json::from_str(body)?;
            Ok(AnalysisOutput::Raw(value))
        }
    }
}
