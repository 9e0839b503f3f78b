// 📝 Prompt Builder - Instruction template for the risk analyst model

use crate::context::RegulatoryContext;

/// Renders the analysis prompt around a loan document.
///
/// Pure formatting: same document and context always give the same prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    context: RegulatoryContext,
}

impl PromptBuilder {
    pub fn new(context: RegulatoryContext) -> Self {
        PromptBuilder { context }
    }

    /// Build the full prompt for one document
    pub fn build_prompt(&self, document_text: &str) -> String {
        format!(
            r#"
You are a financial risk analyst.

Use the regulatory context below to analyze the loan agreement.

REGULATORY CONTEXT:
{context}

LOAN DOCUMENT:
{document}

TASK:
1. Detect contradictions
2. Detect hidden or unclear fees
3. Summarize risks in plain language
4. Assign a risk score between 0 and 1

Return ONLY valid JSON in this exact format:
{{
  "risk_score": number,
  "summary": string,
  "contradictions": [string],
  "hidden_fees": [string]
}}
"#,
            context = self.context.as_str(),
            document = document_text,
        )
    }
}
