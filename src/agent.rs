//! LLM agent module for term analysis.
//!
//! Uses rstructor for structured output from LLMs.

pub use crate::analysis::AnalysisResult;

use crate::config::Config;
use rstructor::{GeminiClient, GeminiModel, LLMClient};
use thiserror::Error;

/// Maximum number of surrounding-context characters carried in the prompt
pub const CONTEXT_LIMIT: usize = 500;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("empty response from AI")]
    EmptyResponse,
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

/// Analyze a highlighted term, given up to [`CONTEXT_LIMIT`] characters of
/// the text surrounding it.
pub async fn analyze(
    text: &str,
    context: &str,
    config: &Config,
) -> Result<AnalysisResult, AgentError> {
    let api_key = config.api_key()?;

    let model = parse_gemini_model(&config.agent.model);

    let client = GeminiClient::new(api_key)
        .map_err(|e| AgentError::RequestFailed(e.to_string()))?
        .model(model);

    let prompt = build_prompt(text, context, &config.agent.persona);

    let result = client
        .generate_with_metadata(&prompt)
        .await
        .map_err(|e| AgentError::RequestFailed(e.to_string()))?;

    if result.text.trim().is_empty() {
        return Err(AgentError::EmptyResponse);
    }

    // Clean the response (strip markdown code blocks if present)
    let cleaned = strip_markdown_json(&result.text);

    let analysis: AnalysisResult = serde_json::from_str(&cleaned)
        .map_err(|e| AgentError::ParseError(format!("{}: {}", e, cleaned)))?;

    Ok(analysis)
}

/// Like [`analyze`], but any failure is replaced with the static fallback
/// card. The caller never sees an error, only content.
pub async fn analyze_or_fallback(text: &str, context: &str, config: &Config) -> AnalysisResult {
    match analyze(text, context, config).await {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("analysis failed: {}", e);
            AnalysisResult::fallback(text)
        }
    }
}

/// Build the prompt including persona, schema, term, and truncated context
fn build_prompt(text: &str, context: &str, persona: &str) -> String {
    let context = truncate_context(context);

    format!(
        r#"{}

Analyze the following term or phrase: "{}".

Context of where this term appears (use this to disambiguate if needed):
"{}"

Provide a concise, neutral, and informative summary suitable for a quick-reference card.
Identify the category of the term.
Provide 2-3 short bullet points for the summary.
Provide up to 3 relevant tags.
Provide 1-2 external reference links (like Wikipedia) if applicable.
Keep summaries under 60 words total.

You MUST respond with valid JSON matching this exact schema:
{{
  "title": "string - the corrected or canonical name of the term",
  "category": "one of PERSON, CONCEPT, LOCATION, ORGANIZATION, EVENT, TECHNOLOGY, GENERAL",
  "summary": ["array of 2-3 short, punchy bullet points explaining the term"],
  "tags": ["array of up to 3 relevant meta tags"],
  "externalLinks": [{{"title": "string", "url": "string"}}]
}}

Do not include any markdown formatting, code blocks, or explanations. Only output the raw JSON object."#,
        persona, text, context
    )
}

/// Truncate context to [`CONTEXT_LIMIT`] characters on a char boundary
fn truncate_context(context: &str) -> &str {
    match context.char_indices().nth(CONTEXT_LIMIT) {
        Some((idx, _)) => &context[..idx],
        None => context,
    }
}

/// Strip markdown code block wrappers from JSON response
fn strip_markdown_json(text: &str) -> String {
    let trimmed = text.trim();

    // Remove ```json ... ``` or ``` ... ```
    if trimmed.starts_with("```") {
        let without_prefix = if trimmed.starts_with("```json") {
            &trimmed[7..]
        } else {
            &trimmed[3..]
        };

        if let Some(end_idx) = without_prefix.rfind("```") {
            return without_prefix[..end_idx].trim().to_string();
        }
    }

    trimmed.to_string()
}

/// Parse a model string into a GeminiModel
fn parse_gemini_model(model: &str) -> GeminiModel {
    match model {
        "gemini-2.0-flash" => GeminiModel::Gemini20Flash,
        "gemini-2.5-flash" => GeminiModel::Gemini25Flash,
        "gemini-2.5-pro" => GeminiModel::Gemini25Pro,
        _ => GeminiModel::Gemini20Flash, // Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_term_context_and_schema() {
        let prompt = build_prompt(
            "RAG",
            "retrieval augmented generation pipelines",
            "You are helpful.",
        );
        assert!(prompt.contains("\"RAG\""));
        assert!(prompt.contains("retrieval augmented generation"));
        assert!(prompt.contains("externalLinks"));
        assert!(prompt.starts_with("You are helpful."));
    }

    #[test]
    fn context_is_truncated_to_limit() {
        let long = "x".repeat(CONTEXT_LIMIT * 2);
        let prompt = build_prompt("term", &long, "persona");
        assert!(prompt.contains(&format!("\"{}\"", "x".repeat(CONTEXT_LIMIT))));
        assert!(!prompt.contains(&"x".repeat(CONTEXT_LIMIT + 1)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "é".repeat(CONTEXT_LIMIT + 10);
        assert_eq!(truncate_context(&long).chars().count(), CONTEXT_LIMIT);
    }

    #[test]
    fn strips_json_code_fences() {
        let wrapped = "```json\n{\"title\": \"x\"}\n```";
        assert_eq!(strip_markdown_json(wrapped), "{\"title\": \"x\"}");

        let bare = "```\n{}\n```";
        assert_eq!(strip_markdown_json(bare), "{}");

        let plain = "{\"a\": 1}";
        assert_eq!(strip_markdown_json(plain), plain);
    }
}
