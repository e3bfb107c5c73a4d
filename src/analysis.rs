//! Analysis result - the core structured output from the LLM agent.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Classification label attached to an analyzed term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Person,
    Concept,
    Location,
    Organization,
    Event,
    Technology,
    General,
}

impl Category {
    /// Short glyph shown in the card's category badge
    pub fn glyph(&self) -> &'static str {
        match self {
            Category::Person => "◉",
            Category::Concept => "✦",
            Category::Location => "◈",
            Category::Organization => "▣",
            Category::Event => "◷",
            Category::Technology => "⚙",
            Category::General => "?",
        }
    }

    /// Uppercase label as shown on the badge
    pub fn label(&self) -> &'static str {
        match self {
            Category::Person => "PERSON",
            Category::Concept => "CONCEPT",
            Category::Location => "LOCATION",
            Category::Organization => "ORGANIZATION",
            Category::Event => "EVENT",
            Category::Technology => "TECHNOLOGY",
            Category::General => "GENERAL",
        }
    }
}

/// Reference link attached to an analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExternalLink {
    /// Display name of the source (e.g. "Wikipedia")
    pub title: String,
    pub url: String,
}

/// Structured explanation of a highlighted term.
///
/// This is the exact shape the LLM is asked to produce; anything else fails
/// parsing and the caller substitutes [`AnalysisResult::fallback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Corrected or canonical name of the term
    pub title: String,
    /// Classification of the term
    pub category: Category,
    /// 2-3 short bullet points explaining the term
    pub summary: Vec<String>,
    /// Up to 3 relevant meta tags
    pub tags: Vec<String>,
    /// 1-2 reference links, possibly empty
    pub external_links: Vec<ExternalLink>,
}

impl AnalysisResult {
    /// Static substitute shown when the AI call fails for any reason.
    pub fn fallback(text: &str) -> Self {
        Self {
            title: text.to_string(),
            category: Category::General,
            summary: vec!["Could not analyze the text at this time. Please try again.".to_string()],
            tags: vec!["Error".to_string()],
            external_links: Vec::new(),
        }
    }

    /// Plain-text rendition used for copy-to-clipboard style output
    pub fn as_plain_text(&self) -> String {
        let mut out = self.title.clone();
        out.push_str("\n\n");
        out.push_str(&self.summary.join("\n"));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_screaming_case() {
        let json = serde_json::to_string(&Category::Technology).unwrap();
        assert_eq!(json, "\"TECHNOLOGY\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::Technology);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let result: Result<Category, _> = serde_json::from_str("\"ANIMAL\"");
        assert!(result.is_err());
    }

    #[test]
    fn result_parses_camel_case_payload() {
        let payload = r#"{
            "title": "Rust",
            "category": "TECHNOLOGY",
            "summary": ["A systems programming language."],
            "tags": ["programming"],
            "externalLinks": [{"title": "Wikipedia", "url": "https://en.wikipedia.org/wiki/Rust"}]
        }"#;
        let result: AnalysisResult = serde_json::from_str(payload).unwrap();
        assert_eq!(result.category, Category::Technology);
        assert_eq!(result.external_links.len(), 1);
        assert_eq!(result.external_links[0].title, "Wikipedia");
    }

    #[test]
    fn fallback_keeps_selected_text_as_title() {
        let fb = AnalysisResult::fallback("Quantum Computing");
        assert_eq!(fb.title, "Quantum Computing");
        assert_eq!(fb.category, Category::General);
        assert_eq!(fb.tags, vec!["Error".to_string()]);
        assert!(fb.external_links.is_empty());
    }
}
