//! Per-session analysis cache.
//!
//! Keyed by the exact selected text; lives for the lifetime of the process
//! and is never persisted or invalidated.

use crate::analysis::AnalysisResult;
use std::collections::HashMap;

/// In-memory cache of analysis results for the current session.
///
/// All access happens on the UI loop in response to discrete user actions,
/// so no interior locking is needed.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: HashMap<String, AnalysisResult>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previous result for the exact selected text
    pub fn get(&self, text: &str) -> Option<&AnalysisResult> {
        self.entries.get(text)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(text)
    }

    /// Store the result for a selection. Later results for the same text
    /// overwrite, which only happens if a fallback was cached and the user
    /// never re-requests anyway.
    pub fn insert(&mut self, text: &str, result: AnalysisResult) {
        self.entries.insert(text.to_string(), result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit_on_exact_text() {
        let mut cache = SessionCache::new();
        assert!(cache.get("WebAssembly").is_none());

        cache.insert("WebAssembly", AnalysisResult::fallback("WebAssembly"));
        assert!(cache.contains("WebAssembly"));
        assert_eq!(cache.get("WebAssembly").unwrap().title, "WebAssembly");

        // Keys are exact, not normalized
        assert!(!cache.contains("webassembly"));
        assert!(!cache.contains("WebAssembly "));
    }

    #[test]
    fn insert_overwrites_same_key() {
        let mut cache = SessionCache::new();
        cache.insert("term", AnalysisResult::fallback("term"));
        let mut better = AnalysisResult::fallback("term");
        better.summary = vec!["A real explanation.".to_string()];
        cache.insert("term", better.clone());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("term"), Some(&better));
    }
}
