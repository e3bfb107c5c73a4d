//! Page content for the reader.
//!
//! A page is a title plus a list of paragraphs, either the built-in demo
//! article or a webpage fetched with reqwest and extracted with scraper.

use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;

/// User-Agent string identifying this reader
const USER_AGENT: &str = concat!(
    "glimpse/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/glimpse-tui/glimpse)"
);

/// Default timeout for HTTP requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Paragraphs shorter than this are treated as navigation noise
const MIN_PARAGRAPH_LEN: usize = 20;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("no readable content found at URL")]
    NoContent,
}

/// A document shown in the reader pane
#[derive(Debug, Clone)]
pub struct Page {
    /// Page title shown in the header
    pub title: String,
    /// Where the content came from (URL or "demo")
    pub source: String,
    /// Readable paragraphs in document order
    pub paragraphs: Vec<String>,
}

impl Page {
    /// The built-in demo article used when no URL is given.
    ///
    /// Stands in for a host page the assistant would normally be injected
    /// into; its terms are chosen to be worth highlighting.
    pub fn demo() -> Self {
        let paragraphs = [
            "As we move deeper into the era of artificial intelligence, tools like \
             Large Language Models (LLMs) are reshaping how we interact with \
             information. From Google Gemini to OpenAI's GPT-4, the landscape is \
             evolving rapidly.",
            "The concept of RAG (Retrieval-Augmented Generation) has become a \
             cornerstone for building accurate AI applications. Unlike standard \
             models that hallucinate facts, RAG allows systems to fetch real-time \
             data from a vector database before generating a response.",
            "Imagine reading a complex paper on Quantum Computing. You encounter \
             terms like \"Superposition\" or \"Entanglement\". In the past, you'd \
             open a new tab to search Wikipedia. Today, reading tools powered by \
             semantic search can bring that knowledge directly to your cursor.",
            "Companies like Neuralink are even exploring direct brain-computer \
             interfaces, but for now, software aids are our best bridge to \
             enhanced cognition.",
            "\"The goal is not to replace human thought, but to augment it with \
             infinite context and instantaneous recall.\" — Dr. Elena Vance, AI \
             Researcher.",
            "Key technologies to watch: WebAssembly (Wasm) enables high-performance \
             code in constrained runtimes. Edge Computing processes data closer to \
             the user to reduce latency. Multi-modal models understand text, image, \
             and video simultaneously.",
            "Try it out: select any term in this article (like \"Quantum \
             Computing\", \"Google Gemini\", or \"WebAssembly\") with the mouse. An \
             icon will appear below the selection; click it to learn more.",
        ];

        Self {
            title: "The Future of Generative AI in Modern Development".to_string(),
            source: "demo".to_string(),
            paragraphs: paragraphs.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Create a configured HTTP client for page fetching
fn create_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Fetch a webpage and extract it as a readable page
pub async fn fetch_page(url: &str) -> Result<Page, PageError> {
    let client = create_client()?;

    let response = client.get(url).send().await?;
    let html = response.text().await?;
    let document = Html::parse_document(&html);

    let title = extract_title(&document).unwrap_or_else(|| url.to_string());
    let paragraphs = extract_paragraphs(&document);

    if paragraphs.is_empty() {
        return Err(PageError::NoContent);
    }

    Ok(Page {
        title,
        source: url.to_string(),
        paragraphs,
    })
}

/// Extract the page title from <title> or <h1>
fn extract_title(document: &Html) -> Option<String> {
    for selector_str in ["title", "h1"] {
        let selector = Selector::parse(selector_str).unwrap();
        if let Some(element) = document.select(&selector).next() {
            let title: String = element.text().collect();
            if !title.trim().is_empty() {
                return Some(title.trim().to_string());
            }
        }
    }

    None
}

/// Extract readable paragraphs, preferring main content areas
fn extract_paragraphs(document: &Html) -> Vec<String> {
    let main_selectors = ["article", "main", "[role='main']", ".content", "#content"];

    for selector_str in main_selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let paragraphs =
                    paragraphs_from_element(&Html::parse_fragment(&element.html()));
                if !paragraphs.is_empty() {
                    return paragraphs;
                }
            }
        }
    }

    // Fall back to the whole document
    paragraphs_from_element(document)
}

/// Collect text from paragraphs, headings, and list items
fn paragraphs_from_element(document: &Html) -> Vec<String> {
    let content_selector = Selector::parse("p, h2, h3, h4, blockquote, li").unwrap();

    let mut paragraphs: Vec<String> = Vec::new();

    for element in document.select(&content_selector) {
        let text: String = element.text().collect::<Vec<_>>().join(" ");
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");

        if cleaned.len() >= MIN_PARAGRAPH_LEN {
            paragraphs.push(cleaned);
        }
    }

    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_page_has_selectable_content() {
        let page = Page::demo();
        assert!(!page.title.is_empty());
        assert!(page.paragraphs.len() >= 5);
        assert!(page.paragraphs.iter().any(|p| p.contains("Quantum Computing")));
    }

    #[test]
    fn extracts_paragraphs_from_article_body() {
        let html = r#"
            <html><head><title>Test Page</title></head>
            <body>
              <nav><ul><li>Home</li></ul></nav>
              <article>
                <p>This is the first paragraph of the article body.</p>
                <p>tiny</p>
                <p>And here is a second, sufficiently long paragraph.</p>
              </article>
            </body></html>
        "#;
        let document = Html::parse_document(html);

        assert_eq!(extract_title(&document).as_deref(), Some("Test Page"));

        let paragraphs = extract_paragraphs(&document);
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].starts_with("This is the first"));
    }

    #[test]
    fn falls_back_to_h1_title() {
        let html = "<html><body><h1> Heading Title </h1><p>Some body text here, long enough.</p></body></html>";
        let document = Html::parse_document(html);
        assert_eq!(extract_title(&document).as_deref(), Some("Heading Title"));
    }
}
