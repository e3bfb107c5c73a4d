//! # Glimpse
//!
//! A TUI text-selection assistant: read an article in the terminal, highlight
//! a term with the mouse, and get an AI-generated quick-reference card.
//!
//! ## Features
//!
//! - **Structured Intelligence**: typed `AnalysisResult` cards with category,
//!   summary bullets, tags, and reference links
//! - **Session Cache**: identical selections never hit the network twice
//! - **Graceful Degradation**: any AI failure shows a static fallback card

pub mod agent;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod page;
pub mod selection;
pub mod ui;

pub use analysis::{AnalysisResult, Category, ExternalLink};
pub use cache::SessionCache;
pub use config::Config;
pub use page::Page;
