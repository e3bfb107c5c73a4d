//! Glimpse CLI - AI info cards for highlighted text
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use glimpse::{agent, page, ui, AnalysisResult, Config, Page};

#[derive(Parser)]
#[command(name = "glimpse")]
#[command(author, version, about = "TUI text-selection assistant with AI info cards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a webpage in the reader
    Read {
        /// URL to fetch
        url: String,
    },
    /// Analyze a term once and print the card to stdout
    Analyze {
        /// Term or phrase to analyze
        text: String,
        /// Optional surrounding context for disambiguation
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            // Default: the built-in demo article
            let config = Config::load()?;
            ui::run(Page::demo(), config).await?;
        }
        Some(Commands::Read { url }) => {
            println!("Fetching: {}", url);
            let page = page::fetch_page(&url).await?;
            let config = Config::load()?;
            ui::run(page, config).await?;
        }
        Some(Commands::Analyze { text, context }) => {
            let config = Config::load()?;
            let result = agent::analyze_or_fallback(&text, &context, &config).await;
            print_card(&result);
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Print an analysis card to the terminal
fn print_card(result: &AnalysisResult) {
    println!(
        "{} {}",
        format!("[{}]", result.category.label()).magenta().bold(),
        result.title.bold()
    );
    println!();

    for point in &result.summary {
        println!("  {} {}", "•".dimmed(), point);
    }

    if !result.tags.is_empty() {
        println!();
        let tags = result
            .tags
            .iter()
            .map(|t| format!("#{}", t))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {}", tags.cyan());
    }

    if !result.external_links.is_empty() {
        println!();
        for link in &result.external_links {
            println!("  {} {}: {}", "↗".blue(), link.title.blue(), link.url.dimmed());
        }
    }
}
