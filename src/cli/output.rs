//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a citation, showing the link of anchor-style sources dimmed.
    pub fn source(citation: &str) {
        match split_anchor(citation) {
            Some((href, text)) => println!(
                "  {} {} {}",
                style("*").cyan(),
                style(text).bold(),
                style(href).dim()
            ),
            None => Self::list_item(citation),
        }
    }

    /// Print a tool call made while answering.
    pub fn tool_call(call: &str, failed: bool) {
        let marker = if failed {
            style("x").red()
        } else {
            style("~").dim()
        };
        println!("  {} {}", marker, style(call).dim());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Split `<a href="LINK" ...>TEXT</a>` into `(LINK, TEXT)`.
fn split_anchor(citation: &str) -> Option<(&str, &str)> {
    let rest = citation.strip_prefix("<a href=\"")?;
    let (href, rest) = rest.split_once('"')?;
    let (_, rest) = rest.split_once('>')?;
    let text = rest.strip_suffix("</a>")?;
    Some((href, text))
}
