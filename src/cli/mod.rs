//! CLI module for Coursewise.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Coursewise - answer questions about course materials
///
/// Indexes course catalogs and lesson passages, then answers questions with a
/// language model that can search the index and read course outlines.
#[derive(Parser, Debug)]
#[command(name = "coursewise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "COURSEWISE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about the indexed courses
    Ask {
        /// The question to ask
        question: String,

        /// Earlier conversation to give the model as context
        #[arg(long)]
        history: Option<String>,

        /// Answer without letting the model use tools
        #[arg(long)]
        no_tools: bool,
    },

    /// Search course content directly
    Search {
        /// Search query
        query: String,

        /// Restrict to a course (partial names work)
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(long)]
        lesson: Option<u32>,
    },

    /// Show a course outline
    Outline {
        /// Full or partial course title
        course: String,
    },

    /// List indexed courses
    Courses,

    /// Import a pre-chunked course from a JSON file
    Import {
        /// JSON file with `course` and `chunks`
        file: String,

        /// Remove all indexed courses before importing
        #[arg(long)]
        clear: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
