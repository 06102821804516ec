//! Coursewise - question answering over course materials
//!
//! Answers natural-language questions about indexed courses by letting a
//! language model call retrieval tools for a bounded number of rounds.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `embedding` - Embedding generation
//! - `vector_store` - Catalog and passage storage with similarity queries
//! - `index` - Course name resolution and filtered passage search
//! - `backend` - Model backends (Anthropic, OpenAI)
//! - `agent` - Course tools, tool registry and the bounded tool loop
//! - `assistant` - Everything above wired together
//!
//! # Example
//!
//! ```rust,no_run
//! use coursewise::assistant::Assistant;
//! use coursewise::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let assistant = Assistant::from_settings(&settings)?;
//!
//!     let answer = assistant.ask("What is covered in lesson 2 of the RAG course?", None).await?;
//!     println!("{}", answer.text);
//!     for source in &answer.sources {
//!         println!("- {}", source);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod assistant;
pub mod backend;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod openai;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use error::{CoursewiseError, Result};
