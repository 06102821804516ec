//! CLI command implementations.

mod ask;
mod config;
mod courses;
mod import;
mod outline;
mod search;

pub use ask::run_ask;
pub use config::run_config;
pub use courses::run_courses;
pub use import::run_import;
pub use outline::run_outline;
pub use search::run_search;
