//! Configuration module for Coursewise.
//!
//! Handles loading and validating application settings.

mod settings;

pub use settings::{
    BackendProvider, BackendSettings, EmbeddingSettings, GeneralSettings, Settings,
    VectorStoreSettings,
};
