//! Configuration module for the narration engine.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per engine
//! component, `AppPaths` for cross-platform data directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AlignmentConfig, AppConfig, EstimatorConfig, StorageConfig, SttConfig, TtsConfig,
    VerificationConfig,
};
