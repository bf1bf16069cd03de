//! Spoken-duration prediction.
//!
//! This module provides:
//! * [`DurationEstimator`]: reading-speed + pause model with a learned
//!   correction factor.
//! * [`DurationEstimate`] / [`UnitCountRange`]: forward and inverse results.
//! * [`LanguageProfile`] / [`PauseTable`] / [`UnitKind`]: per-language
//!   configuration tables.
//! * [`EstimatorRegistry`]: one shared estimator per language.

pub mod estimator;
pub mod language;
pub mod registry;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use estimator::{DurationEstimate, DurationEstimator, UnitCountRange};
pub use language::{LanguageProfile, PauseTable, UnitKind};
pub use registry::EstimatorRegistry;
