//! Segment alignment: per-unit start/end times from a timestamped transcript.
//!
//! ```text
//!  units ─────────┐
//!                 ├──▶ SegmentAligner ──▶ AlignmentReport
//!  segments ──────┘      │                 - timings (one per unit)
//!                        │                 - accuracy 0..=100
//!                        ▼                 - unmatched indices
//!                   TimingStore (optional)
//! ```

pub mod accuracy;
pub mod adjust;
pub mod aligner;
pub mod matcher;
pub mod timing;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use accuracy::aggregate_accuracy;
pub use adjust::{adjust_timings, AdjustLimits};
pub use aligner::{validate_units, AlignError, SegmentAligner};
pub use matcher::{NormalizedSegments, WindowMatch};
pub use timing::{AlignmentReport, UnitTiming};
