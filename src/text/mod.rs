//! Text normalization and similarity scoring.
//!
//! Both the verification loop (script vs. transcript) and the segment
//! aligner (unit vs. transcript window) compare texts the same way:
//!
//! ```text
//! raw text ──normalize──▶ lower-case, alphanumerics only
//!          ──similarity_ratio──▶ 2·M / (|a| + |b|)   ∈ [0, 1]
//! ```
//!
//! where `M` is the number of characters covered by the longest matching
//! blocks between the two strings.

pub mod normalize;
pub mod similarity;

pub use normalize::normalize;
pub use similarity::{normalized_similarity, similarity_ratio};
