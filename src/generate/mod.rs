//! Generated-card normalization
//!
//! This module provides:
//! - Parsing and repair of raw text-provider output into card drafts
//! - Per-entry validation with a partial-success policy

pub mod models;
pub mod normalize;

pub use models::{CardDraft, NormalizedBatch};
pub use normalize::{normalize_generated, GenerateError};
