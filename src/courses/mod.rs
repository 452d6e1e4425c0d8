//! Course content and navigation
//!
//! This module provides:
//! - Flat path-addressed content records with a sentinel convention for
//!   empty directories
//! - Per-request compilation of those records into a navigation forest
//! - Defensive frontmatter metadata parsing and tag queries

pub mod frontmatter;
pub mod models;
pub mod storage;
pub mod tree;

pub use models::*;
pub use storage::{ContentStore, ContentStoreError};
pub use tree::compile_tree;
