//! Review scheduling and content materialization engine for a flashcard
//! study application.
//!
//! Three request-scoped subsystems, all free of cross-request state:
//! - [`cards`]: spaced repetition over a SQLite card store: review
//!   arithmetic, due-card listing, random sampling, session stats
//! - [`courses`]: flat path-addressed content records compiled into a
//!   navigation forest on every request
//! - [`generate`]: defensive normalization of externally generated card
//!   text into validated drafts
//!
//! Routing, authentication, rendering and the text providers themselves
//! live in the host application; this crate only consumes their inputs
//! and hands back typed results.

pub mod cards;
pub mod courses;
pub mod generate;
pub mod tags;

pub use cards::{Card, CardKind, CardStore, CardStoreError, ReviewOutcome, ReviewStats};
pub use courses::{
    compile_tree, ContentRecord, ContentStore, ContentStoreError, FileMeta, NodeKind, TreeNode,
};
pub use generate::{normalize_generated, CardDraft, GenerateError, NormalizedBatch};
pub use tags::sanitize_tags;
