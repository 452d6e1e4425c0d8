//! Flashcards and spaced repetition
//!
//! This module provides:
//! - Card models and CRUD over the SQLite store
//! - The two-outcome spaced repetition algorithm
//! - Due-card listing, random sampling and session statistics

pub mod algorithm;
pub mod models;
pub mod storage;

pub use models::*;
pub use storage::{CardStore, CardStoreError};
