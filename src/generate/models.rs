//! Data models for generated-card normalization

use serde::{Deserialize, Serialize};

/// An unvalidated, unpersisted candidate card. Drafts only exist between
/// normalization and the user's approval; they are never stored directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    pub question: String,
    pub answer: String,
}

/// The outcome of normalizing one generated payload: the drafts that
/// survived validation plus how many entries were dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBatch {
    pub drafts: Vec<CardDraft>,
    pub dropped: usize,
}

/// Wire shape the text provider is asked to produce.
#[derive(Debug, Deserialize)]
pub(crate) struct GeneratedPayload {
    pub cards: Vec<GeneratedEntry>,
}

/// One raw entry; missing fields count as empty and get the entry dropped.
#[derive(Debug, Deserialize)]
pub(crate) struct GeneratedEntry {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}
