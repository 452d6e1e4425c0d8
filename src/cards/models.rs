//! Data models for cards and review state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::algorithm::DEFAULT_EASE_FACTOR;

/// Type of flashcard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardKind {
    /// Simple question and answer
    Basic,
    /// Fill-in-the-blank style
    Cloze,
}

impl Default for CardKind {
    fn default() -> Self {
        Self::Basic
    }
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Cloze => "cloze",
        }
    }

    /// Parse a stored kind, falling back to Basic for anything unknown.
    pub fn parse(s: &str) -> Self {
        match s {
            "cloze" => Self::Cloze,
            _ => Self::Basic,
        }
    }
}

/// Outcome of a single review attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewOutcome {
    /// The answer was recalled
    Remembered,
    /// The answer was not recalled
    Forgotten,
}

/// A flashcard together with its spaced repetition state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub kind: CardKind,
    /// Current review interval in days (0 = never reviewed)
    #[serde(default)]
    pub interval_days: i64,
    /// Interval multiplier on successful recall (default 2.5)
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    /// When the card is due for review
    pub due_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn default_ease_factor() -> f64 {
    DEFAULT_EASE_FACTOR
}

impl Card {
    /// Create a new card, due immediately.
    pub fn new(owner_id: Uuid, question: String, answer: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            question,
            answer,
            kind: CardKind::default(),
            interval_days: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            due_at: now,
            last_reviewed_at: None,
            created_at: now,
        }
    }

    /// Check if the card is due at the given instant
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

/// Review-session statistics for one owner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_cards: usize,
    /// Cards with a due date at or before "now"
    pub due_cards: usize,
    /// Cards that have never been reviewed
    pub new_cards: usize,
}
