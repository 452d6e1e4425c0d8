//! Storage operations for cards
//!
//! Cards live in a single SQLite table; every operation is scoped to an
//! owner and runs synchronously within the caller's request. The store
//! holds no state beyond the connection, and ownership checks are folded
//! into the row lookup itself: a card that does not exist and a card that
//! belongs to someone else produce the identical `CardNotFound` error.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

use super::algorithm::next_review;
use super::models::{Card, CardKind, ReviewOutcome, ReviewStats};

#[derive(Error, Debug)]
pub enum CardStoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("card not found: {0}")]
    CardNotFound(Uuid),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, CardStoreError>;

const CARD_COLUMNS: &str =
    "id, owner_id, question, answer, kind, interval_days, ease_factor, due_at, last_reviewed_at, created_at";

/// Storage manager for card and review operations
pub struct CardStore {
    conn: Connection,
}

impl CardStore {
    /// Open (or create) the card store at the given path.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open a store backed by an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'basic',
                interval_days INTEGER NOT NULL DEFAULT 0,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                due_at TEXT NOT NULL,
                last_reviewed_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cards_owner ON cards(owner_id);
            CREATE INDEX IF NOT EXISTS idx_cards_owner_due ON cards(owner_id, due_at);
            "#,
        )
    }

    // ==================== Card CRUD ====================

    /// Create a new card, due immediately.
    pub fn create_card(
        &self,
        owner_id: Uuid,
        question: String,
        answer: String,
        kind: CardKind,
    ) -> Result<Card> {
        let mut card = Card::new(owner_id, question, answer);
        card.kind = kind;

        self.conn.execute(
            "INSERT INTO cards (id, owner_id, question, answer, kind, interval_days, ease_factor, due_at, last_reviewed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9)",
            params![
                card.id.to_string(),
                card.owner_id.to_string(),
                card.question,
                card.answer,
                card.kind.as_str(),
                card.interval_days,
                card.ease_factor,
                ts_to_sql(card.due_at),
                ts_to_sql(card.created_at),
            ],
        )?;

        Ok(card)
    }

    /// Get a card owned by the given owner.
    pub fn get_card(&self, owner_id: Uuid, card_id: Uuid) -> Result<Card> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1 AND owner_id = ?2"),
                params![card_id.to_string(), owner_id.to_string()],
                CardRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => row.into_card(),
            None => Err(CardStoreError::CardNotFound(card_id)),
        }
    }

    /// List all cards for an owner, soonest-due first.
    pub fn list_cards(&self, owner_id: Uuid) -> Result<Vec<Card>> {
        self.query_cards(
            &format!("SELECT {CARD_COLUMNS} FROM cards WHERE owner_id = ?1 ORDER BY due_at, id"),
            params![owner_id.to_string()],
        )
    }

    /// Update the question and answer of an existing card.
    pub fn update_card_text(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        question: String,
        answer: String,
    ) -> Result<Card> {
        let changed = self.conn.execute(
            "UPDATE cards SET question = ?1, answer = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![question, answer, card_id.to_string(), owner_id.to_string()],
        )?;
        if changed == 0 {
            return Err(CardStoreError::CardNotFound(card_id));
        }
        self.get_card(owner_id, card_id)
    }

    /// Delete a card.
    pub fn delete_card(&self, owner_id: Uuid, card_id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM cards WHERE id = ?1 AND owner_id = ?2",
            params![card_id.to_string(), owner_id.to_string()],
        )?;
        if changed == 0 {
            return Err(CardStoreError::CardNotFound(card_id));
        }
        Ok(())
    }

    // ==================== Review Operations ====================

    /// Apply a review outcome to a card and persist the new state.
    ///
    /// Concurrent reviews of the same card are not serialized here; the
    /// last write wins, which can only produce a slightly stale interval.
    pub fn review(&self, owner_id: Uuid, card_id: Uuid, outcome: ReviewOutcome) -> Result<Card> {
        let mut card = self.get_card(owner_id, card_id)?;

        let now = Utc::now();
        let result = next_review(card.interval_days, card.ease_factor, outcome, now);

        let changed = self.conn.execute(
            "UPDATE cards SET interval_days = ?1, ease_factor = ?2, due_at = ?3, last_reviewed_at = ?4
             WHERE id = ?5 AND owner_id = ?6",
            params![
                result.interval_days,
                result.ease_factor,
                ts_to_sql(result.due_at),
                ts_to_sql(now),
                card.id.to_string(),
                card.owner_id.to_string(),
            ],
        )?;
        if changed == 0 {
            // Deleted between the read and the write
            return Err(CardStoreError::CardNotFound(card_id));
        }

        log::debug!(
            "reviewed card {}: {:?} -> interval {}d, ease {:.2}",
            card.id,
            outcome,
            result.interval_days,
            result.ease_factor
        );

        card.interval_days = result.interval_days;
        card.ease_factor = result.ease_factor;
        card.due_at = result.due_at;
        card.last_reviewed_at = Some(now);
        Ok(card)
    }

    /// List all cards due at `now`, soonest first; ties broken by id.
    pub fn list_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Card>> {
        self.query_cards(
            &format!(
                "SELECT {CARD_COLUMNS} FROM cards
                 WHERE owner_id = ?1 AND due_at <= ?2 ORDER BY due_at, id"
            ),
            params![owner_id.to_string(), ts_to_sql(now)],
        )
    }

    /// Pick a uniformly random card for an owner without scanning the table.
    ///
    /// Counts the rows under a stable ordering, draws an offset and fetches
    /// the single row at that offset under the same ordering. Inserts or
    /// deletes between the two statements can make the draw miss; that is
    /// accepted for a sampling feature.
    pub fn random_card(&self, owner_id: Uuid) -> Result<Option<Card>> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE owner_id = ?1",
            params![owner_id.to_string()],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Ok(None);
        }

        let offset = rand::thread_rng().gen_range(0..count);
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {CARD_COLUMNS} FROM cards
                     WHERE owner_id = ?1 ORDER BY id LIMIT 1 OFFSET ?2"
                ),
                params![owner_id.to_string(), offset],
                CardRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => Ok(Some(row.into_card()?)),
            None => {
                log::debug!("random card offset {} raced with a delete", offset);
                Ok(None)
            }
        }
    }

    /// Counts shown at the top of a review session.
    pub fn review_stats(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<ReviewStats> {
        let (total, due, new): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE due_at <= ?2),
                    COUNT(*) FILTER (WHERE last_reviewed_at IS NULL)
             FROM cards WHERE owner_id = ?1",
            params![owner_id.to_string(), ts_to_sql(now)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(ReviewStats {
            total_cards: total as usize,
            due_cards: due as usize,
            new_cards: new as usize,
        })
    }

    fn query_cards(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, CardRow::from_row)?;

        let mut cards = Vec::new();
        for row in rows {
            cards.push(row?.into_card()?);
        }
        Ok(cards)
    }
}

/// Raw row shape, converted to a `Card` after the statement is done.
struct CardRow {
    id: String,
    owner_id: String,
    question: String,
    answer: String,
    kind: String,
    interval_days: i64,
    ease_factor: f64,
    due_at: String,
    last_reviewed_at: Option<String>,
    created_at: String,
}

impl CardRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            question: row.get(2)?,
            answer: row.get(3)?,
            kind: row.get(4)?,
            interval_days: row.get(5)?,
            ease_factor: row.get(6)?,
            due_at: row.get(7)?,
            last_reviewed_at: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_card(self) -> Result<Card> {
        Ok(Card {
            id: parse_uuid(&self.id)?,
            owner_id: parse_uuid(&self.owner_id)?,
            question: self.question,
            answer: self.answer,
            kind: CardKind::parse(&self.kind),
            interval_days: self.interval_days,
            ease_factor: self.ease_factor,
            due_at: ts_from_sql(&self.due_at)?,
            last_reviewed_at: self.last_reviewed_at.as_deref().map(ts_from_sql).transpose()?,
            created_at: ts_from_sql(&self.created_at)?,
        })
    }
}

/// Fixed-width RFC 3339 so that string comparison in SQL is chronological.
fn ts_to_sql(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn ts_from_sql(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| CardStoreError::Corrupt(format!("timestamp: {s}")))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| CardStoreError::Corrupt(format!("uuid: {s}")))
}
