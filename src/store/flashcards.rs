use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::debug;
use uuid::Uuid;

use crate::card::{Difficulty, Flashcard, ReviewEvent};
use crate::error::StoreError;
use crate::sm2::ScheduleState;

use super::Store;

#[derive(Debug, FromRow)]
struct FlashcardRow {
    id: Uuid,
    user_id: String,
    subject: String,
    topic_id: Option<Uuid>,
    question: String,
    answer: String,
    difficulty: String,
    content_hash: String,
    repetitions: i64,
    ease_factor: f64,
    interval_days: i64,
    due_at: DateTime<Utc>,
    last_reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    version: i64,
}

impl From<FlashcardRow> for Flashcard {
    fn from(row: FlashcardRow) -> Flashcard {
        Flashcard {
            id: row.id,
            user_id: row.user_id,
            subject: row.subject,
            topic_id: row.topic_id,
            question: row.question,
            answer: row.answer,
            difficulty: Difficulty::parse_lenient(&row.difficulty),
            content_hash: row.content_hash,
            schedule: ScheduleState {
                repetitions: row.repetitions as u32,
                ease_factor: row.ease_factor,
                interval_days: row.interval_days as u32,
                due_at: row.due_at,
                last_reviewed_at: row.last_reviewed_at,
            },
            created_at: row.created_at,
            version: row.version,
        }
    }
}

const SELECT_FLASHCARD: &str = r#"
    SELECT id, user_id, subject, topic_id, question, answer, difficulty,
           content_hash, repetitions, ease_factor, interval_days, due_at,
           last_reviewed_at, created_at, version
    FROM flashcards
"#;

pub(super) const INSERT_FLASHCARD: &str = r#"
    INSERT INTO flashcards (
        id, user_id, subject, topic_id, question, answer, difficulty,
        content_hash, repetitions, ease_factor, interval_days, due_at,
        last_reviewed_at, created_at, version
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

pub(super) fn bind_insert<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    card: &'q Flashcard,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(card.id)
        .bind(&card.user_id)
        .bind(&card.subject)
        .bind(card.topic_id)
        .bind(&card.question)
        .bind(&card.answer)
        .bind(card.difficulty.as_str())
        .bind(&card.content_hash)
        .bind(card.schedule.repetitions as i64)
        .bind(card.schedule.ease_factor)
        .bind(card.schedule.interval_days as i64)
        .bind(card.schedule.due_at)
        .bind(card.schedule.last_reviewed_at)
        .bind(card.created_at)
        .bind(card.version)
}

impl Store {
    pub async fn add_flashcard(&self, card: &Flashcard) -> Result<(), StoreError> {
        bind_insert(sqlx::query(INSERT_FLASHCARD), card)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert a generated batch in one transaction so a cancelled or
    /// failed generation never part-commits.
    pub async fn add_flashcards_batch(&self, cards: &[Flashcard]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for card in cards {
            bind_insert(sqlx::query(INSERT_FLASHCARD), card)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_flashcard(&self, id: Uuid) -> Result<Flashcard, StoreError> {
        let row: Option<FlashcardRow> =
            sqlx::query_as(&format!("{SELECT_FLASHCARD} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Flashcard::from)
            .ok_or(StoreError::FlashcardNotFound(id))
    }

    pub async fn delete_flashcard(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM flashcards WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Cards due at or before `now`, most overdue first, least-learned
    /// first among ties.
    pub async fn due_flashcards(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>, StoreError> {
        let rows: Vec<FlashcardRow> = sqlx::query_as(&format!(
            "{SELECT_FLASHCARD} WHERE user_id = ? AND due_at <= ? ORDER BY due_at ASC, repetitions ASC"
        ))
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Flashcard::from).collect())
    }

    /// Apply one review atomically: append the ReviewEvent, advance the
    /// schedule, and mark the day active, or none of it.
    ///
    /// The version check serializes concurrent submissions per card: a
    /// submission against an outdated version rolls back and surfaces
    /// as `StaleUpdate` so the caller can refetch and retry.
    pub async fn apply_review(
        &self,
        card: &Flashcard,
        event: &ReviewEvent,
        new_schedule: &ScheduleState,
    ) -> Result<Flashcard, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO review_events (flashcard_id, grade, reviewed_at) VALUES (?, ?, ?)",
        )
        .bind(event.flashcard_id)
        .bind(event.grade.value() as i64)
        .bind(event.reviewed_at)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            r#"
            UPDATE flashcards
            SET repetitions = ?,
                ease_factor = ?,
                interval_days = ?,
                due_at = ?,
                last_reviewed_at = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(new_schedule.repetitions as i64)
        .bind(new_schedule.ease_factor)
        .bind(new_schedule.interval_days as i64)
        .bind(new_schedule.due_at)
        .bind(new_schedule.last_reviewed_at)
        .bind(card.id)
        .bind(card.version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(flashcard_id = %card.id, version = card.version, "stale review submission");
            return Err(StoreError::StaleUpdate {
                flashcard_id: card.id,
                expected_version: card.version,
            });
        }

        sqlx::query("INSERT OR IGNORE INTO daily_activity (user_id, day) VALUES (?, ?)")
            .bind(&card.user_id)
            .bind(event.reviewed_at.date_naive())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let mut card = card.clone();
        card.schedule = *new_schedule;
        card.version += 1;
        Ok(card)
    }
}
