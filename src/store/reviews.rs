use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::card::{Grade, ReviewEvent};
use crate::error::StoreError;

use super::Store;

#[derive(Debug, FromRow)]
struct ReviewEventRow {
    flashcard_id: Uuid,
    grade: i64,
    reviewed_at: DateTime<Utc>,
}

impl Store {
    /// The full ledger for one flashcard, oldest first. Replaying it
    /// through the scheduler reproduces the card's stored schedule.
    pub async fn reviews_for_flashcard(
        &self,
        flashcard_id: Uuid,
    ) -> Result<Vec<ReviewEvent>, StoreError> {
        let rows: Vec<ReviewEventRow> = sqlx::query_as(
            r#"
            SELECT flashcard_id, grade, reviewed_at
            FROM review_events
            WHERE flashcard_id = ?
            ORDER BY reviewed_at ASC, id ASC
            "#,
        )
        .bind(flashcard_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let grade = Grade::new(row.grade as u8).map_err(|_| {
                    StoreError::Database(sqlx::Error::Decode(
                        format!("stored grade {} out of range", row.grade).into(),
                    ))
                })?;
                Ok(ReviewEvent {
                    flashcard_id: row.flashcard_id,
                    grade,
                    reviewed_at: row.reviewed_at,
                })
            })
            .collect()
    }
}
