use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::card::{Difficulty, Flashcard, Topic};
use crate::error::StoreError;

use super::Store;
use super::flashcards::bind_insert;

#[derive(Debug, FromRow)]
struct TopicRow {
    id: Uuid,
    user_id: String,
    subject: String,
    title: String,
    content: String,
    difficulty: String,
    content_hash: String,
    truncated: bool,
    created_at: DateTime<Utc>,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Topic {
        Topic {
            id: row.id,
            user_id: row.user_id,
            subject: row.subject,
            title: row.title,
            content: row.content,
            difficulty: Difficulty::parse_lenient(&row.difficulty),
            content_hash: row.content_hash,
            truncated: row.truncated,
            created_at: row.created_at,
        }
    }
}

const INSERT_TOPIC: &str = r#"
    INSERT INTO topics (
        id, user_id, subject, title, content, difficulty,
        content_hash, truncated, created_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

impl Store {
    pub async fn add_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        sqlx::query(INSERT_TOPIC)
            .bind(topic.id)
            .bind(&topic.user_id)
            .bind(&topic.subject)
            .bind(&topic.title)
            .bind(&topic.content)
            .bind(topic.difficulty.as_str())
            .bind(&topic.content_hash)
            .bind(topic.truncated)
            .bind(topic.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Commit an ingested topic together with its generated flashcards
    /// in one transaction. An abandoned or failed ingestion leaves no
    /// trace.
    pub async fn add_topic_with_flashcards(
        &self,
        topic: &Topic,
        cards: &[Flashcard],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(INSERT_TOPIC)
            .bind(topic.id)
            .bind(&topic.user_id)
            .bind(&topic.subject)
            .bind(&topic.title)
            .bind(&topic.content)
            .bind(topic.difficulty.as_str())
            .bind(&topic.content_hash)
            .bind(topic.truncated)
            .bind(topic.created_at)
            .execute(&mut *tx)
            .await?;

        for card in cards {
            bind_insert(sqlx::query(super::flashcards::INSERT_FLASHCARD), card)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn topics_for_subject(
        &self,
        user_id: &str,
        subject: &str,
    ) -> Result<Vec<Topic>, StoreError> {
        let rows: Vec<TopicRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, subject, title, content, difficulty,
                   content_hash, truncated, created_at
            FROM topics
            WHERE user_id = ? AND subject = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(subject)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Topic::from).collect())
    }
}
