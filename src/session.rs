//! Study-session orchestration: what is due, applying a review, and the
//! upload-to-flashcards ingestion pipeline.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::card::{Difficulty, Flashcard, FlashcardDraft, Grade, ReviewEvent, Topic};
use crate::error::{GenerationError, SessionError};
use crate::extract::{self, ExtractorConfig};
use crate::llm::{CompletionModel, Generator};
use crate::store::Store;
use crate::streak::StreakState;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Extra attempts after the first, spent only on retryable errors.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Coordinates the extractor, generator, scheduler and streak tracker
/// over one store.
#[derive(Clone, Debug)]
pub struct Coordinator<M> {
    store: Store,
    generator: Generator<M>,
    extractor: ExtractorConfig,
    retry: RetryPolicy,
}

impl<M: CompletionModel> Coordinator<M> {
    pub fn new(
        store: Store,
        generator: Generator<M>,
        extractor: ExtractorConfig,
        retry: RetryPolicy,
    ) -> Self {
        Coordinator {
            store,
            generator,
            extractor,
            retry,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Upload-to-flashcards pipeline: extract the document, generate
    /// drafts (retrying only transport failures), then commit the topic
    /// and the whole batch in one transaction. An abandoned call
    /// persists nothing.
    pub async fn ingest(
        &self,
        user_id: &str,
        subject: &str,
        title: &str,
        raw: &[u8],
        mime: &str,
        difficulty: Difficulty,
        count: usize,
        now: DateTime<Utc>,
    ) -> Result<(Topic, Vec<Flashcard>), SessionError> {
        let extracted = extract::extract(raw, mime, &self.extractor)?;
        let drafts = self.generate_with_retry(&extracted.text, count).await?;

        let topic = Topic::new(
            user_id,
            subject,
            title,
            extracted.text,
            difficulty,
            extracted.truncated,
            now,
        );
        let cards: Vec<Flashcard> = drafts
            .into_iter()
            .map(|draft| Flashcard::from_draft(draft, user_id, subject, Some(topic.id), now))
            .collect();

        self.store.add_topic_with_flashcards(&topic, &cards).await?;
        info!(
            user_id,
            subject,
            topic_id = %topic.id,
            cards = cards.len(),
            "ingested topic"
        );
        Ok((topic, cards))
    }

    /// Cards due at or before `now`, most overdue first, least-learned
    /// first among ties.
    pub async fn due_cards(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>, SessionError> {
        Ok(self.store.due_flashcards(user_id, now).await?)
    }

    /// Grade one card. Appends to the review ledger, advances the
    /// schedule and marks the UTC day active, all-or-nothing. A
    /// concurrent submission against the same card surfaces as
    /// `StoreError::StaleUpdate`; refetch and resubmit.
    pub async fn submit_review(
        &self,
        flashcard_id: Uuid,
        grade: u8,
        now: DateTime<Utc>,
    ) -> Result<Flashcard, SessionError> {
        let grade = Grade::new(grade)?;
        let card = self.store.get_flashcard(flashcard_id).await?;

        let next = card.schedule.review(grade, now);
        let event = ReviewEvent {
            flashcard_id,
            grade,
            reviewed_at: now,
        };

        let updated = self.store.apply_review(&card, &event, &next).await?;
        info!(
            %flashcard_id,
            grade = grade.value(),
            interval_days = updated.schedule.interval_days,
            due_at = %updated.schedule.due_at,
            "review applied"
        );
        Ok(updated)
    }

    /// Create a card by hand, outside any topic.
    pub async fn add_manual_card(
        &self,
        user_id: &str,
        subject: &str,
        draft: FlashcardDraft,
        now: DateTime<Utc>,
    ) -> Result<Flashcard, SessionError> {
        let card = Flashcard::from_draft(draft, user_id, subject, None, now);
        self.store.add_flashcard(&card).await?;
        Ok(card)
    }

    pub async fn delete_card(&self, flashcard_id: Uuid) -> Result<(), SessionError> {
        Ok(self.store.delete_flashcard(flashcard_id).await?)
    }

    /// Streak state derived from the activity ledger. UTC calendar days.
    pub async fn streak(&self, user_id: &str) -> Result<StreakState, SessionError> {
        let days = self.store.activity_days(user_id).await?;
        Ok(StreakState::from_days(days))
    }

    /// Record a learning activity for a day outside review submission
    /// (e.g. a topic was studied without grading cards) and return the
    /// recomputed streak.
    pub async fn record_activity(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> Result<StreakState, SessionError> {
        self.store.record_activity(user_id, day).await?;
        self.streak(user_id).await
    }

    async fn generate_with_retry(
        &self,
        content: &str,
        count: usize,
    ) -> Result<Vec<FlashcardDraft>, GenerationError> {
        let mut attempt = 0;
        loop {
            match self.generator.generate(content, count).await {
                Ok(drafts) => return Ok(drafts),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %err, "generation failed, retrying");
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::llm::GeneratorConfig;
    use crate::llm::testing::ScriptedModel;
    use crate::sm2::ScheduleState;
    use anyhow::anyhow;
    use chrono::Duration as ChronoDuration;

    const DRAFTS_JSON: &str = r#"[
        {"question": "What does ATP stand for?", "answer": "Adenosine triphosphate.", "difficulty": "easy"},
        {"question": "Where does glycolysis happen?", "answer": "In the cytoplasm."}
    ]"#;

    fn t0() -> DateTime<Utc> {
        "2026-06-01T09:00:00Z".parse().unwrap()
    }

    async fn coordinator(model: ScriptedModel) -> Coordinator<ScriptedModel> {
        let store = Store::in_memory().await.unwrap();
        let generator = Generator::new(model, GeneratorConfig::default());
        let retry = RetryPolicy {
            max_retries: 2,
            backoff: Duration::ZERO,
        };
        Coordinator::new(store, generator, ExtractorConfig::default(), retry)
    }

    #[tokio::test]
    async fn ingest_persists_topic_and_batch() {
        let coordinator = coordinator(ScriptedModel::replying(DRAFTS_JSON)).await;
        let (topic, cards) = coordinator
            .ingest(
                "ada",
                "biology",
                "Respiration",
                b"ATP is produced during cellular respiration.",
                "text/plain",
                Difficulty::Medium,
                2,
                t0(),
            )
            .await
            .unwrap();

        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| c.topic_id == Some(topic.id)));

        let due = coordinator.due_cards("ada", t0()).await.unwrap();
        assert_eq!(due.len(), 2);
        assert!(due.iter().all(|c| c.schedule.due_at == t0()));
    }

    #[tokio::test]
    async fn transient_model_failure_is_retried_once_more() {
        let model = ScriptedModel::new(vec![
            Err(GenerationError::ModelUnavailable(anyhow!("timeout"))),
            Ok(DRAFTS_JSON.to_string()),
        ]);
        let coordinator = coordinator(model).await;
        let (_, cards) = coordinator
            .ingest(
                "ada",
                "biology",
                "Respiration",
                b"some study material",
                "text/plain",
                Difficulty::Medium,
                2,
                t0(),
            )
            .await
            .unwrap();
        assert_eq!(cards.len(), 2);
    }

    #[tokio::test]
    async fn refusal_is_not_retried_and_persists_nothing() {
        let model = ScriptedModel::new(vec![Err(GenerationError::ModelRefused(
            "policy".to_string(),
        ))]);
        let coordinator = coordinator(model).await;
        let result = coordinator
            .ingest(
                "ada",
                "biology",
                "Respiration",
                b"some study material",
                "text/plain",
                Difficulty::Medium,
                2,
                t0(),
            )
            .await;
        assert!(matches!(
            result,
            Err(SessionError::Generation(GenerationError::ModelRefused(_)))
        ));

        assert!(coordinator.due_cards("ada", t0()).await.unwrap().is_empty());
        assert!(
            coordinator
                .store()
                .topics_for_subject("ada", "biology")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn review_advances_schedule_and_streak() {
        let coordinator = coordinator(ScriptedModel::replying(DRAFTS_JSON)).await;
        let (_, cards) = coordinator
            .ingest(
                "ada",
                "biology",
                "Respiration",
                b"material",
                "text/plain",
                Difficulty::Medium,
                2,
                t0(),
            )
            .await
            .unwrap();

        let card = coordinator
            .submit_review(cards[0].id, 5, t0())
            .await
            .unwrap();
        assert_eq!(card.schedule.repetitions, 1);
        assert_eq!(card.schedule.due_at, t0() + ChronoDuration::days(1));

        // second review the same day: streak unchanged
        coordinator
            .submit_review(cards[1].id, 4, t0())
            .await
            .unwrap();
        let streak = coordinator.streak("ada").await.unwrap();
        assert_eq!(streak.current_streak, 1);

        // next day extends the run
        let day2 = t0() + ChronoDuration::days(1);
        coordinator.submit_review(card.id, 5, day2).await.unwrap();
        let streak = coordinator.streak("ada").await.unwrap();
        assert_eq!(streak.current_streak, 2);
        assert_eq!(streak.longest_streak, 2);
        assert_eq!(streak.current_as_of(day2.date_naive()), 2);
    }

    #[tokio::test]
    async fn invalid_grade_is_reported_not_applied() {
        let coordinator = coordinator(ScriptedModel::replying(DRAFTS_JSON)).await;
        let (_, cards) = coordinator
            .ingest(
                "ada",
                "biology",
                "Respiration",
                b"material",
                "text/plain",
                Difficulty::Medium,
                2,
                t0(),
            )
            .await
            .unwrap();

        let err = coordinator
            .submit_review(cards[0].id, 9, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Scheduling(_)));

        let stored = coordinator
            .store()
            .get_flashcard(cards[0].id)
            .await
            .unwrap();
        assert_eq!(stored.schedule.repetitions, 0);
        assert!(
            coordinator
                .store()
                .reviews_for_flashcard(cards[0].id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn manual_activity_counts_like_a_review_day() {
        let coordinator = coordinator(ScriptedModel::new(vec![])).await;
        let day = t0().date_naive();

        let streak = coordinator.record_activity("ada", day).await.unwrap();
        assert_eq!(streak.current_streak, 1);

        // same day again: unchanged
        let streak = coordinator.record_activity("ada", day).await.unwrap();
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 1);
    }

    #[tokio::test]
    async fn unknown_card_is_not_found() {
        let coordinator = coordinator(ScriptedModel::new(vec![])).await;
        let err = coordinator
            .submit_review(Uuid::new_v4(), 4, t0())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Store(StoreError::FlashcardNotFound(_))
        ));
    }

    #[tokio::test]
    async fn ledger_replay_reproduces_stored_schedule() {
        let coordinator = coordinator(ScriptedModel::replying(DRAFTS_JSON)).await;
        let (_, cards) = coordinator
            .ingest(
                "ada",
                "biology",
                "Respiration",
                b"material",
                "text/plain",
                Difficulty::Medium,
                2,
                t0(),
            )
            .await
            .unwrap();
        let id = cards[0].id;
        let created_at = cards[0].created_at;

        for (i, grade) in [5u8, 5, 1, 3, 4].into_iter().enumerate() {
            coordinator
                .submit_review(id, grade, t0() + ChronoDuration::days(i as i64))
                .await
                .unwrap();
        }

        let stored = coordinator.store().get_flashcard(id).await.unwrap();
        let ledger = coordinator
            .store()
            .reviews_for_flashcard(id)
            .await
            .unwrap();
        let replayed = ScheduleState::replay(
            created_at,
            ledger.into_iter().map(|e| (e.grade, e.reviewed_at)),
        );
        assert_eq!(stored.schedule, replayed);
    }
}
