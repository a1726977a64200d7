use thiserror::Error;
use uuid::Uuid;

/// Errors from turning an uploaded document into topic content.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Errors from the generative-model boundary.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Network failure or timeout. The only retryable kind.
    #[error("model unavailable: {0}")]
    ModelUnavailable(#[source] anyhow::Error),

    /// The model declined the request (content policy, empty input).
    #[error("model refused: {0}")]
    ModelRefused(String),

    /// The response could not be parsed after one repair attempt.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// The model answered but no candidate survived validation.
    #[error("no usable flashcards in model response")]
    EmptyGeneration,
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::ModelUnavailable(_))
    }
}

/// Scheduler errors. Always caller mistakes, never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("grade {0} outside 0..=5")]
    InvalidGrade(u8),
}

/// Store-level failures, including the detectable concurrency race.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A review submission raced a concurrent update to the same
    /// flashcard. Refetch and resubmit.
    #[error("stale update for flashcard {flashcard_id} (expected version {expected_version})")]
    StaleUpdate {
        flashcard_id: Uuid,
        expected_version: i64,
    },

    #[error("flashcard {0} not found")]
    FlashcardNotFound(Uuid),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Anything a study-session operation can fail with.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
