//! studykit: turn uploaded study material into flashcards and review
//! them on an optimal cadence.
//!
//! The crate is a library engine. Transport, auth and UI live in the
//! embedding application; this crate owns extraction, flashcard
//! generation via an external model, SM-2 scheduling, streak tracking
//! and the session coordination that ties them together.

pub mod card;
pub mod error;
pub mod extract;
pub mod llm;
pub mod session;
pub mod sm2;
pub mod store;
pub mod streak;

pub use card::{Difficulty, Flashcard, FlashcardDraft, Grade, ReviewEvent, Topic};
pub use error::{
    ExtractionError, GenerationError, SchedulingError, SessionError, StoreError,
};
pub use extract::{Extracted, ExtractorConfig, extract};
pub use llm::{CompletionModel, Generator, GeneratorConfig, OpenAiModel};
pub use session::{Coordinator, RetryPolicy};
pub use sm2::ScheduleState;
pub use store::Store;
pub use streak::StreakState;
