use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::sm2::ScheduleState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Lenient parse for untrusted model output. Unknown labels fall
    /// back to Medium rather than dropping the candidate.
    pub fn parse_lenient(s: &str) -> Difficulty {
        match s.trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

/// One chunk of normalized study material. Content is immutable once
/// created; re-uploading the same document makes a new Topic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub user_id: String,
    pub subject: String,
    pub title: String,
    pub content: String,
    pub difficulty: Difficulty,
    pub content_hash: String,
    pub truncated: bool,
    pub created_at: DateTime<Utc>,
}

impl Topic {
    pub fn new(
        user_id: &str,
        subject: &str,
        title: &str,
        content: String,
        difficulty: Difficulty,
        truncated: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        let content_hash = fingerprint(&content);
        Topic {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            subject: subject.to_string(),
            title: title.to_string(),
            content,
            difficulty,
            content_hash,
            truncated,
            created_at,
        }
    }
}

/// A validated question/answer candidate from the generator, not yet
/// persisted. The fingerprint lets callers deduplicate retried
/// generations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardDraft {
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub fingerprint: String,
}

impl FlashcardDraft {
    pub fn new(question: String, answer: String, difficulty: Difficulty) -> Self {
        let fingerprint = fingerprint(&format!("{}\n{}", question, answer));
        FlashcardDraft {
            question,
            answer,
            difficulty,
            fingerprint,
        }
    }
}

/// A question/answer pair with its own spaced-repetition schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: Uuid,
    pub user_id: String,
    pub subject: String,
    pub topic_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub content_hash: String,
    pub schedule: ScheduleState,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped on every schedule update.
    pub version: i64,
}

impl Flashcard {
    pub fn from_draft(
        draft: FlashcardDraft,
        user_id: &str,
        subject: &str,
        topic_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Flashcard {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            subject: subject.to_string(),
            topic_id,
            question: draft.question,
            answer: draft.answer,
            difficulty: draft.difficulty,
            content_hash: draft.fingerprint,
            schedule: ScheduleState::new(created_at),
            created_at,
            version: 0,
        }
    }
}

/// Recall quality for a single review, 0..=5. 3 and above counts as
/// successful recall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub fn new(value: u8) -> Result<Self, SchedulingError> {
        if value > 5 {
            return Err(SchedulingError::InvalidGrade(value));
        }
        Ok(Grade(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_passing(&self) -> bool {
        self.0 >= 3
    }
}

impl TryFrom<u8> for Grade {
    type Error = SchedulingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Grade::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> u8 {
        grade.0
    }
}

/// Immutable record of one review. The ledger these form is the source
/// of truth the schedule can always be replayed from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub flashcard_id: Uuid,
    pub grade: Grade,
    pub reviewed_at: DateTime<Utc>,
}

// things that shouldn't change the fingerprint:
// whitespace runs, line wrapping, case
// things that should:
// word order, punctuation, anything semantic
pub fn fingerprint(s: &str) -> String {
    let lower = s.to_lowercase();

    let mut collapsed = String::with_capacity(lower.len());
    let mut last_was_space = false;

    for ch in lower.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                collapsed.push(' ');
                last_was_space = true;
            }
        } else {
            collapsed.push(ch);
            last_was_space = false;
        }
    }

    let mut hasher = Hasher::new();
    hasher.update(collapsed.trim().as_bytes());
    hasher.finalize().to_string()
}
