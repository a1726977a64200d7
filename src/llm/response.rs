//! Parsing and validation of untrusted model output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::card::{Difficulty, FlashcardDraft};
use crate::error::GenerationError;

// Models regularly wrap JSON in a markdown fence despite instructions.
static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\[.*\])\s*```").expect("fence pattern compiles")
});

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
}

/// Parse a raw model response into validated drafts.
///
/// One repair attempt is made on responses that are not bare JSON;
/// after that the response is `MalformedResponse`. Candidates with an
/// empty question or answer are dropped; if nothing survives the result
/// is `EmptyGeneration`, never an empty success.
pub fn parse_drafts(raw: &str) -> Result<Vec<FlashcardDraft>, GenerationError> {
    let candidates: Vec<Candidate> = match serde_json::from_str(raw) {
        Ok(candidates) => candidates,
        Err(first_err) => {
            let repaired = repair_payload(raw).ok_or_else(|| {
                GenerationError::MalformedResponse(first_err.to_string())
            })?;
            serde_json::from_str(repaired)
                .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?
        }
    };

    let total = candidates.len();
    let drafts: Vec<FlashcardDraft> = candidates
        .into_iter()
        .filter_map(validate_candidate)
        .collect();

    if drafts.len() < total {
        warn!(
            dropped = total - drafts.len(),
            total, "dropped invalid draft candidates"
        );
    }

    if drafts.is_empty() {
        return Err(GenerationError::EmptyGeneration);
    }
    Ok(drafts)
}

fn validate_candidate(candidate: Candidate) -> Option<FlashcardDraft> {
    let question = candidate.question?.trim().to_string();
    let answer = candidate.answer?.trim().to_string();
    if question.is_empty() || answer.is_empty() {
        return None;
    }

    let difficulty = candidate
        .difficulty
        .as_deref()
        .map(Difficulty::parse_lenient)
        .unwrap_or(Difficulty::Medium);

    Some(FlashcardDraft::new(question, answer, difficulty))
}

// Single repair attempt: prefer a fenced block, otherwise slice the
// outermost bracket pair.
fn repair_payload(raw: &str) -> Option<&str> {
    if let Some(captures) = FENCED_JSON.captures(raw) {
        return Some(captures.get(1).expect("fence group").as_str());
    }

    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if start < end {
        Some(&raw[start..=end])
    } else {
        None
    }
}
