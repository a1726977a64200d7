use super::client::Prompt;

const SYSTEM_PROMPT: &str = "You create study flashcards from source material. \
Respond with a JSON array only, no prose and no markdown fences. \
Each element is an object with string fields \"question\", \"answer\", and \
\"difficulty\" (one of \"easy\", \"medium\", \"hard\"). \
Questions must be answerable from the material alone.";

pub fn generation_prompt(content: &str, count: usize) -> Prompt {
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: format!(
            "Create {count} flashcards from the following study material.\n\n{content}"
        ),
    }
}
