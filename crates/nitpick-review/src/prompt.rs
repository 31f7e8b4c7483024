use nitpick_core::{Comment, NitpickError};

const ANALYZE_PROMPT: &str = "\
Given the following code changes in a pull request, analyze the logic and \
structure. Provide comments that address the following aspects:

- Code Logic: identify any logical errors or inefficiencies in the code.
- Good Code Practices: suggest improvements based on best practices, such as \
naming conventions, code organization, and readability.
- Security Issues: highlight any potential security vulnerabilities, such as \
unvalidated inputs, outdated dependencies, or improper error handling.

Reference specific line numbers from the diff and make every suggestion \
actionable. Keep comments clear and concise.

Respond with a JSON array in exactly this shape:

[
  {
    \"file\": \"filename.py\",
    \"line\": 42,
    \"suggestion\": \"Your suggestion here.\",
    \"type\": \"Logic\" | \"Good Code Practice\" | \"Security\"
  }
]

If there is nothing worth commenting on, return an empty array: []";

const REFINE_PROMPT: &str = "\
You are a review agent that validates and refines AI-generated code review \
comments. Your tasks:

- Remove hallucinations (incorrect or vague feedback).
- Improve clarity and ensure each suggestion is relevant.
- Ensure the suggestions align with good coding practices.

The input is a JSON array of comments. Respond with a valid JSON array in \
the same format as the input.";

const DEDUPE_PROMPT: &str = "\
You are an agent that filters and consolidates review comments before they \
are posted. Your tasks:

- Compare the candidate comments against the comments already posted on the \
pull request.
- Remove duplicate or redundant suggestions.
- Merge similar comments to avoid spamming developers.

The input is a JSON object with a \"refinedComments\" array and an \
\"existingComments\" text blob. Respond with a valid JSON array in the same \
format as the refinedComments entries.";

/// System instruction for the analysis stage.
///
/// # Examples
///
/// ```
/// use nitpick_review::prompt::analyze_instruction;
///
/// let prompt = analyze_instruction();
/// assert!(prompt.contains("JSON array"));
/// assert!(prompt.contains("Security"));
/// ```
pub fn analyze_instruction() -> &'static str {
    ANALYZE_PROMPT
}

/// System instruction for the review-and-refine stage.
pub fn refine_instruction() -> &'static str {
    REFINE_PROMPT
}

/// System instruction for the deduplication stage.
pub fn dedupe_instruction() -> &'static str {
    DEDUPE_PROMPT
}

/// Serialize a comment sequence as the refine stage's user message.
///
/// # Errors
///
/// Returns [`NitpickError::Json`] if serialization fails.
pub fn refine_payload(comments: &[Comment]) -> Result<String, NitpickError> {
    Ok(serde_json::to_string(comments)?)
}

/// Build the dedup stage's composite user message from the refined comments
/// and the existing-comments text.
///
/// # Errors
///
/// Returns [`NitpickError::Json`] if serialization fails.
///
/// # Examples
///
/// ```
/// use nitpick_review::prompt::dedupe_payload;
///
/// let payload = dedupe_payload(&[], "old comment").unwrap();
/// assert!(payload.contains("refinedComments"));
/// assert!(payload.contains("old comment"));
/// ```
pub fn dedupe_payload(comments: &[Comment], existing: &str) -> Result<String, NitpickError> {
    let payload = serde_json::json!({
        "refinedComments": comments,
        "existingComments": existing,
    });
    Ok(serde_json::to_string(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nitpick_core::Category;

    #[test]
    fn analyze_instruction_documents_the_schema() {
        let prompt = analyze_instruction();
        assert!(prompt.contains("\"file\""));
        assert!(prompt.contains("\"line\""));
        assert!(prompt.contains("\"suggestion\""));
        assert!(prompt.contains("\"type\""));
        assert!(prompt.contains("Good Code Practice"));
    }

    #[test]
    fn refine_instruction_mentions_hallucinations() {
        assert!(refine_instruction().contains("hallucinations"));
        assert!(refine_instruction().contains("JSON array"));
    }

    #[test]
    fn dedupe_instruction_mentions_merging() {
        assert!(dedupe_instruction().contains("Merge similar comments"));
    }

    #[test]
    fn refine_payload_is_json_array() {
        let comments = vec![Comment {
            file: "a.py".into(),
            line: Some(3),
            suggestion: "rename variable".into(),
            category: Category::GoodCodePractice,
        }];
        let payload = refine_payload(&comments).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["file"], "a.py");
        assert_eq!(value[0]["type"], "Good Code Practice");
    }

    #[test]
    fn dedupe_payload_carries_both_inputs() {
        let comments = vec![Comment {
            file: "b.py".into(),
            line: None,
            suggestion: "check bounds".into(),
            category: Category::Logic,
        }];
        let payload = dedupe_payload(&comments, "already posted").unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["existingComments"], "already posted");
        assert_eq!(value["refinedComments"][0]["file"], "b.py");
    }
}
