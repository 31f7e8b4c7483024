use nitpick_core::{Category, Comment, NitpickError};

/// Result of decoding a model reply into comments.
///
/// Records that failed per-record validation are kept alongside their reason
/// so callers can report them instead of silently dropping or accepting them.
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    /// Records that passed schema validation.
    pub comments: Vec<Comment>,
    /// Records that were rejected, with their array index and reason.
    pub rejected: Vec<RejectedRecord>,
}

/// A model-emitted record that did not conform to the comment schema.
#[derive(Debug, Clone)]
pub struct RejectedRecord {
    /// Position in the decoded array.
    pub index: usize,
    /// Why the record was rejected.
    pub reason: String,
}

/// Decode a model reply into validated [`Comment`] records.
///
/// Trims whitespace, strips optional ```` ```json ````/```` ``` ```` fences,
/// parses the remainder as JSON, and validates each array element against
/// the comment schema. The model is untrusted input: non-conforming records
/// are rejected individually (never failing the batch, never accepted
/// malformed), a missing or invalid `line` degrades to `None`, and an
/// unparseable reply is a hard error carrying the raw text.
///
/// # Errors
///
/// - [`NitpickError::Decode`] if the reply is not valid JSON.
/// - [`NitpickError::Shape`] if the top-level value is not an array.
///
/// # Examples
///
/// ```
/// use nitpick_review::decode::decode_comments;
///
/// let reply = "```json\n[{\"file\":\"a.py\",\"line\":5,\
///     \"suggestion\":\"use a named constant\",\"type\":\"Good Code Practice\"}]\n```";
/// let decoded = decode_comments(reply).unwrap();
/// assert_eq!(decoded.comments.len(), 1);
/// assert_eq!(decoded.comments[0].file, "a.py");
/// ```
pub fn decode_comments(raw: &str) -> Result<Decoded, NitpickError> {
    let cleaned = strip_code_fences(raw);

    let value: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|e| NitpickError::Decode {
            message: e.to_string(),
            raw: raw.to_string(),
        })?;

    let serde_json::Value::Array(items) = value else {
        return Err(NitpickError::Shape(json_type_name(&value).to_string()));
    };

    let mut decoded = Decoded::default();
    for (index, item) in items.into_iter().enumerate() {
        match validate_record(&item) {
            Ok(comment) => decoded.comments.push(comment),
            Err(reason) => decoded.rejected.push(RejectedRecord { index, reason }),
        }
    }
    Ok(decoded)
}

fn validate_record(item: &serde_json::Value) -> Result<Comment, String> {
    let serde_json::Value::Object(obj) = item else {
        return Err(format!("expected an object, got {}", json_type_name(item)));
    };

    let file = match obj.get("file").and_then(|v| v.as_str()) {
        Some(f) if !f.trim().is_empty() => f.to_string(),
        Some(_) => return Err("empty \"file\" field".into()),
        None => return Err("missing or non-string \"file\" field".into()),
    };

    let suggestion = match obj.get("suggestion").and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        Some(_) => return Err("empty \"suggestion\" field".into()),
        None => return Err("missing or non-string \"suggestion\" field".into()),
    };

    let category = match obj.get("type").and_then(|v| v.as_str()) {
        Some(t) if !t.trim().is_empty() => Category::from(t.to_string()),
        _ => return Err("missing or non-string \"type\" field".into()),
    };

    // A hallucinated line must not block the comment, only its line anchor.
    let line = obj
        .get("line")
        .and_then(|v| v.as_u64())
        .filter(|&l| l > 0 && l <= u32::MAX as u64)
        .map(|l| l as u32);

    Ok(Comment {
        file,
        line,
        suggestion,
        category,
    })
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_plain_array() {
        let json = r#"[
            {"file": "a.py", "line": 5, "suggestion": "use a named constant", "type": "Good Code Practice"},
            {"file": "b.py", "line": 12, "suggestion": "validate input", "type": "Security"}
        ]"#;
        let decoded = decode_comments(json).unwrap();
        assert_eq!(decoded.comments.len(), 2);
        assert!(decoded.rejected.is_empty());
        assert_eq!(decoded.comments[0].file, "a.py");
        assert_eq!(decoded.comments[0].line, Some(5));
        assert_eq!(decoded.comments[1].category, Category::Security);
    }

    #[test]
    fn decode_strips_json_fences() {
        let fenced = "```json\n[{\"file\":\"a.py\",\"line\":5,\"suggestion\":\"use a named constant\",\"type\":\"Good Code Practice\"}]\n```";
        let decoded = decode_comments(fenced).unwrap();
        assert_eq!(decoded.comments.len(), 1);
        let c = &decoded.comments[0];
        assert_eq!(c.file, "a.py");
        assert_eq!(c.line, Some(5));
        assert_eq!(c.suggestion, "use a named constant");
        assert_eq!(c.category, Category::GoodCodePractice);
    }

    #[test]
    fn decode_strips_bare_fences_and_whitespace() {
        let fenced = "  \n```\n[]\n```  \n";
        let decoded = decode_comments(fenced).unwrap();
        assert!(decoded.comments.is_empty());
        assert!(decoded.rejected.is_empty());
    }

    #[test]
    fn decode_roundtrips_serialized_comments() {
        let original = vec![
            Comment {
                file: "src/auth.rs".into(),
                line: Some(42),
                suggestion: "check the token expiry".into(),
                category: Category::Security,
            },
            Comment {
                file: "src/db.rs".into(),
                line: None,
                suggestion: "parameterize the query".into(),
                category: Category::Other("Performance".into()),
            },
        ];
        let serialized = serde_json::to_string(&original).unwrap();
        let fenced = format!("  ```json\n{serialized}\n```  ");
        let decoded = decode_comments(&fenced).unwrap();
        assert_eq!(decoded.comments, original);
        assert!(decoded.rejected.is_empty());
    }

    #[test]
    fn decode_garbage_is_a_hard_error_with_raw_text() {
        let err = decode_comments("this is not json at all").unwrap_err();
        match err {
            NitpickError::Decode { raw, .. } => {
                assert_eq!(raw, "this is not json at all");
            }
            other => panic!("expected Decode error, got {other}"),
        }
    }

    #[test]
    fn decode_never_coerces_failure_to_empty() {
        // Regression guard: a malformed reply must error, not decode to [].
        assert!(decode_comments("{ truncated").is_err());
        assert!(decode_comments("").is_err());
    }

    #[test]
    fn decode_non_array_is_shape_error() {
        let err = decode_comments(r#"{"file":"a.py"}"#).unwrap_err();
        match err {
            NitpickError::Shape(observed) => assert_eq!(observed, "object"),
            other => panic!("expected Shape error, got {other}"),
        }

        let err = decode_comments("\"just a string\"").unwrap_err();
        assert!(matches!(err, NitpickError::Shape(_)));
    }

    #[test]
    fn decode_rejects_nonconforming_records_individually() {
        let json = r#"[
            {"file": "a.py", "line": 1, "suggestion": "good", "type": "Logic"},
            {"file": "", "line": 2, "suggestion": "empty file", "type": "Logic"},
            {"file": "c.py", "line": 3, "type": "Logic"},
            {"file": "d.py", "line": 4, "suggestion": "missing type"},
            "not an object"
        ]"#;
        let decoded = decode_comments(json).unwrap();
        assert_eq!(decoded.comments.len(), 1);
        assert_eq!(decoded.comments[0].file, "a.py");
        assert_eq!(decoded.rejected.len(), 4);
        assert_eq!(decoded.rejected[0].index, 1);
        assert!(decoded.rejected[1].reason.contains("suggestion"));
    }

    #[test]
    fn decode_degrades_invalid_line_to_none() {
        let json = r#"[
            {"file": "a.py", "line": 0, "suggestion": "zero line", "type": "Logic"},
            {"file": "b.py", "line": "seven", "suggestion": "string line", "type": "Logic"},
            {"file": "c.py", "suggestion": "no line", "type": "Logic"}
        ]"#;
        let decoded = decode_comments(json).unwrap();
        assert_eq!(decoded.comments.len(), 3);
        assert!(decoded.comments.iter().all(|c| c.line.is_none()));
    }

    #[test]
    fn decode_preserves_unknown_category() {
        let json = r#"[{"file":"a.py","line":1,"suggestion":"x","type":"Style"}]"#;
        let decoded = decode_comments(json).unwrap();
        assert_eq!(
            decoded.comments[0].category,
            Category::Other("Style".into())
        );
    }
}
