//! Pull a JSON object out of free-form model output.
//!
//! Models wrap their answer in prose or markdown fences. The contract here is
//! narrow: find the first top-level balanced `{...}` block, else fail.

use crate::error::{ReelcutError, Result};
use serde::de::DeserializeOwned;

/// Return the first top-level balanced `{...}` block in `text`.
///
/// Braces inside JSON string literals are ignored, including escaped quotes.
pub fn extract_json_object(text: &str) -> Result<&str> {
    let start = text
        .find('{')
        .ok_or_else(|| ReelcutError::MalformedOutput("no JSON object in output".to_string()))?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    Err(ReelcutError::MalformedOutput(
        "unbalanced braces in output".to_string(),
    ))
}

/// Extract the first JSON object and decode it into `T`.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    let block = extract_json_object(text)?;
    serde_json::from_str(block).map_err(|e| ReelcutError::MalformedOutput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Span {
        start: f64,
        end: f64,
    }

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_json_object(r#"{"a":1}"#).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_fenced_with_prose() {
        let text = "Sure! Here you go:\n```json\n{\"start\": 12, \"end\": 72}\n```\nHope that helps {:";
        let span: Span = parse_json_object(text).unwrap();
        assert_eq!(span.start, 12.0);
        assert_eq!(span.end, 72.0);
    }

    #[test]
    fn test_nested_object_is_kept_whole() {
        let text = r#"x {"outer": {"inner": 1}, "b": 2} y {"second": 3}"#;
        assert_eq!(
            extract_json_object(text).unwrap(),
            r#"{"outer": {"inner": 1}, "b": 2}"#
        );
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"reason": "he said \"}{\" twice", "n": 1}"#;
        assert_eq!(extract_json_object(text).unwrap(), text);
    }

    #[test]
    fn test_no_object() {
        assert!(matches!(
            extract_json_object("nothing here"),
            Err(ReelcutError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_unbalanced() {
        assert!(extract_json_object(r#"{"start": 1, "end": "#).is_err());
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let result: Result<Span> = parse_json_object(r#"{"start": 5}"#);
        assert!(matches!(result, Err(ReelcutError::MalformedOutput(_))));
    }
}
