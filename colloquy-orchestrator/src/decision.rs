//! Structured-decision extraction from coordinator/router responses.
//!
//! The constrained-output channel on the model capability is preferred when
//! the provider populated it; brace scanning over the free text is the
//! last-resort fallback. Parse failure is "no decision", never an error.

use colloquy_core::message::AgentMessage;

/// Extract a structured decision from an agent's response.
pub fn extract(message: &AgentMessage) -> Option<serde_json::Value> {
    if let Some(structured) = &message.metadata.structured {
        if structured.is_object() {
            return Some(structured.clone());
        }
    }
    first_json_object(&message.content)
}

/// Find the first brace-delimited substring that parses as a JSON object.
/// The scan is string- and escape-aware, so braces inside string literals
/// do not terminate a candidate early; across multiple brace groups the
/// first *valid* object deterministically wins.
pub fn first_json_object(text: &str) -> Option<serde_json::Value> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(open) = text[start..].find('{').map(|i| start + i) {
        if let Some(end) = matching_close(bytes, open) {
            if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes[open..=end]) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
        start = open + 1;
    }

    None
}

/// Index of the `}` closing the `{` at `open`, tracking string literals and
/// escapes. `None` when the group never balances.
fn matching_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[open..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_an_object_buried_in_prose() {
        let text = "Sure, here is my plan:\n{\"agents\": [\"coder\"], \"mode\": \"single\"}\nLet me know.";
        let value = first_json_object(text).unwrap();
        assert_eq!(value["mode"], "single");
    }

    #[test]
    fn braces_inside_strings_do_not_split_the_object() {
        let text = r#"{"task": "render {name} with \"quotes\""}"#;
        let value = first_json_object(text).unwrap();
        assert_eq!(value["task"], "render {name} with \"quotes\"");
    }

    #[test]
    fn first_valid_object_wins_across_multiple_groups() {
        let text = "set {x} then {not json either} and finally {\"winner\": true} plus {\"later\": 1}";
        let value = first_json_object(text).unwrap();
        assert_eq!(value["winner"], true);
        assert!(value.get("later").is_none());
    }

    #[test]
    fn plain_prose_is_no_decision() {
        assert!(first_json_object("I delegated nothing today.").is_none());
        assert!(first_json_object("unbalanced { here").is_none());
    }

    #[test]
    fn structured_channel_is_preferred_over_text() {
        let mut message = AgentMessage::user("{\"from_text\": true}");
        message.metadata.structured = Some(serde_json::json!({"from_channel": true}));
        let value = extract(&message).unwrap();
        assert!(value.get("from_channel").is_some());
    }

    #[test]
    fn non_object_structured_payload_falls_back_to_text() {
        let mut message = AgentMessage::user("{\"from_text\": true}");
        message.metadata.structured = Some(serde_json::json!([1, 2, 3]));
        let value = extract(&message).unwrap();
        assert!(value.get("from_text").is_some());
    }
}
