//! Deep walks over `serde_json::Value` trees

use serde_json::Value;
use std::collections::HashMap;

/// Remove every object key equal to `key`, at any depth.
///
/// Returns the number of keys removed.
pub fn strip_key(value: &mut Value, key: &str) -> usize {
    match value {
        Value::Object(map) => {
            let mut removed = usize::from(map.remove(key).is_some());
            for child in map.values_mut() {
                removed += strip_key(child, key);
            }
            removed
        }
        Value::Array(items) => items.iter_mut().map(|item| strip_key(item, key)).sum(),
        _ => 0,
    }
}

/// Replace string values that exactly equal a key of `mapping`.
///
/// Object keys are left untouched and substrings never match. Returns the
/// number of values replaced.
pub fn replace_strings(value: &mut Value, mapping: &HashMap<String, String>) -> usize {
    match value {
        Value::String(s) => match mapping.get(s.as_str()) {
            Some(new) => {
                *s = new.clone();
                1
            }
            None => 0,
        },
        Value::Object(map) => map
            .values_mut()
            .map(|child| replace_strings(child, mapping))
            .sum(),
        Value::Array(items) => items
            .iter_mut()
            .map(|item| replace_strings(item, mapping))
            .sum(),
        _ => 0,
    }
}

/// Apply [`replace_strings`] to a JSON document stored as text.
///
/// Text that is not valid JSON is left as is. The text is only re-serialized
/// when at least one value changed.
pub fn replace_strings_in_text(text: &mut String, mapping: &HashMap<String, String>) -> usize {
    if mapping.is_empty() {
        return 0;
    }
    let Ok(mut parsed) = serde_json::from_str::<Value>(text) else {
        return 0;
    };
    let replaced = replace_strings(&mut parsed, mapping);
    if replaced > 0 {
        *text = parsed.to_string();
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_key_nested() {
        let mut value = json!({
            "FLOWISE_CREDENTIAL_ID": "abc",
            "inputs": {"FLOWISE_CREDENTIAL_ID": "def", "model": "gpt"},
            "list": [{"FLOWISE_CREDENTIAL_ID": 1}, {"keep": true}]
        });
        assert_eq!(strip_key(&mut value, "FLOWISE_CREDENTIAL_ID"), 3);
        assert_eq!(
            value,
            json!({"inputs": {"model": "gpt"}, "list": [{}, {"keep": true}]})
        );
    }

    #[test]
    fn test_replace_strings_exact_match_only() {
        let mapping = HashMap::from([("abc".to_string(), "xyz".to_string())]);
        let mut value = json!({"id": "abc", "name": "abcdef", "abc": 1, "refs": ["abc"]});
        assert_eq!(replace_strings(&mut value, &mapping), 2);
        assert_eq!(value, json!({"id": "xyz", "name": "abcdef", "abc": 1, "refs": ["xyz"]}));
    }

    #[test]
    fn test_replace_strings_in_text_ignores_invalid_json() {
        let mapping = HashMap::from([("abc".to_string(), "xyz".to_string())]);
        let mut text = "not json abc".to_string();
        assert_eq!(replace_strings_in_text(&mut text, &mapping), 0);
        assert_eq!(text, "not json abc");

        let mut text = r#"{"nodes":[{"storeId":"abc"}]}"#.to_string();
        assert_eq!(replace_strings_in_text(&mut text, &mapping), 1);
        assert_eq!(text, r#"{"nodes":[{"storeId":"xyz"}]}"#);
    }
}
