//! Content escaping.
//!
//! User-authored text is persisted with `<` escaped to `&lt;`, which is
//! enough to stop tag injection in the rendering frontend. This is
//! deliberately not a full HTML sanitizer: `>` and quotes pass through,
//! matching what the frontend expects to receive.

use serde_json::Value;

/// Escape `<` only.
#[must_use]
pub fn escape_lt(raw: &str) -> String {
    raw.replace('<', "&lt;")
}

/// Apply a transform to every string leaf of a JSON value, recursing
/// through objects and arrays. Non-string leaves are untouched.
pub fn map_strings<F>(value: &mut Value, transform: &F)
where
    F: Fn(&str) -> String,
{
    match value {
        Value::String(s) => *s = transform(s),
        Value::Array(items) => {
            for item in items {
                map_strings(item, transform);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                map_strings(item, transform);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escapes_only_left_angle_bracket() {
        assert_eq!(escape_lt("<b>hi</b>"), "&lt;b>hi&lt;/b>");
        assert_eq!(escape_lt("no markup"), "no markup");
        assert_eq!(escape_lt("a > b"), "a > b");
    }

    #[test]
    fn test_map_strings_recurses_through_nested_content() {
        let mut content = json!({
            "intro": "<script>",
            "sections": [ { "body": "1 < 2" }, "plain" ],
            "count": 3
        });
        map_strings(&mut content, &escape_lt);
        assert_eq!(
            content,
            json!({
                "intro": "&lt;script>",
                "sections": [ { "body": "1 &lt; 2" }, "plain" ],
                "count": 3
            })
        );
    }
}
