//! Post-processing of raw CLI output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Fenced code block, optionally tagged `json`.
static CODE_FENCE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)```")
        .map_err(|e| tracing::error!(error = %e, "invalid code fence pattern"))
        .ok()
});

/// Finds a JSON value in model output.
///
/// Tries the whole text, then the contents of each fenced code block, then
/// the outermost `[...]` or `{...}` span.
pub fn extract_json(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    if let Some(re) = CODE_FENCE.as_ref() {
        for caps in re.captures_iter(text) {
            if let Some(body) = caps.get(1)
                && let Ok(value) = serde_json::from_str(body.as_str().trim())
            {
                return Some(value);
            }
        }
    }

    [('[', ']'), ('{', '}')].into_iter().find_map(|(open, close)| {
        let start = text.find(open)?;
        let end = text.rfind(close)?;
        (end > start)
            .then(|| serde_json::from_str(&text[start..=end]).ok())
            .flatten()
    })
}

/// Formats search output as pretty JSON when possible, else trimmed text.
pub fn format_search_output(raw: &str) -> String {
    extract_json(raw)
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(extract_json(r#" [{"title":"a"}] "#), Some(json!([{"title": "a"}])));
    }

    #[test]
    fn test_fenced_json() {
        let text = "Here you go:\n```json\n[{\"url\":\"https://x\"}]\n```\nDone.";
        assert_eq!(extract_json(text), Some(json!([{"url": "https://x"}])));
    }

    #[test]
    fn test_untagged_fence() {
        let text = "```\n{\"ok\":true}\n```";
        assert_eq!(extract_json(text), Some(json!({"ok": true})));
    }

    #[test]
    fn test_embedded_array() {
        let text = "Results: [1, 2, 3] (3 total)";
        assert_eq!(extract_json(text), Some(json!([1, 2, 3])));
    }

    #[test]
    fn test_no_json() {
        assert_eq!(extract_json("no structured data here"), None);
        assert_eq!(format_search_output("  plain answer \n"), "plain answer");
    }

    #[test]
    fn test_format_pretty_prints() {
        let formatted = format_search_output("```json\n[{\"title\":\"t\"}]\n```");
        assert_eq!(formatted, "[\n  {\n    \"title\": \"t\"\n  }\n]");
    }
}
