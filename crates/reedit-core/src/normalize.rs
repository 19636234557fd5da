//! Normalization of free-form model output into a [`ModelResponse`].
//!
//! Vision models are told to answer with bare JSON but regularly wrap it in
//! a Markdown code fence. Parsing failures are not errors: the caller keeps
//! the raw text and moves on.

use serde_json::Value as JsonValue;

use crate::response::ModelResponse;

const FENCE: &str = "```";
const JSON_TAG: &str = "json";

/// Remove surrounding whitespace and a Markdown code fence, if any.
///
/// When the trimmed text starts with three backticks, all leading and
/// trailing backticks are removed, then a leading `json` language tag and
/// exactly one newline after it.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    if !text.starts_with(FENCE) {
        return text;
    }

    let inner = text.trim_matches('`');
    match inner.strip_prefix(JSON_TAG) {
        Some(rest) => rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest),
        None => inner,
    }
}

/// Normalize a model answer.
///
/// Returns `Structured` when the (unfenced) text parses as a JSON object,
/// otherwise `Raw` holding the exact text the model returned.
pub fn normalize_response(raw: &str) -> ModelResponse {
    match serde_json::from_str::<JsonValue>(strip_code_fence(raw)) {
        Ok(value @ JsonValue::Object(_)) => ModelResponse::from_json(value),
        Ok(_) | Err(_) => ModelResponse::Raw(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_plain_text_is_trimmed() {
        assert_eq!(strip_code_fence("  {\"1\":\"a\"}\n"), "{\"1\":\"a\"}");
    }

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(
            strip_code_fence("```json\n{\"1\":\"a\"}\n```"),
            "{\"1\":\"a\"}\n"
        );
    }

    #[test]
    fn test_strip_fence_without_tag() {
        assert_eq!(strip_code_fence("```\n{\"1\":\"a\"}\n```"), "\n{\"1\":\"a\"}\n");
    }

    #[test]
    fn test_strip_json_tag_removes_exactly_one_newline() {
        assert_eq!(strip_code_fence("```json\n\n{}```"), "\n{}");
    }

    #[test]
    fn test_strip_crlf_after_tag() {
        assert_eq!(strip_code_fence("```json\r\n{}\r\n```"), "{}\r\n");
    }

    #[test]
    fn test_normalize_fenced_json() {
        let response = normalize_response("```json\n{\"1\":\"a\"}\n```");
        assert_eq!(response, ModelResponse::structured([("1", "a")]));
    }

    #[test]
    fn test_normalize_unfenced_json() {
        let response = normalize_response(
            r#"{"1": "1: There is a difference at color, the car is red.", "2": "2: There is a difference at shape, the roof is flat."}"#,
        );
        assert_eq!(
            response.get("2"),
            Some("2: There is a difference at shape, the roof is flat.")
        );
    }

    #[test]
    fn test_normalize_non_json_keeps_exact_text() {
        assert_eq!(
            normalize_response("oops"),
            ModelResponse::Raw("oops".to_string())
        );
        let text = "  Sure! Here are the edits:\n1. Make the sky blue  ";
        assert_eq!(normalize_response(text), ModelResponse::Raw(text.to_string()));
    }

    #[test]
    fn test_normalize_broken_fenced_json_keeps_fence() {
        let text = "```json\n{\"1\": \"a\"\n```";
        assert_eq!(normalize_response(text), ModelResponse::Raw(text.to_string()));
    }

    #[test]
    fn test_normalize_json_array_is_raw() {
        assert_eq!(
            normalize_response("[\"a\", \"b\"]"),
            ModelResponse::Raw("[\"a\", \"b\"]".to_string())
        );
    }

    #[test]
    fn test_normalize_round_trips_structured() {
        let original = ModelResponse::structured([
            ("CoT_1", "The sky is blue as instructed."),
            ("Re_Edit_1", "Soften the cloud edges."),
        ]);
        let serialized = serde_json::to_string(&original).unwrap();

        assert_eq!(normalize_response(&serialized), original);
        assert_eq!(
            normalize_response(&format!("```json\n{}\n```", serialized)),
            original
        );
        assert_eq!(
            normalize_response(&format!("```\n{}\n```", serialized)),
            original
        );
    }
}
