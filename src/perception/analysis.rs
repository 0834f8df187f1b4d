use serde::Deserialize;

use crate::error::PerceptionError;

/// Mood classification returned by the inference endpoint. Drives which
/// animation is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Idle,
    Engage,
}

impl Action {
    /// Strict validation against the fixed enumeration. The wrapper never
    /// validates `action` itself, so unknown values surface here as `None`
    /// and the consumer treats them as a no-op.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "idle" => Some(Action::Idle),
            "engage" => Some(Action::Engage),
            _ => None,
        }
    }
}

/// The structured judgement produced by one analysis cycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisResult {
    pub comment: String,
    pub action: String,
}

impl AnalysisResult {
    /// Substituted whenever the inference call cannot produce a valid
    /// structured response.
    pub fn fallback() -> Self {
        Self {
            comment: "Watching closely! 👀".to_string(),
            action: "idle".to_string(),
        }
    }
}

/// Parses the model's free-form text as a JSON object with `comment` and
/// `action`. Models occasionally wrap the object in prose or code fences,
/// so parsing starts at the outermost braces.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, PerceptionError> {
    let start = text
        .find('{')
        .ok_or_else(|| PerceptionError::Malformed("no JSON object in response".to_string()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| PerceptionError::Malformed("unterminated JSON object".to_string()))?;
    if end < start {
        return Err(PerceptionError::Malformed(
            "unterminated JSON object".to_string(),
        ));
    }
    serde_json::from_str(&text[start..=end])
        .map_err(|e| PerceptionError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_object() {
        let result = parse_analysis(r#"{"comment": "Ready to respawn!", "action": "engage"}"#)
            .expect("parse");
        assert_eq!(result.comment, "Ready to respawn!");
        assert_eq!(Action::parse(&result.action), Some(Action::Engage));
    }

    #[test]
    fn parses_object_wrapped_in_code_fence() {
        let text = "```json\n{\"comment\": \"Nice desktop!\", \"action\": \"idle\"}\n```";
        let result = parse_analysis(text).expect("parse");
        assert_eq!(result.comment, "Nice desktop!");
        assert_eq!(result.action, "idle");
    }

    #[test]
    fn missing_key_is_malformed() {
        let err = parse_analysis(r#"{"comment": "hi"}"#).unwrap_err();
        assert!(matches!(err, PerceptionError::Malformed(_)));
    }

    #[test]
    fn non_json_text_is_malformed() {
        assert!(parse_analysis("the screen looks busy").is_err());
    }

    #[test]
    fn action_parse_rejects_unknown_values() {
        assert_eq!(Action::parse("idle"), Some(Action::Idle));
        assert_eq!(Action::parse(" engage "), Some(Action::Engage));
        assert_eq!(Action::parse("sleep"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn fallback_is_well_formed() {
        let fallback = AnalysisResult::fallback();
        assert!(!fallback.comment.is_empty());
        assert!(Action::parse(&fallback.action).is_some());
    }
}
