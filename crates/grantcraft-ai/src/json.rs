//! Pulling a JSON object out of free-form model output.

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;

use crate::llm_provider::LLMResult;

/// Strips markdown code fences, takes the first balanced `{...}` object and
/// parses it. Braces inside string literals are ignored while balancing.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> LLMResult<T> {
    let object = first_object(strip_fences(text))
        .ok_or_else(|| anyhow!("no JSON object found in model output"))?;
    serde_json::from_str(object).context("model output is not valid JSON for the expected shape")
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.rsplit_once("```").map(|(b, _)| b).unwrap_or(body).trim()
}

fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
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
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Score {
        score: u8,
    }

    #[test]
    fn parses_plain_object() {
        let parsed: Score = extract_json(r#"{"score": 4}"#).unwrap();
        assert_eq!(parsed, Score { score: 4 });
    }

    #[test]
    fn strips_fences_and_prose() {
        let raw = "```json\n{\"score\": 2}\n```";
        assert_eq!(extract_json::<Score>(raw).unwrap().score, 2);

        let chatty = "Here is my review:\n{\"score\": 6, \"note\": \"a } in text\"} Thanks!";
        assert_eq!(extract_json::<Score>(chatty).unwrap().score, 6);
    }

    #[test]
    fn takes_first_object_only() {
        let raw = r#"{"score": 1} {"score": 9}"#;
        assert_eq!(extract_json::<Score>(raw).unwrap().score, 1);
    }

    #[test]
    fn rejects_missing_or_unbalanced() {
        assert!(extract_json::<Score>("no json here").is_err());
        assert!(extract_json::<Score>("{\"score\": 3").is_err());
    }
}
