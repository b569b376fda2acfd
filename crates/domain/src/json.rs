//! Helpers for pulling JSON out of model replies

/// Extract JSON from a model reply, stripping markdown code fences
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let content = trimmed[start + 3..start + 3 + end].trim();
            // Skip language identifier if present
            if let Some(newline) = content.find('\n') {
                let first_line = &content[..newline];
                if !first_line.starts_with('{') && !first_line.starts_with('[') {
                    return content[newline + 1..].trim();
                }
            }
            return content;
        }
    }

    // Prose around a bare object
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
            if start < end {
                return &trimmed[start..=end];
            }
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_raw() {
        let input = r#"{"title": "A", "focus": "B"}"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn test_extract_json_code_block() {
        let input = r#"```json
{"title": "A"}
```"#;
        assert_eq!(extract_json(input), r#"{"title": "A"}"#);
    }

    #[test]
    fn test_extract_json_unlabelled_fence() {
        let input = "```\n{\"title\": \"A\"}\n```";
        assert_eq!(extract_json(input), r#"{"title": "A"}"#);

        let labelled = "```javascript\n{\"title\": \"A\"}\n```";
        assert_eq!(extract_json(labelled), r#"{"title": "A"}"#);
    }

    #[test]
    fn test_extract_json_surrounded_by_prose() {
        let input = r#"Sure! Here it is: {"title": "A"} Hope that helps."#;
        assert_eq!(extract_json(input), r#"{"title": "A"}"#);
    }
}
