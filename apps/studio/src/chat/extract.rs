//! Splits a raw model reply into its prose and the embedded document source.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:react|javascript|jsx)[ \t]*\r?\n(.*?)```")
        .expect("Fenced source regex pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReply {
    pub preceding_message: String,
    pub source: Option<String>,
}

/// Finds the first fenced region tagged `react`, `javascript` or `jsx`.
/// Without one, the whole trimmed text is the message.
pub fn extract_source(raw: &str) -> ExtractedReply {
    match FENCED_SOURCE.captures(raw) {
        Some(caps) => {
            let start = caps.get(0).map_or(0, |m| m.start());
            ExtractedReply {
                preceding_message: raw[..start].trim().to_string(),
                source: caps.get(1).map(|m| m.as_str().trim().to_string()),
            }
        }
        None => ExtractedReply {
            preceding_message: raw.trim().to_string(),
            source: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_reply_splits_into_message_and_source() {
        let raw = "Here you go:\n```jsx\nimport React from 'react';\n<Document></Document>\n```\n";
        let reply = extract_source(raw);
        assert_eq!(reply.preceding_message, "Here you go:");
        assert_eq!(
            reply.source.as_deref(),
            Some("import React from 'react';\n<Document></Document>")
        );
    }

    #[test]
    fn test_unfenced_reply_is_all_message() {
        let reply = extract_source("  Sure, tell me about your last role.  \n");
        assert_eq!(reply.preceding_message, "Sure, tell me about your last role.");
        assert!(reply.source.is_none());
    }

    #[test]
    fn test_other_language_tags_are_ignored() {
        let reply = extract_source("Example:\n```python\nprint(1)\n```");
        assert!(reply.source.is_none());
        assert!(reply.preceding_message.contains("print(1)"));
    }

    #[test]
    fn test_first_matching_region_wins() {
        let raw = "A\n```react\nfirst\n```\nB\n```javascript\nsecond\n```";
        let reply = extract_source(raw);
        assert_eq!(reply.source.as_deref(), Some("first"));
        assert_eq!(reply.preceding_message, "A");
    }

    #[test]
    fn test_crlf_after_tag_is_accepted() {
        let reply = extract_source("x\r\n```javascript\r\ncode\r\n```");
        assert_eq!(reply.source.as_deref(), Some("code"));
    }
}
