use serde::{Deserialize, Serialize};

/// Prefix put in front of the reply text when a generated source is rejected.
pub const INVALID_SOURCE_APOLOGY: &str =
    "I understand your request but couldn't generate valid React-PDF code. ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub reason: Option<String>,
}

impl ValidationResult {
    fn pass() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    fn fail(reason: &str) -> Self {
        Self {
            ok: false,
            reason: Some(reason.to_string()),
        }
    }
}

/// Cheap structural screen run before a generated source is trusted.
///
/// PASS requires all of:
/// - an `import React` reference
/// - an opening `<Document` tag (bare `>` or with attributes)
/// - a closing `</Document>` tag
///
/// Never compiles anything. A source that passes can still fail to compile.
pub fn validate(source: &str) -> ValidationResult {
    if !source.contains("import React") {
        return ValidationResult::fail("missing `import React`");
    }
    if !has_document_open(source) {
        return ValidationResult::fail("missing opening <Document> tag");
    }
    if !source.contains("</Document>") {
        return ValidationResult::fail("missing closing </Document> tag");
    }
    ValidationResult::pass()
}

fn has_document_open(source: &str) -> bool {
    source.match_indices("<Document").any(|(idx, marker)| {
        source[idx + marker.len()..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::templates::{DEFAULT_TEMPLATE, RESUME_TEMPLATE};

    #[test]
    fn test_builtin_templates_pass() {
        assert!(validate(DEFAULT_TEMPLATE).ok);
        assert!(validate(RESUME_TEMPLATE).ok);
    }

    #[test]
    fn test_missing_closing_document_fails() {
        let source = DEFAULT_TEMPLATE.replace("</Document>", "");
        let result = validate(&source);
        assert!(!result.ok);
        assert!(result.reason.unwrap().contains("</Document>"));
    }

    #[test]
    fn test_missing_react_import_fails() {
        let result = validate("<Document></Document>");
        assert!(!result.ok);
    }

    #[test]
    fn test_document_with_attributes_passes() {
        let source = "import React from 'react';\n<Document title=\"CV\">\n</Document>";
        assert!(validate(source).ok);
    }

    #[test]
    fn test_document_prefix_of_other_name_is_not_an_opening_tag() {
        let source = "import React from 'react';\n<DocumentWrapper></DocumentWrapper></Document>";
        assert!(!validate(source).ok);
    }
}
