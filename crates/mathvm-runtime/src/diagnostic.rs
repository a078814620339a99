//! Translation-error diagnostics
//!
//! Translation failures (lexing, parsing, bytecode generation) all flow
//! through the single [`TranslationError`] type: one message, one source
//! position, first error wins. Runtime failures live in [`crate::vm`].

use crate::span::Span;
use serde::Serialize;
use thiserror::Error;

/// A fatal translation error with the offending source position
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct TranslationError {
    /// Main diagnostic message
    pub message: String,
    /// Source location of the offending node
    pub span: Span,
}

impl TranslationError {
    /// Create a new translation error
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// Format as human-readable string
    ///
    /// ```text
    /// error: Operator is only applicable to numbers
    ///   --> program.mvm:4:11
    /// ```
    pub fn to_human_string(&self, file: &str, source: &str) -> String {
        let (line, column) = self.span.line_column(source);
        format!(
            "error: {}\n  --> {}:{}:{}\n",
            self.message, file, line, column
        )
    }

    /// Format as a compact JSON object with resolved line/column
    pub fn to_json_string(&self, source: &str) -> String {
        let (line, column) = self.span.line_column(source);
        serde_json::json!({
            "level": "error",
            "message": self.message,
            "line": line,
            "column": column,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_rendering() {
        let source = "int x;\nx = 'a';\n";
        let err = TranslationError::new("Wrong RHS type", Span::new(9, 10));
        let rendered = err.to_human_string("test.mvm", source);
        assert_eq!(rendered, "error: Wrong RHS type\n  --> test.mvm:2:3\n");
    }

    #[test]
    fn test_json_rendering() {
        let source = "print(1 + 'a');";
        let err = TranslationError::new("Operator is only applicable to numbers", Span::new(8, 9));
        let json: serde_json::Value =
            serde_json::from_str(&err.to_json_string(source)).unwrap();
        assert_eq!(json["line"], 1);
        assert_eq!(json["column"], 9);
        assert_eq!(json["level"], "error");
    }
}
