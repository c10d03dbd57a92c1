//! Structured Feedback Module
//!
//! Renders the single fatal diagnostic of a compilation either for humans
//! or as JSON (`--error-format json`).

use serde::{Deserialize, Serialize};

use crate::utils::Error;

// ==================== Structured Error Report ====================

/// A structured error report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code (e.g., "E0001")
    pub code: String,

    /// Error severity
    pub severity: Severity,

    /// Human-readable message, without declaration context
    pub message: String,

    /// Prototype of the declaration being compiled, if known
    pub declaration: Option<String>,

    /// Location information
    pub location: Option<Location>,

    /// Suggested fixes
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

// ==================== Error Conversion ====================

impl ErrorReport {
    /// Create an error report from a compiler error. `source` is the text
    /// of the file the error's span points into, when it is known.
    pub fn from_error(error: &Error, file_name: &str, source: Option<&str>) -> Self {
        let declaration = match error {
            Error::InDeclaration { decl, .. } => Some(decl.clone()),
            _ => None,
        };
        let root = error.root();
        let (code, suggestions) = generate_error_info(root);

        let location = error.span().map(|span| {
            let (line, column) = source.map(|s| span.line_col(s)).unwrap_or((0, 0));
            Location {
                file: file_name.to_string(),
                line,
                column,
            }
        });

        Self {
            code: code.to_string(),
            severity: Severity::Error,
            message: root.to_string(),
            declaration,
            location,
            suggestions,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    /// `file:line:col: error[E0001]: message`, plus context lines
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        if let Some(loc) = &self.location {
            out.push_str(&format!("{}:{}:{}: ", loc.file, loc.line, loc.column));
        }
        out.push_str(&format!("error[{}]: {}", self.code, self.message));
        if let Some(decl) = &self.declaration {
            out.push_str(&format!("\n  in {}", decl));
        }
        for suggestion in &self.suggestions {
            out.push_str(&format!("\n  help: {}", suggestion));
        }
        out
    }
}

/// Error code and suggestions for an error
fn generate_error_info(error: &Error) -> (&'static str, Vec<String>) {
    match error {
        // ========== Syntax Errors ==========
        Error::UnexpectedToken { expected, .. } => ("E0001", vec![format!("Insert {} here", expected)]),
        Error::UnexpectedChar { ch, .. } => ("E0002", vec![format!("Remove '{}'", ch)]),
        Error::UnterminatedString { .. } => ("E0003", vec!["Close the string with '\"' on the same line".into()]),
        Error::ExpectedIdent { .. } => ("E0004", vec![]),
        Error::ExpectedType { .. } => ("E0005", vec![]),
        Error::ExpectedExpr { .. } => ("E0006", vec![]),

        // ========== Resolution Errors ==========
        Error::UnresolvedCall { prototype } => (
            "E0101",
            vec![format!("Declare a function or field matching {}", prototype)],
        ),
        Error::AmbiguousOverload { candidates, .. } => (
            "E0102",
            candidates
                .iter()
                .map(|c| format!("Candidate: {}", c))
                .chain(std::iter::once("Give the argument a value of exactly one candidate's type".to_string()))
                .collect(),
        ),
        Error::DuplicatePrototype { .. } => ("E0103", vec!["Rename one declaration or change its labels".into()]),
        Error::NameCollision { first, .. } => ("E0104", vec![format!("Rename {}", first)]),

        // ========== Module Errors ==========
        Error::ModuleNotFound { path, .. } => ("E0201", vec![format!("Create {} or pass --lib-root", path)]),
        Error::CircularImport { .. } => ("E0202", vec![]),
        Error::Io(_) => ("E0301", vec![]),

        Error::InDeclaration { source, .. } => generate_error_info(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Span;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_error_location() {
        let source = "func main() {\n  x = $\n}";
        let error = Error::UnexpectedChar {
            ch: '$',
            span: Span::new(20, 21, 1),
        };
        let report = ErrorReport::from_error(&error, "main.koi", Some(source));
        assert_eq!(report.code, "E0002");
        assert_eq!(
            report.location,
            Some(Location {
                file: "main.koi".into(),
                line: 2,
                column: 7,
            })
        );
        assert_eq!(report.render_human(), "main.koi:2:7: error[E0002]: Unexpected character '$'\n  help: Remove '$'");
    }

    #[test]
    fn test_declaration_context() {
        let error = Error::AmbiguousOverload {
            prototype: "foo(x:int)".into(),
            candidates: vec!["foo(x:any)".into(), "foo(x:(int | string))".into()],
        }
        .in_declaration("main()");
        let report = ErrorReport::from_error(&error, "main.koi", None);
        assert_eq!(report.code, "E0102");
        assert_eq!(report.declaration.as_deref(), Some("main()"));
        assert!(report.location.is_none());
        assert_eq!(report.suggestions.len(), 3);
        assert!(report.message.starts_with("Ambiguous overload for foo(x:int)"));
    }

    #[test]
    fn test_json_round_trip() {
        let error = Error::UnresolvedCall {
            prototype: "nothing(x:)".into(),
        };
        let report = ErrorReport::from_error(&error, "main.koi", None);
        let json = report.to_json();
        assert!(json.contains("\"severity\": \"error\""));
        let parsed: ErrorReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
