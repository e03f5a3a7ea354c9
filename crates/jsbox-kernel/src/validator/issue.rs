//! Lint diagnostics and formatting.

use std::fmt;

use serde::{Serialize, Serializer};

/// Severity class of a lint code. Warnings are advisory and subject to the
/// `includewarnings` filter; errors always survive filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Categorizes lint diagnostics for filtering and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintCode {
    /// `let` or `const` declaration.
    Es6Declaration,
    /// Free variable not in the permitted globals list.
    UndefinedName,
    /// ES6-only syntax (arrow functions, template literals).
    Es6Syntax,
    /// A token the grammar cannot accept at that position.
    UnexpectedToken,
    /// Source the scanner cannot recover from.
    Unrecoverable,
}

impl LintCode {
    /// Short code string, jshint-compatible.
    pub fn code(&self) -> &'static str {
        match self {
            LintCode::Es6Declaration => "W104",
            LintCode::UndefinedName => "W117",
            LintCode::Es6Syntax => "W119",
            LintCode::UnexpectedToken => "E030",
            LintCode::Unrecoverable => "E041",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            LintCode::Es6Declaration | LintCode::UndefinedName | LintCode::Es6Syntax => {
                Severity::Warning
            }
            LintCode::UnexpectedToken | LintCode::Unrecoverable => Severity::Error,
        }
    }
}

impl fmt::Display for LintCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for LintCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// One diagnostic in a lint reply. `line` and `character` are 1-based.
#[derive(Debug, Clone, Serialize)]
pub struct LintIssue {
    pub code: LintCode,
    pub reason: String,
    pub line: usize,
    pub character: usize,
}

impl LintIssue {
    /// Build an issue at a byte offset into the source.
    pub fn at_offset(code: LintCode, reason: impl Into<String>, source: &str, offset: usize) -> Self {
        let (line, character) = line_col(source, offset);
        Self {
            code,
            reason: reason.into(),
            line,
            character,
        }
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}]: {}",
            self.line,
            self.character,
            self.code.default_severity(),
            self.code,
            self.reason
        )
    }
}

/// Convert a byte offset to a 1-based (line, column) pair.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
