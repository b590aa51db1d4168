//! Compilation errors.
//!
//! Every failure in the pipeline is a `CompileError` carrying a message and
//! the source location it was raised at. Nothing is recovered locally; the
//! parser and the lowering pass return at the first error and the driver is
//! the only component that formats and displays it.

use crate::stream::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lexical or syntactic failure.
    Parsing,
    /// Structural failure during lowering, e.g. an unknown identifier.
    Compile,
    /// Failure propagated from the linker collaborator.
    Backend,
    /// A broken compiler invariant, distinct from source errors.
    Internal,
}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Location,
}

pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    pub fn parsing(location: Location, message: impl Into<String>) -> Self {
        CompileError { kind: ErrorKind::Parsing, message: message.into(), location }
    }

    pub fn compile(location: Location, message: impl Into<String>) -> Self {
        CompileError { kind: ErrorKind::Compile, message: message.into(), location }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        CompileError {
            kind: ErrorKind::Backend,
            message: message.into(),
            location: Location::default(),
        }
    }

    pub fn internal(location: Location, message: impl Into<String>) -> Self {
        CompileError { kind: ErrorKind::Internal, message: message.into(), location }
    }

    /// Render the error with the offending source line and a caret underline:
    ///
    /// ```text
    /// 3:9: error: Unknown token
    ///     let x = $5
    ///             ^
    /// ```
    pub fn display_with_source(&self, source: &str) -> String {
        let line = source.lines().nth(self.location.line.saturating_sub(1)).unwrap_or("");
        let caret_column = self.location.column.saturating_sub(1);
        format!("{}\n    {}\n    {}^", self, line, " ".repeat(caret_column))
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: error: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_line_column_format() {
        let error = CompileError::parsing(
            Location { line: 3, column: 9, offset: 24 },
            "Unknown token",
        );
        assert_eq!(error.to_string(), "3:9: error: Unknown token");
    }

    #[test]
    fn display_with_source_underlines_offending_line() {
        let source = "let a = 1\nlet b = $2\n";
        let error = CompileError::parsing(
            Location { line: 2, column: 9, offset: 18 },
            "Unknown token",
        );
        let rendered = error.display_with_source(source);
        assert!(rendered.contains("let b = $2"), "{}", rendered);
        assert!(rendered.ends_with("        ^"), "{}", rendered);
    }
}
