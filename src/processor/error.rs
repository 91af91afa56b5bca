#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed literal, bad identifier start.
    Lexical,
    /// Unexpected token, empty rule body, unclosed block.
    Syntax,
    /// Reference to a rule that was never declared.
    Semantic,
    /// The parser asked a token for the wrong payload.
    Internal,
}

/// A problem found in a program, tied to its 1-based source line when
/// one is known.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}{message}", line_prefix(.line))]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
}

fn line_prefix(line: &Option<usize>) -> String {
    line.map(|l| format!("line {l}: ")).unwrap_or_default()
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }

    pub fn lexical(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::Lexical, message, Some(line))
    }

    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::Syntax, message, Some(line))
    }

    pub fn internal(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::Internal, message, Some(line))
    }

    pub fn undefined_rule(name: &str, line: Option<usize>) -> Self {
        Self::new(ErrorKind::Semantic, format!("Undefined rule: {name}"), line)
    }

    /// The line as a signed number, `-1` when unknown.
    pub fn line_number(&self) -> i64 {
        self.line.map_or(-1, |l| l as i64)
    }
}
