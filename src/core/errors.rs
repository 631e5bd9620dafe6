//! BREX's closed error taxonomy and rich diagnostic rendering.
//!
//! Errors are never thrown mid-parse or mid-compile: the parser and compiler
//! accumulate them into a `Vec` alongside a best-effort product, and callers inspect the list. This
//! module only defines the error *shapes*; the accumulation happens in
//! `parser.rs` / `resolver.rs` / `compiler.rs`.

use std::fmt;

use thiserror::Error;

use crate::core::hint_engine::get_hint;

/// Codec-layer failures (UTF-8 decode, escape resolution, literal validation).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated UTF-8 sequence at offset {offset}")]
    InvalidUtf8Truncated { offset: usize },

    #[error("mis-encoded UTF-8 sequence at offset {offset}")]
    InvalidUtf8MisEncoded { offset: usize },

    #[error("non-printable character 0x{code:x}")]
    NonPrintableChar { code: u32 },

    #[error("unterminated escape sequence")]
    UnterminatedEscape,

    #[error("unknown escape name '%{name};'")]
    UnknownEscapeName { name: String },

    #[error("malformed hex escape '%x{text};'")]
    BadHexEscape { text: String },

    #[error("hex escape value 0x{value:x} is out of range for this domain")]
    HexEscapeOutOfRange { value: u32 },
}

/// Parse-layer failure kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("expected delimiter '{expected}'")]
    ExpectedDelimiter { expected: char },

    #[error("unterminated literal")]
    UnterminatedLiteral,

    #[error("literal or range does not match the regex's domain")]
    MixedDomain,

    #[error("malformed character range")]
    MalformedCharRange,

    #[error("repeat bound is out of range or malformed")]
    BadRepeatBound,

    #[error("regex body is empty")]
    EmptyRegex,

    #[error("unexpected trailing input")]
    TrailingInput,

    #[error("mismatched anchor angle brackets")]
    MismatchedAnchors,

    #[error("environment references are not allowed here")]
    EnvNotAllowed,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Compile-layer (resolver + compiler) failure kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("named regex '{name}' is not defined")]
    UndefinedName { name: String },

    #[error("named regex '{name}' is involved in a recursive resolution")]
    RecursiveName { name: String },

    #[error("unsupported regex operator in this context")]
    UnsupportedOp,
}

/// Execute-layer (matcher) failures: the request was ill-formed given the
/// regex's kind/anchor shape, distinct from an ordinary "no match".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecuteError {
    #[error("regex structure does not support this operation")]
    InvalidRegexStructure,

    #[error("regex cannot be used with `contains` (negated or anchored top-level entry)")]
    NotContainsable,

    #[error("regex cannot be used with this match operation")]
    NotMatchable,
}

/// A single parse diagnostic with enough context to render a caret pointer:
/// a typed kind, the byte position, the original source text, and an
/// optional instructional hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub pos: usize,
    pub text: String,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, pos: usize, text: &str) -> Self {
        let hint = get_hint(&kind, text, pos);
        ParseError {
            kind,
            pos,
            text: text.to_string(),
            hint,
        }
    }

    fn line_col(&self) -> (usize, &str, usize) {
        let lines: Vec<&str> = self.text.lines().collect();
        let mut current_pos = 0;
        for (i, line) in lines.iter().enumerate() {
            let line_len = line.len() + 1; // +1 for newline
            if current_pos + line_len > self.pos {
                return (i + 1, line, self.pos - current_pos);
            }
            current_pos += line_len;
        }

        match lines.last() {
            Some(last) => (lines.len(), last, last.len()),
            None => (1, "", self.pos),
        }
    }

    fn format_error(&self) -> String {
        if self.text.is_empty() {
            return format!("{} at position {}", self.kind, self.pos);
        }

        let (line_num, line_text, col) = self.line_col();

        let mut parts = vec![
            format!("BREX Parse Error: {}", self.kind),
            String::new(),
            format!("> {} | {}", line_num, line_text),
            format!(">   | {}^", " ".repeat(col)),
        ];

        if let Some(hint) = &self.hint {
            parts.push(String::new());
            parts.push(format!("Hint: {}", hint));
        }

        parts.join("\n")
    }

    pub fn to_formatted_string(&self) -> String {
        self.format_error()
    }

    /// LSP-style diagnostic payload so downstream tooling (an editor
    /// integration, an external resolver) can consume it directly without
    /// re-deriving line/column math. The editor integration itself remains
    /// out of scope here.
    pub fn to_lsp_diagnostic(&self) -> serde_json::Value {
        let (line_num, _line_text, col) = self.line_col();
        let line0 = line_num.saturating_sub(1);

        serde_json::json!({
            "range": {
                "start": {"line": line0, "character": col},
                "end": {"line": line0, "character": col + 1}
            },
            "severity": 1,
            "message": self.hint.as_ref().map(|h| format!("{}\n\nHint: {}", self.kind, h)).unwrap_or_else(|| self.kind.to_string()),
            "source": "brex",
        })
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_error())
    }
}

impl std::error::Error for ParseError {}
