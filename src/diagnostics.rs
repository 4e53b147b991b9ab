//! Compact, rustc-like diagnostics for interface description files.
//!
//! Every error raised while lexing, parsing or validating an interface
//! description carries the byte offset it refers to. This module turns
//! that offset back into a `file:line:column` header with a caret under
//! the offending column, printed to stderr, and converts the diagnostic
//! into an `anyhow::Error` so callers can propagate it with `?`.

use std::fmt;

/// An error tied to a byte offset in the input source.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub loc: usize,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, loc: usize) -> Self {
        Diagnostic {
            message: message.into(),
            loc,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Print an error for a byte offset within `source`, with a caret
/// pointing at the column. `loc` is a 0-based byte index into `source`.
/// If `file` is provided it is printed in the header.
pub fn report_error_span(file: Option<&str>, source: &str, loc: usize, message: &str) {
    // ANSI red for "error"
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    // Compute line/column from the byte offset
    let mut byte_idx = 0usize;
    let mut line_no = 1usize;
    let mut col = 0usize;
    let mut found = false;
    for (lineno, line) in source.lines().enumerate() {
        let line_len = line.len() + 1; // include newline
        if loc >= byte_idx && loc < byte_idx + line_len {
            line_no = lineno + 1;
            col = loc - byte_idx;
            found = true;
            break;
        }
        byte_idx += line_len;
    }
    if !found {
        line_no = source.lines().count().max(1);
        col = 0;
    }

    eprintln!("{}error{}: {}", red, reset, message);
    if let Some(path) = file {
        eprintln!("  --> {}:{}:{}", path, line_no, col + 1);
    }

    // Print the offending line with a caret under the column
    let lines: Vec<&str> = source.lines().collect();
    if !lines.is_empty() {
        let idx = line_no - 1;
        eprintln!("{:4} | {}", line_no, lines[idx.min(lines.len() - 1)]);
        let mut caret = String::new();
        for _ in 0..col {
            caret.push(' ');
        }
        caret.push('^');
        eprintln!("     | {}", caret);
    }
}

/// Report a diagnostic against `source` and hand back an `anyhow::Error`
/// carrying the bare message, for `?`-style propagation out of the run.
pub fn emit(diag: &Diagnostic, file: Option<&str>, source: &str) -> anyhow::Error {
    report_error_span(file, source, diag.loc, &diag.message);
    anyhow::anyhow!("{}", diag.message)
}
