//! Tokenizer for interface description files.
//!
//! Produces the token stream consumed by the recursive-descent parser.
//! Whitespace and comments are dropped during scanning; every emitted
//! token carries its byte span so later stages can point diagnostics at
//! the exact source location.

use crate::diagnostics::Diagnostic;
use std::ops::Range;

/// A token in the interface description language.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range in the original source
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Typedef,
    Config,
    Namespace,
    GenType,
    Struct,
    Const,
    Volatile,
    Signed,
    Unsigned,
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,

    // Identifiers and literals
    Ident(String),
    Integer(u64),
    Str(String),

    // Punctuation
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    DoubleLeftBracket,  // [[
    DoubleRightBracket, // ]]
    Star,         // *
    Comma,        // ,
    Semicolon,    // ;
    Eq,           // =
    Ellipsis,     // ...

    Eof,
}

impl TokenKind {
    fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "typedef" => TokenKind::Typedef,
            "config" => TokenKind::Config,
            "namespace" => TokenKind::Namespace,
            "gen_type" => TokenKind::GenType,
            "struct" => TokenKind::Struct,
            "const" => TokenKind::Const,
            "volatile" => TokenKind::Volatile,
            "signed" => TokenKind::Signed,
            "unsigned" => TokenKind::Unsigned,
            "void" => TokenKind::Void,
            "bool" => TokenKind::Bool,
            "char" => TokenKind::Char,
            "short" => TokenKind::Short,
            "int" => TokenKind::Int,
            "long" => TokenKind::Long,
            "float" => TokenKind::Float,
            "double" => TokenKind::Double,
            _ => return None,
        };
        Some(kind)
    }
}

/// Tokenize a source string. The trailing `Eof` token points one past
/// the end of the input so "unexpected end of file" diagnostics land on
/// the final line.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Diagnostic> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            ' ' | '\t' | '\r' | '\n' => {}

            // Line comment
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                chars.next();
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }

            // Block comment
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        closed = true;
                        break;
                    }
                    prev = c;
                }
                if !closed {
                    return Err(Diagnostic::new("unterminated block comment", pos));
                }
            }

            // String literal (no escapes; loader symbol names don't need them)
            '"' => {
                let mut value = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    if c == '\n' {
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(Diagnostic::new("unterminated string literal", pos));
                }
                let end = pos + value.len() + 2;
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    span: pos..end,
                });
            }

            '0'..='9' => {
                let mut num_str = String::from(ch);
                while let Some((_, c)) = chars.peek().copied() {
                    if c.is_ascii_digit() {
                        chars.next();
                        num_str.push(c);
                    } else {
                        break;
                    }
                }
                let value = num_str
                    .parse::<u64>()
                    .map_err(|_| Diagnostic::new("integer literal out of range", pos))?;
                let end = pos + num_str.len();
                tokens.push(Token {
                    kind: TokenKind::Integer(value),
                    span: pos..end,
                });
            }

            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some((_, c)) = chars.peek().copied() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        chars.next();
                        ident.push(c);
                    } else {
                        break;
                    }
                }
                let end = pos + ident.len();
                let kind = TokenKind::keyword(&ident).unwrap_or(TokenKind::Ident(ident));
                tokens.push(Token {
                    kind,
                    span: pos..end,
                });
            }

            '(' => tokens.push(Token {
                kind: TokenKind::LeftParen,
                span: pos..pos + 1,
            }),
            ')' => tokens.push(Token {
                kind: TokenKind::RightParen,
                span: pos..pos + 1,
            }),
            '{' => tokens.push(Token {
                kind: TokenKind::LeftBrace,
                span: pos..pos + 1,
            }),
            '}' => tokens.push(Token {
                kind: TokenKind::RightBrace,
                span: pos..pos + 1,
            }),
            '*' => tokens.push(Token {
                kind: TokenKind::Star,
                span: pos..pos + 1,
            }),
            ',' => tokens.push(Token {
                kind: TokenKind::Comma,
                span: pos..pos + 1,
            }),
            ';' => tokens.push(Token {
                kind: TokenKind::Semicolon,
                span: pos..pos + 1,
            }),
            '=' => tokens.push(Token {
                kind: TokenKind::Eq,
                span: pos..pos + 1,
            }),

            '[' => {
                if matches!(chars.peek(), Some((_, '['))) {
                    chars.next();
                    tokens.push(Token {
                        kind: TokenKind::DoubleLeftBracket,
                        span: pos..pos + 2,
                    });
                } else {
                    return Err(Diagnostic::new(
                        "expected `[[` (annotations use double brackets)",
                        pos,
                    ));
                }
            }
            ']' => {
                if matches!(chars.peek(), Some((_, ']'))) {
                    chars.next();
                    tokens.push(Token {
                        kind: TokenKind::DoubleRightBracket,
                        span: pos..pos + 2,
                    });
                } else {
                    return Err(Diagnostic::new(
                        "expected `]]` (annotations use double brackets)",
                        pos,
                    ));
                }
            }

            '.' => {
                // only `...` is valid
                let mut dots = 1;
                while dots < 3 && matches!(chars.peek(), Some((_, '.'))) {
                    chars.next();
                    dots += 1;
                }
                if dots != 3 {
                    return Err(Diagnostic::new("expected `...`", pos));
                }
                tokens.push(Token {
                    kind: TokenKind::Ellipsis,
                    span: pos..pos + 3,
                });
            }

            _ => {
                return Err(Diagnostic::new(
                    format!("unexpected character `{}`", ch),
                    pos,
                ));
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: source.len()..source.len(),
    });
    Ok(tokens)
}
