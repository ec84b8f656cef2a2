//! Glob Pattern Matching
//!
//! Shell-style patterns used by `keys` to filter key suffixes.
//!
//! Supported syntax:
//! - `*` matches any sequence of characters (including none)
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` match one character from a class
//! - `[^abc]` / `[!abc]` match one character *not* in the class
//! - `\x` matches `x` literally
//!
//! Patterns are compiled up front, so a malformed pattern is rejected before
//! any key is examined.

use crate::storage::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnySequence,
    Class {
        negated: bool,
        ranges: Vec<(char, char)>,
    },
}

impl Token {
    #[inline]
    fn matches_char(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => true,
            Token::AnySequence => false,
            Token::Class { negated, ranges } => {
                let hit = ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
                hit != *negated
            }
        }
    }
}

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    tokens: Vec<Token>,
}

impl GlobPattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPattern`] for an unterminated or empty
    /// character class, a reversed range such as `[z-a]`, or a trailing `\`.
    pub fn compile(pattern: &str) -> StoreResult<Self> {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    // Consecutive stars are equivalent to one
                    if tokens.last() != Some(&Token::AnySequence) {
                        tokens.push(Token::AnySequence);
                    }
                }
                '?' => tokens.push(Token::AnyChar),
                '\\' => {
                    let escaped = chars.next().ok_or_else(|| {
                        StoreError::InvalidPattern(format!("trailing escape in '{}'", pattern))
                    })?;
                    tokens.push(Token::Literal(escaped));
                }
                '[' => {
                    let negated = matches!(chars.peek(), Some('^') | Some('!'));
                    if negated {
                        chars.next();
                    }

                    let mut ranges = Vec::new();
                    let mut closed = false;

                    while let Some(c) = chars.next() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        let lo = if c == '\\' {
                            chars.next().ok_or_else(|| {
                                StoreError::InvalidPattern(format!(
                                    "trailing escape in '{}'",
                                    pattern
                                ))
                            })?
                        } else {
                            c
                        };

                        // Range like a-z, but a trailing '-' before ']' is a literal
                        let mut hi = lo;
                        if chars.peek() == Some(&'-') {
                            let mut lookahead = chars.clone();
                            lookahead.next();
                            match lookahead.peek() {
                                Some(']') | None => {}
                                Some(_) => {
                                    chars.next();
                                    let end = match chars.next() {
                                        Some('\\') => chars.next(),
                                        other => other,
                                    };
                                    hi = end.ok_or_else(|| {
                                        StoreError::InvalidPattern(format!(
                                            "unterminated range in '{}'",
                                            pattern
                                        ))
                                    })?;
                                }
                            }
                        }

                        if lo > hi {
                            return Err(StoreError::InvalidPattern(format!(
                                "reversed range {}-{} in '{}'",
                                lo, hi, pattern
                            )));
                        }
                        ranges.push((lo, hi));
                    }

                    if !closed {
                        return Err(StoreError::InvalidPattern(format!(
                            "unterminated character class in '{}'",
                            pattern
                        )));
                    }
                    if ranges.is_empty() {
                        return Err(StoreError::InvalidPattern(format!(
                            "empty character class in '{}'",
                            pattern
                        )));
                    }
                    tokens.push(Token::Class { negated, ranges });
                }
                c => tokens.push(Token::Literal(c)),
            }
        }

        Ok(Self { tokens })
    }

    /// Returns true if `text` matches the whole pattern.
    pub fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().collect();
        let mut p = 0;
        let mut t = 0;
        // Position of the last `*` seen and the text index it is currently absorbing up to
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.tokens.get(p) {
                Some(Token::AnySequence) => {
                    backtrack = Some((p, t));
                    p += 1;
                    continue;
                }
                Some(token) if token.matches_char(text[t]) => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }

            match backtrack {
                Some((star, absorbed)) => {
                    p = star + 1;
                    t = absorbed + 1;
                    backtrack = Some((star, absorbed + 1));
                }
                None => return false,
            }
        }

        self.tokens[p..]
            .iter()
            .all(|token| *token == Token::AnySequence)
    }
}
