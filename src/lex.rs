use std::fmt::Display;

use miette::SourceSpan;

use crate::error::{SyntaxError, named_source};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    pub offset: usize,
}

impl Token<'_> {
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from(self.offset..self.offset + self.literal.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    And,
    Or,
    Not,
    Ident,
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit}"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit}"),
            TokenKind::And => write!(f, "AND {lit}"),
            TokenKind::Or => write!(f, "OR {lit}"),
            TokenKind::Not => write!(f, "NOT {lit}"),
            TokenKind::Ident => write!(f, "IDENTIFIER {lit}"),
        }
    }
}

fn starts_ident(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn continues_ident(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

pub struct Lexer<'de> {
    whole: &'de str,
    rest: &'de str,
    byte: usize,
    peeked: Option<Result<Token<'de>, SyntaxError>>,
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            whole: input,
            rest: input,
            byte: 0,
            peeked: None,
        }
    }

    /// Looks at the next token without consuming it.
    ///
    /// A lexing error is handed out immediately rather than kept buffered, so
    /// the parser can bail out with it.
    pub fn peek(&mut self) -> Result<Option<Token<'de>>, SyntaxError> {
        if self.peeked.is_none() {
            self.peeked = self.next();
        }
        match self.peeked.take() {
            Some(Ok(token)) => {
                self.peeked = Some(Ok(token));
                Ok(Some(token))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Builds the error for input that ended where `expected` was required.
    pub fn eof(&self, expected: &'static str) -> SyntaxError {
        let trimmed = self.whole.trim_end();
        let last = trimmed.chars().next_back().map_or(0, char::len_utf8);
        SyntaxError::UnexpectedEof {
            src: named_source(self.whole),
            span: SourceSpan::from(trimmed.len() - last..trimmed.len()),
            expected,
        }
    }

    pub fn unexpected(&self, token: Token<'de>, expected: &'static str) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            src: named_source(self.whole),
            span: token.span(),
            found: token.literal.to_string(),
            expected,
        }
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(peeked) = self.peeked.take() {
            return Some(peeked);
        }
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let offset = self.byte;
            let literal = &self.rest[..c.len_utf8()];
            let cur = self.rest;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            let process = move |kind: TokenKind| {
                Some(Ok(Token {
                    kind,
                    literal,
                    offset,
                }))
            };

            match c {
                '(' => return process(TokenKind::LeftParen),
                ')' => return process(TokenKind::RightParen),
                c if c.is_whitespace() => continue,
                c if starts_ident(c) => {
                    let end = cur
                        .find(|c: char| !continues_ident(c))
                        .unwrap_or(cur.len());
                    let literal = &cur[..end];

                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    // keywords are matched case-sensitively, `AND` is an identifier
                    let kind = match literal {
                        "and" => TokenKind::And,
                        "or" => TokenKind::Or,
                        "not" => TokenKind::Not,
                        _ => TokenKind::Ident,
                    };

                    return Some(Ok(Token {
                        kind,
                        literal,
                        offset,
                    }));
                }
                c => {
                    return Some(Err(SyntaxError::UnexpectedCharacter {
                        src: named_source(self.whole),
                        span: SourceSpan::from(offset..self.byte),
                        found: c,
                    }));
                }
            }
        }
    }
}
