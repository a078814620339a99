//! Lexical analysis (tokenization)
//!
//! The lexer converts MathVM source code into a stream of tokens with
//! accurate span information. String literals are single-quoted; `//`
//! starts a line comment; `1..5` lexes as two integer literals around a
//! range token (a `.` only begins a fraction when a digit follows it).

use crate::diagnostic::TranslationError;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Lexer state for tokenizing source code
pub struct Lexer {
    /// Characters of source code
    chars: Vec<char>,
    /// Current position in chars
    current: usize,
    /// Start position of current token
    start_pos: usize,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            current: 0,
            start_pos: 0,
        }
    }

    /// Tokenize the source code
    ///
    /// Returns the full token stream (terminated by an `Eof` token) or the
    /// first lexical error.
    pub fn tokenize(mut self) -> Result<Vec<Token>, TranslationError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    /// Scan the next token
    fn next_token(&mut self) -> Result<Token, TranslationError> {
        self.skip_whitespace_and_comments();
        self.start_pos = self.current;

        if self.is_at_end() {
            return Ok(self.make_token(TokenKind::Eof));
        }

        let c = self.advance();
        let token = match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '%' => self.make_token(TokenKind::Percent),
            '^' => self.make_token(TokenKind::Caret),

            '+' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::PlusEqual)
                } else {
                    self.make_token(TokenKind::Plus)
                }
            }
            '-' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::MinusEqual)
                } else {
                    self.make_token(TokenKind::Minus)
                }
            }
            '=' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::EqualEqual)
                } else {
                    self.make_token(TokenKind::Equal)
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::BangEqual)
                } else {
                    self.make_token(TokenKind::Bang)
                }
            }
            '<' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::LessEqual)
                } else {
                    self.make_token(TokenKind::Less)
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::GreaterEqual)
                } else {
                    self.make_token(TokenKind::Greater)
                }
            }
            '&' => {
                if self.match_char('&') {
                    self.make_token(TokenKind::AmpAmp)
                } else {
                    self.make_token(TokenKind::Amp)
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.make_token(TokenKind::PipePipe)
                } else {
                    self.make_token(TokenKind::Pipe)
                }
            }
            '.' => {
                if self.match_char('.') {
                    self.make_token(TokenKind::Range)
                } else {
                    return Err(self.error("Unexpected character '.'"));
                }
            }

            '\'' => self.string()?,
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),

            c => return Err(self.error(format!("Unexpected character '{}'", c))),
        };

        Ok(token)
    }

    /// Scan a single-quoted string literal with escapes
    fn string(&mut self) -> Result<Token, TranslationError> {
        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(self.error("Unterminated string literal"));
            }
            match self.advance() {
                '\'' => break,
                '\\' => {
                    if self.is_at_end() {
                        return Err(self.error("Unterminated string literal"));
                    }
                    let escaped = self.advance();
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\\' => value.push('\\'),
                        '\'' => value.push('\''),
                        other => {
                            return Err(
                                self.error(format!("Unknown escape sequence '\\{}'", other))
                            )
                        }
                    }
                }
                c => value.push(c),
            }
        }
        Ok(self.make_token(TokenKind::Str(value)))
    }

    /// Scan an integer or double literal
    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A '.' continues the number only when a digit follows, so `1..5`
        // leaves the range token intact.
        let mut is_double = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_double = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.chars[self.start_pos..self.current].iter().collect();
        if is_double {
            self.make_token(TokenKind::Double(text.parse().unwrap_or(0.0)))
        } else {
            // Literals beyond i64 range saturate.
            self.make_token(TokenKind::Int(text.parse().unwrap_or(i64::MAX)))
        }
    }

    /// Scan an identifier or keyword
    fn identifier(&mut self) -> Token {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let text: String = self.chars[self.start_pos..self.current].iter().collect();
        let kind = match text.as_str() {
            "int" => TokenKind::KwInt,
            "double" => TokenKind::KwDouble,
            "string" => TokenKind::KwString,
            "void" => TokenKind::KwVoid,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "print" => TokenKind::Print,
            _ => TokenKind::Ident(text),
        };
        self.make_token(kind)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_next() == '/' => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            span: Span::new(self.start_pos, self.current),
        }
    }

    fn error(&self, message: impl Into<String>) -> TranslationError {
        TranslationError::new(message, Span::new(self.start_pos, self.current))
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.current += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            kinds("int x; double y;"),
            vec![
                TokenKind::KwInt,
                TokenKind::Ident("x".to_string()),
                TokenKind::Semicolon,
                TokenKind::KwDouble,
                TokenKind::Ident("y".to_string()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_range_does_not_eat_dots() {
        assert_eq!(
            kinds("1..5"),
            vec![
                TokenKind::Int(1),
                TokenKind::Range,
                TokenKind::Int(5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_double_literal() {
        assert_eq!(
            kinds("0.5 + 2"),
            vec![
                TokenKind::Double(0.5),
                TokenKind::Plus,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_with_escapes() {
        assert_eq!(
            kinds(r"'a\n\'b'"),
            vec![TokenKind::Str("a\n'b".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("a += 1; b -= 2; a == b; a != b; a && b || !a"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::PlusEqual,
                TokenKind::Int(1),
                TokenKind::Semicolon,
                TokenKind::Ident("b".to_string()),
                TokenKind::MinusEqual,
                TokenKind::Int(2),
                TokenKind::Semicolon,
                TokenKind::Ident("a".to_string()),
                TokenKind::EqualEqual,
                TokenKind::Ident("b".to_string()),
                TokenKind::Semicolon,
                TokenKind::Ident("a".to_string()),
                TokenKind::BangEqual,
                TokenKind::Ident("b".to_string()),
                TokenKind::Semicolon,
                TokenKind::Ident("a".to_string()),
                TokenKind::AmpAmp,
                TokenKind::Ident("b".to_string()),
                TokenKind::PipePipe,
                TokenKind::Bang,
                TokenKind::Ident("a".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("// nothing here\nint x; // trailing\n"),
            vec![
                TokenKind::KwInt,
                TokenKind::Ident("x".to_string()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = Lexer::new("'abc").tokenize().unwrap_err();
        assert_eq!(err.message, "Unterminated string literal");
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::new("x = 10;").tokenize().unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 1));
        assert_eq!(tokens[1].span, Span::new(2, 3));
        assert_eq!(tokens[2].span, Span::new(4, 6));
    }
}
