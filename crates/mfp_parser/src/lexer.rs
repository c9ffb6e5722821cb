use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use crate::span::{BytePos, Span, WithSpan};
use crate::token::Token;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LexError {
    #[error("Unexpected character '{0}' in source")]
    UnexpectedCharacter(char),
    #[error("Expected sequence '{expected}' but found '{found}'")]
    MalformedOperator {
        expected: &'static str,
        found: String,
    },
}

type LexResult<T> = Result<T, LexError>;

/// Result of tokenising a whole source unit.
///
/// Scanning recovers from bad characters so that every problem on a line gets
/// reported, but a token stream with errors must not be handed to the parser.
#[derive(Debug, Default)]
pub struct Tokens {
    pub tokens: Vec<WithSpan<Token>>,
    pub errors: Vec<WithSpan<LexError>>,
}

impl Tokens {
    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn lexemes(&self) -> Vec<String> {
        self.tokens.iter().map(|tok| tok.value.lexeme()).collect()
    }

    pub fn into_result(self) -> Result<Vec<WithSpan<Token>>, Vec<WithSpan<LexError>>> {
        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    input_iter: Peekable<Chars<'a>>,
    current_position: BytePos,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            input,
            input_iter: input.chars().peekable(),
            current_position: BytePos::new(0),
        }
    }

    /// Scan the whole input, collecting tokens and errors.
    pub fn tokenise(mut self) -> Tokens {
        let mut result = Tokens::default();

        loop {
            self.skip_whitespace();
            let start = self.current_position;
            match self.next_token() {
                Ok(WithSpan {
                    value: Token::Eof, ..
                }) => break,
                Ok(token) => result.tokens.push(token),
                Err(error) => {
                    let span = Span::new(start, self.current_position);
                    tracing::debug!(%error, %span, "lex error");
                    result.errors.push(WithSpan::new(error, span));
                }
            }
        }

        tracing::trace!(
            tokens = result.tokens.len(),
            errors = result.errors.len(),
            "tokenised input"
        );
        result
    }

    /// Consume the next character from the list.
    fn read_char(&mut self) -> Option<char> {
        let next = self.input_iter.next();
        if let Some(c) = next {
            self.current_position = self.current_position.shift(c);
        }
        next
    }

    /// Get the next character from the list without consuming it.
    fn peek_char(&mut self) -> Option<&char> {
        self.input_iter.peek()
    }

    /// The not yet consumed part of the input.
    fn rest(&self) -> &'a str {
        let input = self.input;
        &input[self.current_position.offset()..]
    }

    /// Consume spaces, tabs and `#` comments. Newlines are tokens.
    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.peek_char() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.read_char();
                }
                '#' => {
                    while let Some(&c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.read_char();
                    }
                }
                _ => break,
            }
        }
    }

    /// Consume `expected` exactly, or fail after skipping its first character.
    fn read_operator(&mut self, expected: &'static str, token: Token) -> LexResult<Token> {
        let rest = self.rest();
        if rest.starts_with(expected) {
            for _ in expected.chars() {
                self.read_char();
            }
            return Ok(token);
        }

        let found: String = rest.chars().take(expected.chars().count()).collect();
        self.read_char();
        Err(LexError::MalformedOperator { expected, found })
    }

    /// Match `if`/`then`/`else` as a literal prefix of the remaining input.
    fn read_keyword(&mut self) -> Option<Token> {
        let rest = self.rest();
        let (keyword, token) = Token::KEYWORDS
            .into_iter()
            .find(|(keyword, _)| rest.starts_with(*keyword))?;

        for _ in keyword.chars() {
            self.read_char();
        }
        Some(token)
    }

    /// Read a digit run, optionally followed by one `.` and another digit run.
    fn read_number(&mut self) -> Token {
        let mut s = String::new();

        self.read_digits(&mut s);
        if let Some('.') = self.peek_char() {
            s.push('.');
            self.read_char();
            self.read_digits(&mut s);
        }

        Token::Number(s)
    }

    fn read_digits(&mut self, s: &mut String) {
        while let Some(&ch) = self.peek_char() {
            if !is_digit(ch) {
                break;
            }
            s.push(ch);
            self.read_char();
        }
    }

    /// Read the current and following characters as an identifier.
    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();

        while let Some(&ch) = self.peek_char() {
            if is_identifier_char(ch) {
                identifier.push(ch);
                self.read_char();
            } else {
                break;
            }
        }

        Token::Identifier(identifier)
    }

    /// Read a new token from the characters list.
    ///
    /// On error the offending character has already been consumed, so calling
    /// this again continues with the rest of the input.
    pub fn next_token(&mut self) -> LexResult<WithSpan<Token>> {
        self.skip_whitespace();

        let initial_position = self.current_position;

        let token = match self.peek_char().copied() {
            None => Token::Eof,
            Some(':') => self.read_operator(":=", Token::Binding)?,
            Some('|') => self.read_operator("|->", Token::MapsTo)?,
            Some(c) => {
                if let Some(keyword) = self.read_keyword() {
                    keyword
                } else if c.is_alphabetic() {
                    self.read_identifier()
                } else if is_digit(c) {
                    self.read_number()
                } else {
                    self.read_char();
                    match c {
                        '\n' => Token::EndLine,
                        '(' => Token::LeftParen,
                        ')' => Token::RightParen,
                        '+' => Token::Plus,
                        '-' => Token::Minus,
                        '*' => Token::Star,
                        '/' => Token::Slash,
                        '>' => Token::GreaterThan,
                        _ => return Err(LexError::UnexpectedCharacter(c)),
                    }
                }
            }
        };

        let span = Span::new(initial_position, self.current_position);

        Ok(WithSpan::new(token, span))
    }
}

/// Whether or not the given character is a digit
fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

/// Whether or not the given character may continue an identifier
fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
