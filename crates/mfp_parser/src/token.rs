use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    GreaterThan,

    Binding, // :=
    MapsTo,  // |->

    // Delimiters
    LeftParen,
    RightParen,
    EndLine,

    // Identifiers & Literals
    Identifier(String),
    /// Kept as the exact source lexeme; the parser decides integer or float.
    Number(String),

    // Keywords
    If,
    Then,
    Else,

    // Special
    Eof,
}

impl Token {
    /// Keywords in the order the lexer tests for them.
    pub const KEYWORDS: [(&'static str, Token); 3] =
        [("if", Token::If), ("then", Token::Then), ("else", Token::Else)];

    /// The exact source text this token was scanned from.
    pub fn lexeme(&self) -> String {
        self.to_string()
    }

    /// Human readable name of the token kind, used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier `{}`", name),
            Token::Number(lexeme) => format!("number `{}`", lexeme),
            Token::EndLine => "end of line".to_owned(),
            Token::Eof => "end of input".to_owned(),
            other => format!("`{}`", other),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Plus => write!(f, "+"),
            Minus => write!(f, "-"),
            Star => write!(f, "*"),
            Slash => write!(f, "/"),
            GreaterThan => write!(f, ">"),

            Binding => write!(f, ":="),
            MapsTo => write!(f, "|->"),

            LeftParen => write!(f, "("),
            RightParen => write!(f, ")"),
            EndLine => writeln!(f),

            Identifier(name) => write!(f, "{}", name),
            Number(lexeme) => write!(f, "{}", lexeme),

            If => write!(f, "if"),
            Then => write!(f, "then"),
            Else => write!(f, "else"),

            Eof => write!(f, "EOF"),
        }
    }
}
