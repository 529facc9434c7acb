//! Lexer (tokenizer) for filter expressions.

use std::iter::Peekable;
use std::str::CharIndices;

/// Error encountered during lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError {
    /// What could not be tokenized.
    pub message: String,
    /// The byte offset where the error occurred.
    pub position: usize,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for LexerError {}

/// Result of tokenizing an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LexerResult {
    /// The tokens successfully read, with their positions.
    pub tokens: Vec<PositionedToken>,
    /// Any errors encountered.
    pub errors: Vec<LexerError>,
}

/// A token with its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
    /// The token.
    pub token: Token,
    /// The byte offset where the token starts.
    pub position: usize,
}

/// A token in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ==================== Literals ====================
    /// An integer literal.
    Int(i64),
    /// A floating point literal.
    Double(f64),
    /// A string literal, escapes already resolved.
    String(String),
    /// `true` or `false`.
    Bool(bool),

    // ==================== Names ====================
    /// An identifier.
    Ident(String),
    /// The `in` keyword.
    In,

    // ==================== Punctuation ====================
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `[`
    OpenBracket,
    /// `]`
    CloseBracket,
    /// `?`
    Question,
    /// `:`
    Colon,

    // ==================== Operators ====================
    /// `!`
    Not,
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{}", n),
            Token::Double(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Bool(b) => write!(f, "{}", b),
            Token::Ident(name) => write!(f, "{}", name),
            Token::In => write!(f, "in"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::OpenParen => write!(f, "("),
            Token::CloseParen => write!(f, ")"),
            Token::OpenBracket => write!(f, "["),
            Token::CloseBracket => write!(f, "]"),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::Not => write!(f, "!"),
            Token::Minus => write!(f, "-"),
            Token::Plus => write!(f, "+"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
        }
    }
}

/// Lexer for tokenizing expressions.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// Errors encountered during tokenization.
    errors: Vec<LexerError>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            errors: Vec::new(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Peeks two characters ahead.
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    /// Returns the current byte offset.
    fn position(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }

    fn error(&mut self, message: impl Into<String>, position: usize) {
        self.errors.push(LexerError {
            message: message.into(),
            position,
        });
    }

    /// Skips whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.next_char();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.next_char() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.next_char();
            } else {
                break;
            }
        }
        ident
    }

    fn read_number(&mut self, start: usize) -> Option<Token> {
        if self.peek() == Some('0') && matches!(self.peek_second(), Some('x') | Some('X')) {
            self.next_char();
            self.next_char();
            let mut digits = String::new();
            while let Some(c) = self.peek().filter(char::is_ascii_hexdigit) {
                digits.push(c);
                self.next_char();
            }
            return match i64::from_str_radix(&digits, 16) {
                Ok(n) => Some(Token::Int(n)),
                Err(_) => {
                    self.error(format!("invalid hex literal '0x{}'", digits), start);
                    None
                }
            };
        }

        let mut text = String::new();
        let mut is_double = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.next_char();
            } else if c == '.' && !is_double && self.peek_second().is_some_and(|d| d.is_ascii_digit()) {
                is_double = true;
                text.push(c);
                self.next_char();
            } else if (c == 'e' || c == 'E') && !text.contains(['e', 'E']) {
                let mut ahead = self.chars.clone();
                ahead.next();
                let mut sign = None;
                let mut next = ahead.next().map(|(_, c)| c);
                if matches!(next, Some('+') | Some('-')) {
                    sign = next;
                    next = ahead.next().map(|(_, c)| c);
                }
                if !next.is_some_and(|d| d.is_ascii_digit()) {
                    break;
                }
                is_double = true;
                text.push(c);
                self.next_char();
                if let Some(s) = sign {
                    text.push(s);
                    self.next_char();
                }
            } else {
                break;
            }
        }

        if is_double {
            match text.parse::<f64>() {
                Ok(n) => Some(Token::Double(n)),
                Err(_) => {
                    self.error(format!("invalid number '{}'", text), start);
                    None
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => Some(Token::Int(n)),
                Err(_) => {
                    self.error(format!("integer literal '{}' out of range", text), start);
                    None
                }
            }
        }
    }

    /// Reads a quoted string. The opening quote has not been consumed.
    fn read_string(&mut self, raw: bool, start: usize) -> Option<Token> {
        let quote = self.next_char()?;
        let mut result = String::new();

        loop {
            let Some(c) = self.next_char() else {
                self.error("unterminated string literal", start);
                return None;
            };
            if c == quote {
                return Some(Token::String(result));
            }
            if c == '\n' {
                self.error("newline in string literal", start);
                return None;
            }
            if c != '\\' || raw {
                result.push(c);
                continue;
            }

            let escape_position = self.position();
            let resolved = match self.next_char() {
                Some('n') => Some('\n'),
                Some('r') => Some('\r'),
                Some('t') => Some('\t'),
                Some('0') => Some('\0'),
                Some('a') => Some('\u{07}'),
                Some('b') => Some('\u{08}'),
                Some('f') => Some('\u{0C}'),
                Some('v') => Some('\u{0B}'),
                Some('\\') => Some('\\'),
                Some('"') => Some('"'),
                Some('\'') => Some('\''),
                Some('`') => Some('`'),
                Some('?') => Some('?'),
                Some('u') => self.read_unicode_escape(4),
                Some('U') => self.read_unicode_escape(8),
                _ => None,
            };
            match resolved {
                Some(ch) => result.push(ch),
                None => {
                    self.error("invalid escape sequence", escape_position);
                    return None;
                }
            }
        }
    }

    fn read_unicode_escape(&mut self, width: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..width {
            let digit = self.next_char()?.to_digit(16)?;
            code = code * 16 + digit;
        }
        char::from_u32(code)
    }

    /// Returns the next token with its position, or None at end of input.
    pub fn next_token(&mut self) -> Option<PositionedToken> {
        loop {
            self.skip_trivia();
            let start = self.position();
            let c = self.peek()?;

            let token = match c {
                '.' if self.peek_second().is_some_and(|d| d.is_ascii_digit()) => {
                    self.error("number literals must start with a digit", start);
                    self.next_char();
                    None
                }
                '0'..='9' => self.read_number(start),
                '"' | '\'' => self.read_string(false, start),
                'r' | 'R' if matches!(self.peek_second(), Some('"') | Some('\'')) => {
                    self.next_char();
                    self.read_string(true, start)
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let ident = self.read_identifier();
                    Some(match ident.as_str() {
                        "true" => Token::Bool(true),
                        "false" => Token::Bool(false),
                        "in" => Token::In,
                        _ => Token::Ident(ident),
                    })
                }
                _ => {
                    self.next_char();
                    self.operator(c, start)
                }
            };

            if let Some(token) = token {
                return Some(PositionedToken {
                    token,
                    position: start,
                });
            }
            // An error was recorded; keep scanning so later errors surface too.
        }
    }

    /// Reads a punctuation or operator token whose first character is consumed.
    fn operator(&mut self, c: char, start: usize) -> Option<Token> {
        let follow = |lexer: &mut Self, expected: char| {
            if lexer.peek() == Some(expected) {
                lexer.next_char();
                true
            } else {
                false
            }
        };

        match c {
            '.' => Some(Token::Dot),
            ',' => Some(Token::Comma),
            '(' => Some(Token::OpenParen),
            ')' => Some(Token::CloseParen),
            '[' => Some(Token::OpenBracket),
            ']' => Some(Token::CloseBracket),
            '?' => Some(Token::Question),
            ':' => Some(Token::Colon),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '!' if follow(self, '=') => Some(Token::NotEqual),
            '!' => Some(Token::Not),
            '<' if follow(self, '=') => Some(Token::LessEqual),
            '<' => Some(Token::Less),
            '>' if follow(self, '=') => Some(Token::GreaterEqual),
            '>' => Some(Token::Greater),
            '=' if follow(self, '=') => Some(Token::Equal),
            '&' if follow(self, '&') => Some(Token::And),
            '|' if follow(self, '|') => Some(Token::Or),
            '=' => {
                self.error("unexpected '=' (use '==' for equality)", start);
                None
            }
            other => {
                self.error(format!("unexpected character '{}'", other), start);
                None
            }
        }
    }

    /// Collects all tokens into a vector (without positions).
    #[cfg(test)]
    pub fn tokenize(self) -> Vec<Token> {
        self.tokenize_with_errors()
            .tokens
            .into_iter()
            .map(|pt| pt.token)
            .collect()
    }

    /// Collects all tokens and any errors encountered.
    pub fn tokenize_with_errors(mut self) -> LexerResult {
        let mut tokens = Vec::new();
        while let Some(positioned_token) = self.next_token() {
            tokens.push(positioned_token);
        }
        LexerResult {
            tokens,
            errors: self.errors,
        }
    }
}
