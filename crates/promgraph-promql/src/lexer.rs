//! Tokenizer for PromQL expressions.

use std::iter::Peekable;
use std::str::CharIndices;

use promgraph_error::{Error, Result};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TokenKind {
    /// Identifiers, keywords and metric names (which may contain `:`).
    Ident,
    Number,
    Duration,
    /// A quoted string; the token text holds the unescaped value.
    String,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    At,
    /// `=` in a label matcher.
    Assign,
    /// `==`
    Eql,
    /// `!=`
    Neq,
    /// `=~`
    EqlRegex,
    /// `!~`
    NeqRegex,
    Lss,
    Lte,
    Gtr,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character of the token.
    pub pos: usize,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Human readable form for error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::String => format!("string {:?}", self.text),
            _ => format!("\"{}\"", self.text),
        }
    }
}

pub struct Lexer<'source> {
    input: &'source str,
    iter: Peekable<CharIndices<'source>>,
}

impl<'source> Lexer<'source> {
    pub fn new(input: &'source str) -> Self {
        Self {
            input,
            iter: input.char_indices().peekable(),
        }
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws();
        let (pos, ch) = self.peek();
        match ch {
            '\x00' if pos == self.input.len() => Ok(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                pos,
            }),
            '"' | '\'' => self.read_string(ch),
            '`' => self.read_raw_string(),
            c if c.is_ascii_digit() => self.read_number_or_duration(),
            '.' if self.peekahead(1).1.is_ascii_digit() => self.read_number_or_duration(),
            c if is_ident_start(c) => Ok(self.read_ident()),
            ':' if is_ident_start(self.peekahead(1).1) => Ok(self.read_ident()),
            _ => self.read_symbol(),
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.input.len(), '\x00'),
        }
    }

    fn peekahead(&self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.input.len(), '\x00'),
        }
    }

    fn error(&self, pos: usize, msg: impl Into<String>) -> Error {
        Error::syntax_error(msg)
            .with_operation("promql::lex")
            .with_context("position", pos.to_string())
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek().1 {
                ' ' | '\t' | '\n' | '\r' => {
                    self.iter.next();
                }
                '#' => {
                    while !matches!(self.peek().1, '\n' | '\x00') {
                        self.iter.next();
                    }
                }
                _ => return,
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize) -> Token {
        Token {
            kind,
            text: self.input[start..end].to_string(),
            pos: start,
        }
    }

    fn read_ident(&mut self) -> Token {
        let start = self.peek().0;
        // The first character was already validated by the caller.
        self.iter.next();
        while is_ident_continue(self.peek().1) {
            self.iter.next();
        }
        let end = self.peek().0;
        self.token(TokenKind::Ident, start, end)
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() {
            self.iter.next();
        }
    }

    fn read_number_or_duration(&mut self) -> Result<Token> {
        let start = self.peek().0;

        if self.peek().1 == '0' && matches!(self.peekahead(1).1, 'x' | 'X') {
            self.iter.next();
            self.iter.next();
            let digits = self.peek().0;
            while self.peek().1.is_ascii_hexdigit() {
                self.iter.next();
            }
            if self.peek().0 == digits {
                return Err(self.error(start, "bad number syntax"));
            }
            return self.finish_number(start, TokenKind::Number);
        }

        let mut integral = true;
        self.read_digits();
        if self.peek().1 == '.' {
            integral = false;
            self.iter.next();
            self.read_digits();
        }

        if matches!(self.peek().1, 'e' | 'E') {
            let next = self.peekahead(1).1;
            let after = self.peekahead(2).1;
            if next.is_ascii_digit() || (matches!(next, '+' | '-') && after.is_ascii_digit()) {
                integral = false;
                self.iter.next();
                if matches!(self.peek().1, '+' | '-') {
                    self.iter.next();
                }
                self.read_digits();
            }
        }

        if integral && matches!(self.peek().1, 'y' | 'w' | 'd' | 'h' | 'm' | 's') {
            return self.read_duration_units(start);
        }
        self.finish_number(start, TokenKind::Number)
    }

    /// Reads `<unit>(<digits><unit>)*` after the leading digits of a duration.
    fn read_duration_units(&mut self, start: usize) -> Result<Token> {
        loop {
            match self.peek().1 {
                'm' => {
                    self.iter.next();
                    if self.peek().1 == 's' {
                        self.iter.next();
                    }
                }
                'y' | 'w' | 'd' | 'h' | 's' => {
                    self.iter.next();
                }
                _ => return Err(self.error(start, "bad duration syntax")),
            }
            if !self.peek().1.is_ascii_digit() {
                break;
            }
            self.read_digits();
        }
        self.finish_number(start, TokenKind::Duration)
    }

    fn finish_number(&mut self, start: usize, kind: TokenKind) -> Result<Token> {
        let (end, ch) = self.peek();
        if ch == '_' || ch == '.' || ch.is_ascii_alphanumeric() {
            return Err(self.error(start, "bad number or duration syntax"));
        }
        Ok(self.token(kind, start, end))
    }

    fn read_string(&mut self, quote: char) -> Result<Token> {
        let (start, _) = self.peek();
        self.iter.next();
        let mut value = String::new();
        loop {
            let Some((pos, ch)) = self.iter.next() else {
                return Err(self.error(start, "unterminated quoted string"));
            };
            match ch {
                c if c == quote => break,
                '\n' => return Err(self.error(start, "unterminated quoted string")),
                '\\' => value.push(self.read_escape(quote, pos)?),
                c => value.push(c),
            }
        }
        Ok(Token {
            kind: TokenKind::String,
            text: value,
            pos: start,
        })
    }

    fn read_escape(&mut self, quote: char, pos: usize) -> Result<char> {
        let Some((_, ch)) = self.iter.next() else {
            return Err(self.error(pos, "escape sequence not terminated"));
        };
        let c = match ch {
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\x0b',
            '\\' => '\\',
            c if c == quote => c,
            'x' => self.read_code_point(None, 2, 16, pos)?,
            'u' => self.read_code_point(None, 4, 16, pos)?,
            'U' => self.read_code_point(None, 8, 16, pos)?,
            '0'..='7' => self.read_code_point(Some(ch), 2, 8, pos)?,
            _ => return Err(self.error(pos, format!("unknown escape sequence '\\{ch}'"))),
        };
        Ok(c)
    }

    fn read_code_point(
        &mut self,
        first: Option<char>,
        digits: usize,
        radix: u32,
        pos: usize,
    ) -> Result<char> {
        let mut value = first.and_then(|c| c.to_digit(radix)).unwrap_or(0);
        for _ in 0..digits {
            let digit = self.iter.next().and_then(|(_, c)| c.to_digit(radix));
            let Some(digit) = digit else {
                return Err(self.error(pos, "illegal character in escape sequence"));
            };
            value = value * radix + digit;
        }
        if radix == 8 && value > 255 {
            return Err(self.error(pos, "octal escape value > 255"));
        }
        char::from_u32(value).ok_or_else(|| self.error(pos, "escape sequence is invalid Unicode"))
    }

    fn read_raw_string(&mut self) -> Result<Token> {
        let (start, _) = self.peek();
        self.iter.next();
        let mut value = String::new();
        loop {
            match self.iter.next() {
                Some((_, '`')) => break,
                Some((_, c)) => value.push(c),
                None => return Err(self.error(start, "unterminated raw string")),
            }
        }
        Ok(Token {
            kind: TokenKind::String,
            text: value,
            pos: start,
        })
    }

    fn read_symbol(&mut self) -> Result<Token> {
        let (start, ch) = self.peek();
        self.iter.next();
        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '@' => TokenKind::At,
            '+' => TokenKind::Add,
            '-' => TokenKind::Sub,
            '*' => TokenKind::Mul,
            '/' => TokenKind::Div,
            '%' => TokenKind::Mod,
            '^' => TokenKind::Pow,
            '=' => match self.peek().1 {
                '=' => self.advance_with(TokenKind::Eql),
                '~' => self.advance_with(TokenKind::EqlRegex),
                _ => TokenKind::Assign,
            },
            '!' => match self.peek().1 {
                '=' => self.advance_with(TokenKind::Neq),
                '~' => self.advance_with(TokenKind::NeqRegex),
                _ => return Err(self.error(start, "unexpected character after '!'")),
            },
            '<' => match self.peek().1 {
                '=' => self.advance_with(TokenKind::Lte),
                _ => TokenKind::Lss,
            },
            '>' => match self.peek().1 {
                '=' => self.advance_with(TokenKind::Gte),
                _ => TokenKind::Gtr,
            },
            c => return Err(self.error(start, format!("unexpected character {c:?}"))),
        };
        let end = self.peek().0;
        Ok(self.token(kind, start, end))
    }

    fn advance_with(&mut self, kind: TokenKind) -> TokenKind {
        self.iter.next();
        kind
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}
