use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{Error, Pos, Result};

/// Byte range in the source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// Identifier, possibly dotted: `foo`, `a.b.C`, `.a.b.C`
    Ident(String),
    Int(String),
    Float(String),
    /// Unescaped string value
    Str(String),
    Symbol(char),
    /// Raw comment text including its markers
    Comment(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub pos: Pos,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        match self {
            Ident(s)   => write!(f, "`{}`", s),
            Int(s)     => write!(f, "`{}`", s),
            Float(s)   => write!(f, "`{}`", s),
            Str(s)     => write!(f, "{:?}", s),
            Symbol(c)  => write!(f, "`{}`", c),
            Comment(_) => write!(f, "comment"),
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    col: usize,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer {
        src,
        chars: src.char_indices().peekable(),
        line: 1,
        col: 1,
    };

    let mut tokens = Vec::new();
    while let Some(tok) = lexer.next_token()? {
        tokens.push(tok);
    }
    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Lexer<'a> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.chars.clone();
        it.next();
        it.next().map(|(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        match self.chars.peek() {
            Some(&(i, _)) => i,
            None => self.src.len(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn pos(&self) -> Pos {
        Pos { line: self.line, col: self.col }
    }

    fn eat_while(&mut self, f: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !f(c) { break; }
            self.bump();
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.eat_while(char::is_whitespace);

        let pos = self.pos();
        let start = self.offset();
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(None),
        };

        let kind = match c {
            '/' if self.peek2() == Some('/') => {
                self.eat_while(|c| c != '\n');
                TokenKind::Comment(self.src[start .. self.offset()].trim_end().to_string())
            }
            '/' if self.peek2() == Some('*') => {
                self.bump();
                self.bump();
                self.block_comment(pos)?;
                TokenKind::Comment(self.src[start .. self.offset()].to_string())
            }
            '.' if self.peek2().map_or(false, |c| c.is_ascii_digit()) => {
                self.number()
            }
            '.' if self.peek2().map_or(false, is_ident_start) => self.ident(),
            c if is_ident_start(c) => self.ident(),
            c if c.is_ascii_digit() => self.number(),
            '"' | '\'' => self.string(pos)?,
            c if c.is_ascii_punctuation() => {
                self.bump();
                TokenKind::Symbol(c)
            }
            c => return Err(Error::UnexpectedChar(pos, c)),
        };

        let end = self.offset();
        Ok(Some(Token {
            kind,
            span: Span { start, end },
            pos,
        }))
    }

    fn block_comment(&mut self, pos: Pos) -> Result<()> {
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => (),
                None => return Err(Error::Unterminated(pos, "block comment")),
            }
        }
    }

    fn ident(&mut self) -> TokenKind {
        let start = self.offset();
        // Fully qualified names start with a dot
        if self.peek() == Some('.') {
            self.bump();
        }
        loop {
            self.eat_while(is_ident_char);
            // Dotted continuation `a.b`
            if self.peek() == Some('.') && self.peek2().map_or(false, is_ident_start) {
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Ident(self.src[start .. self.offset()].to_string())
    }

    fn number(&mut self) -> TokenKind {
        let start = self.offset();
        let mut float = false;

        if self.peek() == Some('0') && matches!(self.peek2(), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            self.eat_while(|c| c.is_ascii_hexdigit());
            return TokenKind::Int(self.src[start .. self.offset()].to_string());
        }

        self.eat_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            float = true;
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            float = true;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            self.eat_while(|c| c.is_ascii_digit());
        }
        // Trailing `f` is accepted by protoc in text-format option values
        if float && matches!(self.peek(), Some('f') | Some('F')) {
            self.bump();
        }
        // Anything glued to a number, e.g. `12abc`, is left for the parser to reject
        self.eat_while(is_ident_char);

        let text = self.src[start .. self.offset()].to_string();
        if float { TokenKind::Float(text) } else { TokenKind::Int(text) }
    }

    fn string(&mut self, pos: Pos) -> Result<TokenKind> {
        let quote = self.bump();
        let mut value = String::new();

        loop {
            let c = match self.bump() {
                Some('\n') | None => return Err(Error::Unterminated(pos, "string")),
                Some(c) => c,
            };

            if Some(c) == quote {
                return Ok(TokenKind::Str(value));
            }

            if c != '\\' {
                value.push(c);
                continue;
            }

            match self.bump() {
                Some('n') => value.push('\n'),
                Some('r') => value.push('\r'),
                Some('t') => value.push('\t'),
                Some('a') => value.push('\x07'),
                Some('b') => value.push('\x08'),
                Some('f') => value.push('\x0c'),
                Some('v') => value.push('\x0b'),
                Some('x') | Some('X') => {
                    let mut code = 0u32;
                    for _ in 0 .. 2 {
                        match self.peek().and_then(|c| c.to_digit(16)) {
                            Some(d) => { code = code * 16 + d; self.bump(); }
                            None => break,
                        }
                    }
                    value.push(char::from(code as u8));
                }
                Some(d @ '0' ..= '7') => {
                    let mut code = d as u32 - '0' as u32;
                    for _ in 0 .. 2 {
                        match self.peek().and_then(|c| c.to_digit(8)) {
                            Some(d) => { code = code * 8 + d; self.bump(); }
                            None => break,
                        }
                    }
                    value.push(char::from(code as u8));
                }
                Some(c) => value.push(c),
                None => return Err(Error::Unterminated(pos, "string")),
            }
        }
    }
}
