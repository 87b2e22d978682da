//! Tokenizer for fixture sources and type annotations

use std::fmt;

use super::FixtureError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Regex(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    /// `{|`
    LBracePipe,
    /// `|}`
    PipeRBrace,
    Lt,
    Gt,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Ellipsis,
    Question,
    Pipe,
    Ampersand,
    Plus,
    Equals,
    /// `=>`
    FatArrow,
    /// `/>`
    SlashGt,
    Star,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Regex(r) => write!(f, "/{}/", r),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBracePipe => write!(f, "{{|"),
            Token::PipeRBrace => write!(f, "|}}"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
            Token::Ellipsis => write!(f, "..."),
            Token::Question => write!(f, "?"),
            Token::Pipe => write!(f, "|"),
            Token::Ampersand => write!(f, "&"),
            Token::Plus => write!(f, "+"),
            Token::Equals => write!(f, "="),
            Token::FatArrow => write!(f, "=>"),
            Token::SlashGt => write!(f, "/>"),
            Token::Star => write!(f, "*"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// A token with the position of its first character
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// A `//` comment
#[derive(Debug, Clone, PartialEq)]
pub struct LineComment {
    pub line: usize,
    pub column: usize,
    /// Text after the `//`
    pub text: String,
    /// False when code precedes the comment on its line
    pub own_line: bool,
}

/// Output of [`Lexer::tokenize`]
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Spanned>,
    pub comments: Vec<LineComment>,
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    /// Line of the last token emitted, to tell comment-only lines apart
    last_token_line: usize,
    comments: Vec<LineComment>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            last_token_line: 0,
            comments: Vec::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> FixtureError {
        FixtureError::new(line, column, message)
    }

    /// Skip whitespace and comments, recording every `//` comment
    fn skip_trivia(&mut self) -> Result<(), FixtureError> {
        loop {
            match (self.current(), self.peek(1)) {
                (Some(ch), _) if ch.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    let mut text = String::new();
                    while let Some(ch) = self.current() {
                        if ch == '\n' {
                            break;
                        }
                        text.push(ch);
                        self.advance();
                    }
                    let own_line = self.last_token_line != line;
                    self.comments.push(LineComment {
                        line,
                        column,
                        text,
                        own_line,
                    });
                }
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') if self.current() == Some('/') => {
                                self.advance();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(self.error(line, column, "Unclosed block comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_string(&mut self, quote: char) -> Result<String, FixtureError> {
        let (line, column) = (self.line, self.column);
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current() {
            if ch == quote {
                self.advance();
                return Ok(result);
            } else if ch == '\n' {
                break;
            } else if ch == '\\' {
                self.advance();
                match self.advance() {
                    Some('n') => result.push('\n'),
                    Some('t') => result.push('\t'),
                    Some(c) => result.push(c),
                    None => break,
                }
            } else {
                result.push(ch);
                self.advance();
            }
        }
        Err(self.error(line, column, "Unclosed string literal"))
    }

    fn read_regex(&mut self) -> Result<String, FixtureError> {
        let (line, column) = (self.line, self.column);
        let mut body = String::new();
        self.advance(); // opening slash

        let mut in_class = false;
        loop {
            match self.current() {
                Some('\\') => {
                    body.push('\\');
                    self.advance();
                    if let Some(c) = self.advance() {
                        body.push(c);
                    }
                }
                Some('[') => {
                    in_class = true;
                    body.push('[');
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    body.push(']');
                    self.advance();
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some('\n') | None => {
                    return Err(self.error(line, column, "Unclosed regular expression"))
                }
                Some(c) => {
                    body.push(c);
                    self.advance();
                }
            }
        }
        // flags
        while let Some(c) = self.current() {
            if c.is_ascii_alphabetic() {
                self.advance();
            } else {
                break;
            }
        }
        Ok(body)
    }

    fn read_number(&mut self) -> Result<f64, FixtureError> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        while let Some(ch) = self.current() {
            let fraction = ch == '.' && self.peek(1).is_some_and(|c| c.is_ascii_digit());
            if ch.is_ascii_digit() || ch == '_' || fraction {
                if ch != '_' {
                    text.push(ch);
                }
                self.advance();
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map_err(|_| self.error(line, column, format!("Invalid number literal: {}", text)))
    }

    fn read_ident(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current() {
            if is_ident_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    pub fn next_token(&mut self) -> Result<Spanned, FixtureError> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);

        let Some(ch) = self.current() else {
            return Ok(Spanned {
                token: Token::Eof,
                line,
                column,
            });
        };

        let token = match ch {
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            '}' => self.single(Token::RBrace),
            '{' => {
                self.advance();
                if self.current() == Some('|') {
                    self.advance();
                    Token::LBracePipe
                } else {
                    Token::LBrace
                }
            }
            '|' => {
                self.advance();
                if self.current() == Some('}') {
                    self.advance();
                    Token::PipeRBrace
                } else {
                    Token::Pipe
                }
            }
            '=' => {
                self.advance();
                if self.current() == Some('>') {
                    self.advance();
                    Token::FatArrow
                } else {
                    Token::Equals
                }
            }
            '.' => {
                if self.peek(1) == Some('.') && self.peek(2) == Some('.') {
                    self.advance();
                    self.advance();
                    self.advance();
                    Token::Ellipsis
                } else {
                    self.single(Token::Dot)
                }
            }
            '/' => {
                if self.peek(1) == Some('>') {
                    self.advance();
                    self.advance();
                    Token::SlashGt
                } else {
                    Token::Regex(self.read_regex()?)
                }
            }
            '<' => self.single(Token::Lt),
            '>' => self.single(Token::Gt),
            ',' => self.single(Token::Comma),
            ';' => self.single(Token::Semicolon),
            ':' => self.single(Token::Colon),
            '?' => self.single(Token::Question),
            '&' => self.single(Token::Ampersand),
            '+' => self.single(Token::Plus),
            '*' => self.single(Token::Star),
            '\'' | '"' => Token::Str(self.read_string(ch)?),
            c if c.is_ascii_digit() => Token::Number(self.read_number()?),
            c if is_ident_start(c) => Token::Ident(self.read_ident()),
            c => return Err(self.error(line, column, format!("Unexpected character: {}", c))),
        };

        self.last_token_line = self.line;
        Ok(Spanned {
            token,
            line,
            column,
        })
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    pub fn tokenize(mut self) -> Result<Lexed, FixtureError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }
        Ok(Lexed {
            tokens,
            comments: self.comments,
        })
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}
