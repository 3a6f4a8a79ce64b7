//! Tokeniser for script text.

use std::iter::Peekable;
use std::str::Chars;

use crate::ast::Location;
use crate::error::ScriptError;

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Keyword {
    If,
    Then,
    Else,
    End,
    For,
    In,
    Do,
    Number,
    Require,
    And,
    Or,
    Not,
    Sort,
    Permute,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "IF" => Keyword::If,
            "THEN" => Keyword::Then,
            "ELSE" => Keyword::Else,
            "END" => Keyword::End,
            "FOR" => Keyword::For,
            "IN" => Keyword::In,
            "DO" => Keyword::Do,
            "NUMBER" => Keyword::Number,
            "REQUIRE" => Keyword::Require,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "SORT" => Keyword::Sort,
            "PERMUTE" => Keyword::Permute,
            _ => return None,
        })
    }
}

/// Lexical token.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Keyword(Keyword),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Eof,
}

impl Token {
    /// Short description for parser messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(v) => format!("number {v}"),
            Token::Str(s) => format!("string \"{s}\""),
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Keyword(k) => format!("keyword {}", format!("{k:?}").to_uppercase()),
            Token::Eof => "end of script".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Assign => "=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            _ => "",
        }
    }
}

/// Token with the location of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// Token
    pub token: Token,
    /// Location
    pub location: Location,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    if ahead.next() != Some('/') {
                        return;
                    }
                    // line comment
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn take_while(&mut self, text: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(&c) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
    }

    fn number(&mut self, start: Location) -> Result<Token, ScriptError> {
        let mut text = String::new();
        self.take_while(&mut text, |c| c.is_ascii_digit());
        if self.chars.peek() == Some(&'.') {
            text.push('.');
            self.bump();
            self.take_while(&mut text, |c| c.is_ascii_digit());
        }
        if matches!(self.chars.peek(), Some('e' | 'E')) {
            let mut ahead = self.chars.clone();
            ahead.next();
            let exponent_follows = match ahead.next() {
                Some('+' | '-') => ahead.next().is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_follows {
                text.push('e');
                self.bump();
                if let Some(&(sign @ ('+' | '-'))) = self.chars.peek() {
                    text.push(sign);
                    self.bump();
                }
                self.take_while(&mut text, |c| c.is_ascii_digit());
            }
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ScriptError::parse(format!("invalid number '{text}'"), start))
    }

    fn string(&mut self, start: Location) -> Result<Token, ScriptError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Token::Str(text)),
                Some('\n') | None => {
                    return Err(ScriptError::parse("unterminated string literal", start))
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn next_token(&mut self) -> Result<Spanned, ScriptError> {
        self.skip_trivia();
        let location = self.location();
        let Some(&c) = self.chars.peek() else {
            return Ok(Spanned {
                token: Token::Eof,
                location,
            });
        };

        let token = if c.is_ascii_digit() || (c == '.' && self.digit_after_dot()) {
            self.number(location)?
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut word = String::new();
            self.take_while(&mut word, |c| c.is_ascii_alphanumeric() || c == '_');
            match Keyword::from_word(&word) {
                Some(k) => Token::Keyword(k),
                None => Token::Ident(word),
            }
        } else {
            self.bump();
            match c {
                '"' => self.string(location)?,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                ',' => Token::Comma,
                ';' => Token::Semicolon,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '=' if self.bump_if('=') => Token::EqEq,
                '=' => Token::Assign,
                '!' if self.bump_if('=') => Token::NotEq,
                '<' if self.bump_if('=') => Token::Le,
                '<' => Token::Lt,
                '>' if self.bump_if('=') => Token::Ge,
                '>' => Token::Gt,
                other => {
                    return Err(ScriptError::parse(
                        format!("unexpected character '{other}'"),
                        location,
                    ))
                }
            }
        };
        Ok(Spanned { token, location })
    }

    fn digit_after_dot(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().is_some_and(|c| c.is_ascii_digit())
    }
}

/// Splits script text into tokens, ending with [`Token::Eof`].
///
/// # Examples
///
/// ```
/// use pricer_script::lexer::{tokenize, Token};
///
/// let tokens = tokenize("x = 1.5e-1; // comment").unwrap();
/// let kinds: Vec<_> = tokens.into_iter().map(|t| t.token).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         Token::Ident("x".to_string()),
///         Token::Assign,
///         Token::Number(0.15),
///         Token::Semicolon,
///         Token::Eof,
///     ]
/// );
/// ```
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ScriptError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let spanned = lexer.next_token()?;
        let done = spanned.token == Token::Eof;
        tokens.push(spanned);
        if done {
            return Ok(tokens);
        }
    }
}
