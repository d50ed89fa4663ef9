use log::debug;
use thiserror::Error;

use super::{
    token::{KEYWORDS, ONE_SYMBOL_TOKENS, TWO_SYMBOLS_TOKENS},
    Position, Token, TokenKind,
};

#[derive(Clone, Debug, Error, PartialEq)]
#[error("{pos}: unrecognized character {character:?}")]
pub struct LexError {
    pub character: char,
    pub pos: Position,
}

#[derive(Debug)]
pub struct Lexer {
    tokens: Vec<Token>,
    index: usize,
    line: usize,
    line_start: usize,
}

impl Lexer {
    fn new() -> Self {
        Self {
            tokens: vec![],
            index: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.index - self.line_start + 1)
    }

    fn new_token(&mut self, kind: TokenKind, s: &str) {
        let pos = self.position();
        self.tokens.push(Token {
            kind,
            lexeme: s.to_string(),
            pos,
        });
        self.index += s.chars().count();
    }

    fn newline(&mut self) {
        self.index += 1;
        self.line += 1;
        self.line_start = self.index;
    }

    /// number = digit+ ("." digit+)?
    fn parse_number(&mut self, chars: &[char]) {
        let mut s: String = chars.iter().take_while(|c| c.is_ascii_digit()).collect();

        let fraction: String = chars[s.len()..]
            .iter()
            .skip(1)
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if chars.get(s.len()) == Some(&'.') && !fraction.is_empty() {
            s.push('.');
            s.push_str(&fraction);
        }

        self.new_token(TokenKind::Number, &s);
    }

    fn parse_identifier(&mut self, chars: &[char]) {
        let s: String = chars
            .iter()
            .take_while(|&&c| c.is_ascii_alphanumeric() || c == '_')
            .collect();

        if let Some(kind) = KEYWORDS.get(s.as_str()) {
            self.new_token(*kind, &s);
        } else {
            self.new_token(TokenKind::Ident, &s);
        }
    }

    fn parse_string(&mut self, chars: &[char]) -> Result<(), LexError> {
        let Some(len) = chars.iter().skip(1).position(|&c| c == '"') else {
            return Err(LexError {
                character: '"',
                pos: self.position(),
            });
        };

        let s: String = chars[..len + 2].iter().collect();
        self.new_token(TokenKind::String, &s);

        // string literals may span lines
        let mut line_start = None;
        for (i, c) in s.chars().enumerate() {
            if c == '\n' {
                self.line += 1;
                line_start = Some(i + 1);
            }
        }
        if let Some(offset) = line_start {
            self.line_start = self.index - s.chars().count() + offset;
        }
        Ok(())
    }

    fn _tokenize(&mut self, s: &str) -> Result<(), LexError> {
        let chars: Vec<_> = s.chars().collect();

        while self.index < chars.len() {
            let c = chars[self.index];
            let c2 = chars[self.index..].iter().take(2).collect::<String>();

            if c == '\n' {
                self.newline();
            } else if c.is_whitespace() {
                self.index += 1;
            } else if c.is_ascii_digit() {
                self.parse_number(&chars[self.index..]);
            } else if c.is_ascii_alphabetic() || c == '_' {
                self.parse_identifier(&chars[self.index..]);
            } else if c == '"' {
                self.parse_string(&chars[self.index..])?;
            } else if let Some(kind) = TWO_SYMBOLS_TOKENS.get(c2.as_str()) {
                self.new_token(*kind, &c2);
            } else if let Some(kind) = ONE_SYMBOL_TOKENS.get(&c) {
                self.new_token(*kind, &c.to_string());
            } else {
                return Err(LexError {
                    character: c,
                    pos: self.position(),
                });
            }
        }

        Ok(())
    }

    pub fn tokenize(s: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new();
        lexer._tokenize(s)?;
        debug!("lexed {} tokens over {} lines", lexer.tokens.len(), lexer.line);

        Ok(lexer.tokens)
    }
}
