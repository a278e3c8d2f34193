//! Lexer for Lua level descriptions.
//!
//! Converts source text into a stream of [`Token`]s. Comments and whitespace
//! are dropped. Long brackets (`[[ ... ]]`, `[==[ ... ]==]`) are copied
//! verbatim: they carry map diagrams whose exact spacing matters.

use crate::diagnostic::{Diagnostic, Stage};
use crate::token::{Keyword, Symbol, Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

type LexResult<T> = Result<T, Diagnostic>;

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    pub fn tokenize(&mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        self.skip_shebang();

        loop {
            self.skip_trivia()?;

            if self.is_at_end() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    line: self.line,
                });
                break;
            }

            let start = self.pos;
            let line = self.line;
            let kind = self.lex_token()?;
            let lexeme = self.chars[start..self.pos].iter().collect();
            tokens.push(Token { kind, lexeme, line });
        }

        Ok(tokens)
    }

    fn lex_token(&mut self) -> LexResult<TokenKind> {
        let ch = self.peek();
        let kind = match ch {
            '"' | '\'' => self.lex_string(ch)?,
            '[' => match self.long_bracket_level() {
                Some(level) => self.lex_long_string(level)?,
                None => self.symbol(Symbol::LBracket, 1),
            },
            '0'..='9' => self.lex_number()?,
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number()?,
            'a'..='z' | 'A'..='Z' | '_' => self.lex_word(),
            _ => self.lex_symbol()?,
        };
        Ok(kind)
    }

    fn lex_symbol(&mut self) -> LexResult<TokenKind> {
        let ch = self.peek();
        let next = self.peek_at(1);
        let kind = match (ch, next) {
            ('.', Some('.')) if self.peek_at(2) == Some('.') => self.symbol(Symbol::Ellipsis, 3),
            ('.', Some('.')) => self.symbol(Symbol::DotDot, 2),
            ('.', _) => self.symbol(Symbol::Dot, 1),
            ('=', Some('=')) => self.symbol(Symbol::Eq, 2),
            ('=', _) => self.symbol(Symbol::Assign, 1),
            ('~', Some('=')) => self.symbol(Symbol::NotEq, 2),
            ('<', Some('=')) => self.symbol(Symbol::LtEq, 2),
            ('>', Some('=')) => self.symbol(Symbol::GtEq, 2),
            ('<', Some('<')) | ('>', Some('>')) | ('&', _) | ('|', _) | ('~', _) => {
                return Err(self.error("bitwise operators are not supported"));
            }
            ('<', _) => self.symbol(Symbol::Lt, 1),
            ('>', _) => self.symbol(Symbol::Gt, 1),
            ('/', Some('/')) => self.symbol(Symbol::DoubleSlash, 2),
            ('/', _) => self.symbol(Symbol::Slash, 1),
            (':', Some(':')) => {
                return Err(self.error("labels (`::name::`) are not supported"));
            }
            (':', _) => self.symbol(Symbol::Colon, 1),
            ('+', _) => self.symbol(Symbol::Plus, 1),
            ('-', _) => self.symbol(Symbol::Minus, 1),
            ('*', _) => self.symbol(Symbol::Star, 1),
            ('%', _) => self.symbol(Symbol::Percent, 1),
            ('^', _) => self.symbol(Symbol::Caret, 1),
            ('#', _) => self.symbol(Symbol::Hash, 1),
            ('(', _) => self.symbol(Symbol::LParen, 1),
            (')', _) => self.symbol(Symbol::RParen, 1),
            ('{', _) => self.symbol(Symbol::LBrace, 1),
            ('}', _) => self.symbol(Symbol::RBrace, 1),
            (']', _) => self.symbol(Symbol::RBracket, 1),
            (';', _) => self.symbol(Symbol::Semicolon, 1),
            (',', _) => self.symbol(Symbol::Comma, 1),
            _ => return Err(self.error(format!("unexpected character: '{ch}'"))),
        };
        Ok(kind)
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::fatal(Stage::Lex, self.line, message)
    }

    fn symbol(&mut self, symbol: Symbol, width: usize) -> TokenKind {
        for _ in 0..width {
            self.advance();
        }
        TokenKind::Symbol(symbol)
    }

    fn skip_shebang(&mut self) {
        if self.chars.starts_with(&['#', '!']) {
            while !self.is_at_end() && self.peek() != '\n' {
                self.advance();
            }
        }
    }

    /// Skip whitespace and comments until the next token or end of input.
    fn skip_trivia(&mut self) -> LexResult<()> {
        while !self.is_at_end() {
            let ch = self.peek();
            if ch.is_ascii_whitespace() || ch == '\x0b' {
                self.advance();
            } else if ch == '-' && self.peek_at(1) == Some('-') {
                self.skip_comment()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn skip_comment(&mut self) -> LexResult<()> {
        let line = self.line;
        self.advance();
        self.advance();

        if !self.is_at_end() && self.peek() == '[' {
            if let Some(level) = self.long_bracket_level() {
                self.pos += level + 2;
                return match self.find_long_close(level) {
                    Some(()) => Ok(()),
                    None => Err(Diagnostic::fatal(
                        Stage::Lex,
                        line,
                        "unterminated block comment",
                    )),
                };
            }
        }

        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
        Ok(())
    }

    /// If the cursor sits on an opening long bracket, return its level
    /// (the number of `=` signs).
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek_at(0) != Some('[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some('=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some('[')).then_some(level)
    }

    /// Consume everything up to and including the closing bracket of the
    /// given level. Returns `None` at end of input.
    fn find_long_close(&mut self, level: usize) -> Option<()> {
        while !self.is_at_end() {
            if self.peek() == ']' && self.closes_long_bracket(level) {
                self.pos += level + 2;
                return Some(());
            }
            self.advance();
        }
        None
    }

    fn closes_long_bracket(&self, level: usize) -> bool {
        (1..=level).all(|i| self.peek_at(i) == Some('=')) && self.peek_at(level + 1) == Some(']')
    }

    fn lex_long_string(&mut self, level: usize) -> LexResult<TokenKind> {
        let line = self.line;
        self.pos += level + 2;
        let start = self.pos;

        while !self.is_at_end() {
            if self.peek() == ']' && self.closes_long_bracket(level) {
                let content = self.chars[start..self.pos].iter().collect();
                self.pos += level + 2;
                return Ok(TokenKind::LongString { content, level });
            }
            self.advance();
        }

        Err(Diagnostic::fatal(
            Stage::Lex,
            line,
            "unterminated long string",
        ))
    }

    fn lex_string(&mut self, quote: char) -> LexResult<TokenKind> {
        let line = self.line;
        self.advance(); // opening quote
        // Escapes name bytes, not characters.
        let mut value = Vec::new();

        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return Err(Diagnostic::fatal(
                    Stage::Lex,
                    line,
                    "unterminated string literal",
                ));
            }
            let ch = self.advance();
            if ch == quote {
                break;
            }
            if ch == '\\' {
                self.lex_escape(&mut value)?;
            } else {
                push_char(&mut value, ch);
            }
        }

        String::from_utf8(value).map(TokenKind::String).map_err(|_| {
            Diagnostic::fatal(Stage::Lex, line, "string literal is not valid UTF-8")
        })
    }

    fn lex_escape(&mut self, value: &mut Vec<u8>) -> LexResult<()> {
        if self.is_at_end() {
            return Err(self.error("unterminated string literal"));
        }
        let ch = self.advance();
        match ch {
            'n' | '\n' => value.push(b'\n'),
            't' => value.push(b'\t'),
            'r' => value.push(b'\r'),
            'a' => value.push(0x07),
            'b' => value.push(0x08),
            'f' => value.push(0x0c),
            'v' => value.push(0x0b),
            '\\' | '"' | '\'' => push_char(value, ch),
            'z' => {
                while !self.is_at_end() && self.peek().is_ascii_whitespace() {
                    self.advance();
                }
            }
            'x' => {
                let mut code = 0u32;
                for _ in 0..2 {
                    let digit = self
                        .peek_at(0)
                        .and_then(|c| c.to_digit(16))
                        .ok_or_else(|| self.error("invalid `\\x` escape"))?;
                    self.advance();
                    code = code * 16 + digit;
                }
                value.push(code as u8);
            }
            'u' => {
                if self.peek_at(0) != Some('{') {
                    return Err(self.error("invalid `\\u` escape"));
                }
                self.advance();
                let mut code = 0u32;
                let mut digits = 0;
                while let Some(digit) = self.peek_at(0).and_then(|c| c.to_digit(16)) {
                    self.advance();
                    code = code.saturating_mul(16).saturating_add(digit);
                    digits += 1;
                }
                if digits == 0 || self.peek_at(0) != Some('}') {
                    return Err(self.error("invalid `\\u` escape"));
                }
                self.advance();
                let decoded =
                    char::from_u32(code).ok_or_else(|| self.error("invalid `\\u` escape"))?;
                push_char(value, decoded);
            }
            '0'..='9' => {
                let mut code = ch.to_digit(10).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek_at(0).and_then(|c| c.to_digit(10)) {
                        Some(digit) => {
                            self.advance();
                            code = code * 10 + digit;
                        }
                        None => break,
                    }
                }
                if code > 255 {
                    return Err(self.error("decimal escape too large"));
                }
                value.push(code as u8);
            }
            _ => return Err(self.error(format!("invalid escape sequence `\\{ch}`"))),
        }
        Ok(())
    }

    fn lex_number(&mut self) -> LexResult<TokenKind> {
        let start = self.pos;

        let value = if self.peek() == '0' && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.advance();
            self.advance();
            let digits_start = self.pos;
            while !self.is_at_end() && self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            u64::from_str_radix(&digits, 16)
                .map(|v| v as f64)
                .map_err(|_| self.error("malformed hexadecimal number"))?
        } else {
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                self.advance();
            }
            if !self.is_at_end() && self.peek() == '.' && self.peek_at(1) != Some('.') {
                self.advance();
                while !self.is_at_end() && self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
            if !self.is_at_end() && matches!(self.peek(), 'e' | 'E') {
                self.advance();
                if !self.is_at_end() && matches!(self.peek(), '+' | '-') {
                    self.advance();
                }
                while !self.is_at_end() && self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
            let text: String = self.chars[start..self.pos].iter().collect();
            text.parse::<f64>()
                .map_err(|_| self.error(format!("malformed number: {text}")))?
        };

        if !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            let text: String = self.chars[start..=self.pos].iter().collect();
            return Err(self.error(format!("malformed number near `{text}`")));
        }

        Ok(TokenKind::Number(value))
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            self.advance();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match Keyword::from_word(&word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(word),
        }
    }
}

/// Convenience wrapper around [`Lexer::tokenize`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, Diagnostic> {
    Lexer::new(source).tokenize()
}

fn push_char(bytes: &mut Vec<u8>, ch: char) {
    let mut buf = [0; 4];
    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}
