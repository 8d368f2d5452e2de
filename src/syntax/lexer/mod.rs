use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};
use crate::syntax::lexeme::Lexeme;

/// Suffixes that make a numeric literal a float.
const FLOAT_SUFFIXES: &[&str] = &["f", "F", "d", "D", "f32", "f64"];

/// Suffixes accepted on integer literals.
const INT_SUFFIXES: &[&str] = &["u", "U", "u32", "i32", "usize", "isize"];

pub(crate) struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Lexeme> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return self.make_token(Lexeme::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.source[self.pos];

            if is_ident_start(ch) {
                return self.scan_ident_or_keyword();
            }

            if ch.is_ascii_digit() {
                return self.scan_number();
            }

            if let Some(tok) = self.scan_symbol(start) {
                return tok;
            }
            // scan_symbol returned None → error was recorded, try again
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.starts_with(b"//") {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            if self.starts_with(b"/*") {
                self.skip_block_comment();
                continue;
            }

            break;
        }
    }

    /// Block comments nest, as in Rust.
    fn skip_block_comment(&mut self) {
        let start = self.pos;
        let mut depth = 0u32;
        while self.pos < self.source.len() {
            if self.starts_with(b"/*") {
                depth += 1;
                self.pos += 2;
            } else if self.starts_with(b"*/") {
                depth -= 1;
                self.pos += 2;
                if depth == 0 {
                    return;
                }
            } else {
                self.pos += 1;
            }
        }
        self.diagnostics.push(Diagnostic::error(
            "unterminated block comment".to_string(),
            Span::new(start as u32, self.pos as u32),
        ));
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        let text = self.scan_ident_text();
        let token = Lexeme::from_keyword(text).unwrap_or_else(|| Lexeme::Ident(text.to_string()));
        self.make_token(token, start, self.pos)
    }

    fn scan_ident_text(&mut self) -> &'src str {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        // Identifier bytes are ASCII by construction.
        std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default()
    }

    fn scan_number(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        let mut is_float = false;

        let radix_prefix = self.starts_with(b"0x") || self.starts_with(b"0b") || self.starts_with(b"0o");
        if radix_prefix {
            let radix = match self.source[start + 1] {
                b'x' => 16,
                b'o' => 8,
                _ => 2,
            };
            self.pos += 2;
            let digits_at = self.pos;
            while self
                .peek()
                .is_some_and(|c| c == b'_' || char::from(c).is_digit(radix))
            {
                self.pos += 1;
            }
            if let Some(c) = self.peek().filter(u8::is_ascii_digit) {
                let bad = self.pos;
                self.skip_digits();
                self.diagnostics.push(Diagnostic::error(
                    format!("invalid digit `{}` for a base {} literal", char::from(c), radix),
                    Span::new(bad as u32, bad as u32 + 1),
                ));
            } else if self.source[digits_at..self.pos].iter().all(|&c| c == b'_') {
                self.diagnostics.push(Diagnostic::error(
                    "no valid digits found for number".to_string(),
                    Span::new(start as u32, self.pos as u32),
                ));
            }
        } else {
            self.skip_digits();

            // `1.5` and `1.` are floats; `1..n` and `1.max(2)` are not.
            if self.peek() == Some(b'.') {
                match self.peek_at(1) {
                    Some(c) if c.is_ascii_digit() => {
                        self.pos += 1;
                        self.skip_digits();
                        is_float = true;
                    }
                    Some(c) if c == b'.' || is_ident_start(c) => {}
                    _ => {
                        self.pos += 1;
                        is_float = true;
                    }
                }
            }

            if matches!(self.peek(), Some(b'e' | b'E')) {
                let exp_digits_at = match self.peek_at(1) {
                    Some(b'+' | b'-') => 2,
                    _ => 1,
                };
                if self.peek_at(exp_digits_at).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += exp_digits_at;
                    self.skip_digits();
                    is_float = true;
                }
            }
        }

        let text_end = self.pos;
        let text = String::from_utf8_lossy(&self.source[start..text_end]).into_owned();

        let suffix = if self.peek().is_some_and(is_ident_start) {
            Some(self.scan_ident_text().to_string())
        } else {
            None
        };

        let token = match suffix.as_deref() {
            None => Self::number_token(text, None, is_float),
            Some(s) if FLOAT_SUFFIXES.contains(&s) && !radix_prefix => {
                Self::number_token(text, suffix, true)
            }
            Some(s) if INT_SUFFIXES.contains(&s) && !is_float => {
                Self::number_token(text, suffix, false)
            }
            Some(s) => {
                self.diagnostics.push(
                    Diagnostic::error(
                        format!("invalid suffix `{}` for number literal", s),
                        Span::new(text_end as u32, self.pos as u32),
                    )
                    .with_help(
                        "kernel literals accept f32, f64, f, d, u32, i32 and u suffixes"
                            .to_string(),
                    ),
                );
                Self::number_token(text, None, is_float)
            }
        };
        self.make_token(token, start, self.pos)
    }

    fn number_token(text: String, suffix: Option<String>, is_float: bool) -> Lexeme {
        if is_float {
            Lexeme::Float { text, suffix }
        } else {
            Lexeme::Integer { text, suffix }
        }
    }

    fn skip_digits(&mut self) {
        while self.pos < self.source.len()
            && (self.source[self.pos].is_ascii_digit() || self.source[self.pos] == b'_')
        {
            self.pos += 1;
        }
    }

    fn scan_symbol(&mut self, start: usize) -> Option<Spanned<Lexeme>> {
        let ch = self.source[self.pos];
        self.pos += 1;

        let token = match ch {
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'{' => Lexeme::LBrace,
            b'}' => Lexeme::RBrace,
            b'[' => Lexeme::LBracket,
            b']' => Lexeme::RBracket,
            b',' => Lexeme::Comma,
            b';' => Lexeme::Semicolon,
            b':' => self.pick(b':', Lexeme::ColonColon, Lexeme::Colon),
            b'.' => {
                if self.peek() == Some(b'.') {
                    self.pos += 1;
                    self.pick(b'=', Lexeme::DotDotEq, Lexeme::DotDot)
                } else {
                    Lexeme::Dot
                }
            }
            b'|' => {
                if self.peek() == Some(b'|') {
                    self.pos += 1;
                    Lexeme::PipePipe
                } else {
                    self.pick(b'=', Lexeme::PipeEq, Lexeme::Pipe)
                }
            }
            b'&' => {
                if self.peek() == Some(b'&') {
                    self.pos += 1;
                    Lexeme::AmpAmp
                } else {
                    self.pick(b'=', Lexeme::AmpEq, Lexeme::Amp)
                }
            }
            b'^' => self.pick(b'=', Lexeme::CaretEq, Lexeme::Caret),
            b'!' => self.pick(b'=', Lexeme::BangEq, Lexeme::Bang),
            b'=' => self.pick(b'=', Lexeme::EqEq, Lexeme::Eq),
            b'<' => {
                if self.peek() == Some(b'<') {
                    self.pos += 1;
                    self.pick(b'=', Lexeme::ShlEq, Lexeme::Shl)
                } else {
                    self.pick(b'=', Lexeme::Le, Lexeme::Lt)
                }
            }
            b'>' => {
                if self.peek() == Some(b'>') {
                    self.pos += 1;
                    self.pick(b'=', Lexeme::ShrEq, Lexeme::Shr)
                } else {
                    self.pick(b'=', Lexeme::Ge, Lexeme::Gt)
                }
            }
            b'+' => self.pick(b'=', Lexeme::PlusEq, Lexeme::Plus),
            b'-' => self.pick(b'=', Lexeme::MinusEq, Lexeme::Minus),
            b'*' => self.pick(b'=', Lexeme::StarEq, Lexeme::Star),
            b'/' => self.pick(b'=', Lexeme::SlashEq, Lexeme::Slash),
            b'%' => self.pick(b'=', Lexeme::PercentEq, Lexeme::Percent),
            _ => {
                // Skip the whole UTF-8 sequence so spans stay on char boundaries.
                while self.pos < self.source.len() && (self.source[self.pos] & 0xC0) == 0x80 {
                    self.pos += 1;
                }
                let shown = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
                self.diagnostics.push(
                    Diagnostic::error(
                        format!("unexpected character '{}'", shown),
                        Span::new(start as u32, self.pos as u32),
                    )
                    .with_help(
                        "this character is not part of the kernel body language".to_string(),
                    ),
                );
                return None;
            }
        };

        Some(self.make_token(token, start, self.pos))
    }

    /// Consume `next` if present and return `long`, otherwise `short`.
    fn pick(&mut self, next: u8, long: Lexeme, short: Lexeme) -> Lexeme {
        if self.peek() == Some(next) {
            self.pos += 1;
            long
        } else {
            short
        }
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.source[self.pos..].starts_with(prefix)
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
