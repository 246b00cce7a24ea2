use std::borrow::Cow;
use std::char;
use std::fmt;
use std::iter;
use std::str;
use std::sync::Arc;
use thiserror::Error;
use wastir_ir::Location;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("unterminated block comment")]
    UnterminatedBlockComment,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected char {0:?}")]
    UnexpectedCharacter(char),
    #[error("control character in string literal")]
    ControlCharInString,
    #[error(r#"bad escape in string literal. it must be one of \t, \n, \r, \", \', \\, \u{{hexnum}}, \MN"#)]
    InvalidEscape,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sign::Plus => f.write_str("+"),
            Sign::Minus => f.write_str("-"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NumBase {
    Hex,
    Dec,
}

impl NumBase {
    pub fn radix(self) -> u32 {
        match self {
            NumBase::Hex => 16,
            NumBase::Dec => 10,
        }
    }
}

// https://webassembly.github.io/spec/core/text/values.html#floating-point
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Float<'source> {
    // Payload of `nan:0x...` without the prefix
    Nan(Option<&'source str>),
    Inf,
    Val {
        base: NumBase,
        frac: &'source str,
        exp: Option<(Sign, &'source str)>,
    },
}

// https://webassembly.github.io/spec/core/text/lexical.html#tokens
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind<'source> {
    LParen,
    RParen,
    // `(@name`
    LParenAnnotation(&'source str),
    Keyword(&'source str), // Too many keywords so it's not pragmatic to define `Keyword` enum in terms of maintenance
    // Integer written without sign
    Nat(NumBase, &'source str),
    Int(Sign, NumBase, &'source str),
    Float(Sign, Float<'source>),
    String(Cow<'source, [u8]>),
    // Identifier without leading '$'
    Ident(&'source str),
    Reserved(&'source str),
    Eof,
}

// Payload-free view of a token kind used for lookahead decisions
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenType<'source> {
    LParen,
    RParen,
    LParenAnnotation(&'source str),
    Keyword(&'source str),
    Nat,
    Int,
    Float,
    String,
    Ident,
    Reserved,
    Eof,
}

impl<'s> TokenKind<'s> {
    pub fn token_type(&self) -> TokenType<'s> {
        match self {
            TokenKind::LParen => TokenType::LParen,
            TokenKind::RParen => TokenType::RParen,
            TokenKind::LParenAnnotation(name) => TokenType::LParenAnnotation(name),
            TokenKind::Keyword(kw) => TokenType::Keyword(kw),
            TokenKind::Nat(..) => TokenType::Nat,
            TokenKind::Int(..) => TokenType::Int,
            TokenKind::Float(..) => TokenType::Float,
            TokenKind::String(_) => TokenType::String,
            TokenKind::Ident(_) => TokenType::Ident,
            TokenKind::Reserved(_) => TokenType::Reserved,
            TokenKind::Eof => TokenType::Eof,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token<'source> {
    pub kind: TokenKind<'source>,
    // Source text of the token. Empty at end of input.
    pub text: &'source str,
    pub loc: Location,
}

impl<'s> Token<'s> {
    pub fn token_type(&self) -> TokenType<'s> {
        self.kind.token_type()
    }
}

impl<'s> fmt::Display for Token<'s> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_LEN: usize = 80;
        if self.kind == TokenKind::Eof {
            return f.write_str("EOF");
        }
        match self.text.char_indices().nth(MAX_LEN) {
            Some((i, _)) => write!(f, "{}...", &self.text[..i]),
            None => f.write_str(self.text),
        }
    }
}

// Pull-based source of tokens consumed by the parser. Once the input is exhausted, `Eof` tokens are
// returned forever. After returning an error the source must be able to continue from a later
// position.
pub trait TokenSource<'s> {
    fn next_token(&mut self) -> Result<Token<'s>, LexError>;
}

#[derive(Clone)]
pub struct Lexer<'source> {
    chars: iter::Peekable<str::CharIndices<'source>>, // LL(1)
    source: &'source str,
    file: Option<Arc<str>>,
    line_starts: Vec<usize>,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Lexer<'s> {
        let line_starts = iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Lexer {
            source,
            chars: source.char_indices().peekable(),
            file: None,
            line_starts,
        }
    }

    pub fn with_file(source: &'s str, file: impl Into<Arc<str>>) -> Lexer<'s> {
        let mut lexer = Self::new(source);
        lexer.file = Some(file.into());
        lexer
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn location(&self, start: usize, end: usize) -> Location {
        let line_idx = match self.line_starts.binary_search(&start) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx];
        let first_column = (start - line_start) as u32 + 1;
        let last_column = (end.max(start + 1) - line_start) as u32;
        Location::new(self.file.clone(), line_idx as u32 + 1, first_column, last_column)
    }

    pub fn lex(&mut self) -> Result<Token<'s>, LexError> {
        while self.eat_whitespace()? {}

        // https://webassembly.github.io/spec/core/text/lexical.html#tokens
        let start = self.offset();
        let kind = if let Some(kind) = self.lex_paren() {
            kind
        } else if let Some(kind) = self.lex_string()? {
            kind
        } else if let Some(kind) = self.lex_idchars() {
            // id, keyword, reserved, number
            kind
        } else if let Some((offset, c)) = self.chars.next() {
            // Consume the character so that lexing can continue after the error
            return self.fail(LexErrorKind::UnexpectedCharacter(c), offset);
        } else {
            TokenKind::Eof
        };

        let end = self.offset();
        Ok(Token {
            kind,
            text: &self.source[start..end],
            loc: self.location(start, end),
        })
    }

    fn lex_paren(&mut self) -> Option<TokenKind<'s>> {
        if self.eat_char('(').is_some() {
            if self.eat_char('@').is_some() {
                let start = self.offset();
                let end = self.eat_idchars();
                if start == end {
                    return Some(TokenKind::Reserved("(@"));
                }
                return Some(TokenKind::LParenAnnotation(&self.source[start..end]));
            }
            Some(TokenKind::LParen)
        } else {
            self.eat_char(')').map(|_| TokenKind::RParen)
        }
    }

    fn lex_string(&mut self) -> Result<Option<TokenKind<'s>>, LexError> {
        // https://webassembly.github.io/spec/core/text/values.html#strings
        let start = match self.eat_char('"') {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let mut buf = vec![];
        let mut error = None;
        while let Some((i, c)) = self.chars.next() {
            match c {
                '"' => {
                    if let Some(kind) = error {
                        return self.fail(kind, start);
                    }
                    let content = if buf.is_empty() {
                        // When no escape is included in string literal, keep slice without copy
                        // omitting the first and last double quotes
                        Cow::Borrowed(self.source[start + 1..i].as_bytes())
                    } else {
                        Cow::Owned(buf)
                    };
                    return Ok(Some(TokenKind::String(content)));
                }
                '\\' => {
                    if buf.is_empty() {
                        // The first escaped character. Content is different from the source from
                        // here so it needs its own buffer. Note that `+ 1` omits the first '"'
                        buf.extend_from_slice(self.source[start + 1..i].as_bytes());
                    }
                    if let Err(kind) = self.lex_escape(&mut buf) {
                        // Remember the error and skip to the closing quote
                        error.get_or_insert(kind);
                    }
                }
                '\n' => break,
                _ if c.is_ascii_control() => {
                    error.get_or_insert(LexErrorKind::ControlCharInString);
                }
                _ if !buf.is_empty() => {
                    let mut b = [0; 4];
                    buf.extend_from_slice(c.encode_utf8(&mut b).as_bytes());
                }
                _ => { /* Have not seen any escape chars yet */ }
            }
        }

        self.fail(LexErrorKind::UnterminatedString, start)
    }

    fn lex_escape(&mut self, buf: &mut Vec<u8>) -> Result<(), LexErrorKind> {
        match self.chars.peek().copied() {
            Some((_, 't')) => buf.push(b'\t'),
            Some((_, 'n')) => buf.push(b'\n'),
            Some((_, 'r')) => buf.push(b'\r'),
            Some((_, '"')) => buf.push(b'"'),
            Some((_, '\'')) => buf.push(b'\''),
            Some((_, '\\')) => buf.push(b'\\'),
            Some((_, 'u')) => {
                self.chars.next();
                if self.eat_char('{').is_none() {
                    return Err(LexErrorKind::InvalidEscape);
                }
                let brace_start = self.offset();
                while self.eat_char_by(|c| c.is_ascii_hexdigit() || c == '_') {}
                let brace_end = self.offset();
                if self.eat_char('}').is_none() {
                    return Err(LexErrorKind::InvalidEscape);
                }
                let hex: String = self.source[brace_start..brace_end]
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                let c = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(LexErrorKind::InvalidEscape)?;
                let mut b = [0; 4];
                buf.extend_from_slice(c.encode_utf8(&mut b).as_bytes());
                return Ok(());
            }
            Some((_, c)) if c.is_ascii_hexdigit() => {
                self.chars.next();
                let hi = c.to_digit(16).unwrap_or(0);
                match self.chars.peek().and_then(|(_, c)| c.to_digit(16)) {
                    Some(lo) => buf.push((hi * 16 + lo) as u8),
                    None => return Err(LexErrorKind::InvalidEscape),
                }
            }
            Some((_, '\n')) | None => return Err(LexErrorKind::InvalidEscape),
            Some(_) => {
                self.chars.next();
                return Err(LexErrorKind::InvalidEscape);
            }
        }
        self.chars.next();
        Ok(())
    }

    // Consumes a run of idchars and returns the end offset
    fn eat_idchars(&mut self) -> usize {
        fn is_idchar(c: char) -> bool {
            // https://webassembly.github.io/spec/core/text/values.html#text-idchar
            matches!(c,
                '0'..='9'
                | 'a'..='z'
                | 'A'..='Z'
                | '!'
                | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '.'
                | '/'
                | ':'
                | '<'
                | '='
                | '>'
                | '?'
                | '@'
                | '\\'
                | '^'
                | '_'
                | '`'
                | '|'
                | '~'
            )
        }

        while self.eat_char_by(is_idchar) {}
        self.offset()
    }

    fn lex_idchars(&mut self) -> Option<TokenKind<'s>> {
        let start = self.offset();
        let end = self.eat_idchars();
        if start == end {
            return None;
        }

        // Note: Number must be lexed before keyword for 'inf' and 'nan'
        let idchars = &self.source[start..end];
        if let Some(kind) = Self::lex_number(idchars) {
            return Some(kind);
        }
        if let Some(kind) = Self::lex_ident_or_keyword(idchars) {
            return Some(kind);
        }

        // https://webassembly.github.io/spec/core/text/lexical.html#text-reserved
        Some(TokenKind::Reserved(idchars))
    }

    fn is_num<F: Fn(&char) -> bool>(s: &str, pred: F) -> bool {
        if s.is_empty() {
            return false;
        }
        let mut prev_underscore = true; // true because number cannot start with '_'
        for c in s.chars() {
            match c {
                '_' if prev_underscore => return false,
                '_' => prev_underscore = true,
                _ if pred(&c) => prev_underscore = false,
                _ => return false,
            }
        }
        !prev_underscore
    }

    fn lex_unsigned_number(idchars: &'s str, sign: Option<Sign>, base: NumBase) -> Option<TokenKind<'s>> {
        // https://webassembly.github.io/spec/core/text/values.html#integers
        // https://webassembly.github.io/spec/core/text/values.html#floating-point

        #[derive(PartialEq, Eq)]
        enum PrevChar {
            Dot,
            Underscore,
            Digit,
        }

        let (is_digit, exp_chars): (fn(&char) -> bool, [char; 2]) = match base {
            NumBase::Hex => (char::is_ascii_hexdigit, ['p', 'P']),
            NumBase::Dec => (char::is_ascii_digit, ['e', 'E']),
        };

        let mut chars = idchars.char_indices();
        if !chars.next().map(|(_, c)| is_digit(&c)).unwrap_or(false) {
            return None;
        }

        let mut exp_at = None;
        let mut saw_dot = false;
        let mut prev_char = PrevChar::Digit;
        for (i, c) in &mut chars {
            prev_char = match c {
                '.' if saw_dot || prev_char != PrevChar::Digit => return None,
                '.' => {
                    saw_dot = true;
                    PrevChar::Dot
                }
                '_' if prev_char != PrevChar::Digit => return None,
                '_' => PrevChar::Underscore,
                c if exp_chars.contains(&c) => {
                    exp_at = Some(i);
                    break;
                }
                c if is_digit(&c) => PrevChar::Digit,
                _ => return None,
            };
        }

        // Number cannot end with '_' nor have '_' just before its exponent
        if prev_char == PrevChar::Underscore {
            return None;
        }

        let float_sign = sign.unwrap_or(Sign::Plus);
        match exp_at {
            Some(i) => {
                let rest = &idchars[i + 1..];
                let (exp_sign, exp) = match rest.as_bytes().first() {
                    Some(b'+') => (Sign::Plus, &rest[1..]),
                    Some(b'-') => (Sign::Minus, &rest[1..]),
                    _ => (Sign::Plus, rest),
                };
                if !Self::is_num(exp, char::is_ascii_digit) {
                    return None; // e.g. '123e', '0x1fp'
                }
                let float = Float::Val {
                    base,
                    frac: &idchars[..i],
                    exp: Some((exp_sign, exp)),
                };
                Some(TokenKind::Float(float_sign, float))
            }
            None if saw_dot => Some(TokenKind::Float(
                float_sign,
                Float::Val {
                    base,
                    frac: idchars,
                    exp: None,
                },
            )),
            None => match sign {
                Some(sign) => Some(TokenKind::Int(sign, base, idchars)),
                None => Some(TokenKind::Nat(base, idchars)),
            },
        }
    }

    fn lex_number(idchars: &'s str) -> Option<TokenKind<'s>> {
        let (sign, idchars) = match idchars.as_bytes().first() {
            Some(b'+') => (Some(Sign::Plus), &idchars[1..]),
            Some(b'-') => (Some(Sign::Minus), &idchars[1..]),
            _ => (None, idchars),
        };
        let float_sign = sign.unwrap_or(Sign::Plus);

        // https://webassembly.github.io/spec/core/text/values.html#text-float
        match idchars {
            "inf" => Some(TokenKind::Float(float_sign, Float::Inf)),
            "nan" => Some(TokenKind::Float(float_sign, Float::Nan(None))),
            _ => {
                if let Some(payload) = idchars.strip_prefix("nan:0x") {
                    if Self::is_num(payload, char::is_ascii_hexdigit) {
                        Some(TokenKind::Float(float_sign, Float::Nan(Some(payload))))
                    } else {
                        None
                    }
                } else if let Some(hex) = idchars.strip_prefix("0x") {
                    Self::lex_unsigned_number(hex, sign, NumBase::Hex)
                } else {
                    Self::lex_unsigned_number(idchars, sign, NumBase::Dec)
                }
            }
        }
    }

    fn lex_ident_or_keyword(idchars: &'s str) -> Option<TokenKind<'s>> {
        // https://webassembly.github.io/spec/core/text/lexical.html#tokens
        match idchars.as_bytes().first() {
            Some(b'$') if idchars.len() > 1 => Some(TokenKind::Ident(&idchars[1..])), // https://webassembly.github.io/spec/core/text/values.html#text-id
            Some(b'a'..=b'z') => Some(TokenKind::Keyword(idchars)), // https://webassembly.github.io/spec/core/text/lexical.html#text-keyword
            _ => None,
        }
    }

    fn eat_whitespace(&mut self) -> Result<bool, LexError> {
        // https://webassembly.github.io/spec/core/text/lexical.html#white-space
        fn is_ws_char(c: char) -> bool {
            matches!(c, ' ' | '\t' | '\n' | '\r')
        }
        Ok(self.eat_char_by(is_ws_char) || self.eat_line_comment() || self.eat_block_comment()?)
    }

    fn eat_line_comment(&mut self) -> bool {
        // linecomment https://webassembly.github.io/spec/core/text/lexical.html#comments
        if self.eat_str(";;").is_none() {
            return false;
        }

        for (_, c) in &mut self.chars {
            if c == '\n' {
                break;
            }
        }

        true
    }

    fn eat_block_comment(&mut self) -> Result<bool, LexError> {
        // blockcomment https://webassembly.github.io/spec/core/text/lexical.html#comments
        let start = if let Some(offset) = self.eat_str("(;") {
            offset
        } else {
            return Ok(false);
        };

        // blockchar
        loop {
            if self.eat_block_comment()? {
                continue;
            }
            if self.eat_str(";)").is_some() {
                return Ok(true);
            }
            if self.chars.next().is_none() {
                return self.fail(LexErrorKind::UnterminatedBlockComment, start);
            }
        }
    }

    fn eat_char(&mut self, want: char) -> Option<usize> {
        match self.chars.peek() {
            Some((offset, c)) if *c == want => {
                let offset = *offset;
                self.chars.next();
                Some(offset)
            }
            _ => None,
        }
    }

    fn eat_char_by<F: Fn(char) -> bool>(&mut self, pred: F) -> bool {
        match self.chars.peek() {
            Some((_, c)) if pred(*c) => {
                self.chars.next();
                true
            }
            _ => false,
        }
    }

    fn eat_str(&mut self, s: &str) -> Option<usize> {
        let offset = self.offset();
        if !s.is_empty() && self.source[offset..].starts_with(s) {
            self.chars.nth(s.chars().count() - 1);
            Some(offset)
        } else {
            None
        }
    }

    fn offset(&mut self) -> usize {
        match self.chars.peek() {
            Some((offset, _)) => *offset,
            None => self.source.len(),
        }
    }

    fn fail<T>(&mut self, kind: LexErrorKind, start: usize) -> Result<T, LexError> {
        let end = self.offset();
        Err(LexError {
            kind,
            loc: self.location(start, end),
        })
    }
}

impl<'s> TokenSource<'s> for Lexer<'s> {
    fn next_token(&mut self) -> Result<Token<'s>, LexError> {
        self.lex()
    }
}
