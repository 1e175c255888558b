//! IMAP lexer for tokenizing server responses.
//!
//! The lexer works on one complete response as produced by the framed
//! reader: literal payloads are already inline after their `{N}\r\n`
//! marker, so a literal token simply borrows the next `N` bytes instead of
//! scanning them as text.

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::{Error, Result};

/// IMAP lexer state.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the whole input.
    #[must_use]
    pub const fn input(&self) -> &'a [u8] {
        self.input
    }

    /// Returns the remaining input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Returns true if at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Peeks at the byte at offset from current position.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Advances by one byte and returns it.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Skips n bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        match byte {
            b'\r' => {
                if self.peek_at(1) == Some(b'\n') {
                    self.skip(2);
                    Ok(Token::Crlf)
                } else {
                    Err(self.error("Expected LF after CR"))
                }
            }
            b' ' => {
                self.advance();
                Ok(Token::Space)
            }
            b'(' => {
                self.advance();
                Ok(Token::LParen)
            }
            b')' => {
                self.advance();
                Ok(Token::RParen)
            }
            b'[' => {
                self.advance();
                Ok(Token::LBracket)
            }
            b']' => {
                self.advance();
                Ok(Token::RBracket)
            }
            b'*' => {
                self.advance();
                Ok(Token::Asterisk)
            }
            b'+' => {
                self.advance();
                Ok(Token::Plus)
            }
            b'"' => self.read_quoted_string(),
            b'{' => self.read_literal(),
            b'0'..=b'9' => self.read_number_or_atom(),
            _ if is_atom_char(byte) => self.read_atom(),
            _ => Err(self.error(&format!("Unexpected character: {byte:#04x}"))),
        }
    }

    fn read_quoted_string(&mut self) -> Result<Token<'a>> {
        self.advance();

        let mut result = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => result.push(c),
                    Some(c) => {
                        return Err(self.error(&format!("Invalid escape: \\{}", char::from(c))));
                    }
                    None => return Err(self.error("Unexpected EOF in quoted string")),
                },
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("Unterminated quoted string"));
                }
                Some(c) => result.push(c),
            }
        }

        Ok(Token::QuotedString(result))
    }

    /// Reads a `{N}` marker and hands the next `N` raw bytes back as one
    /// token, whatever they contain.
    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.advance();

        let input = self.input;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let digits = &input[start..self.pos];
        if self.peek() == Some(b'+') {
            self.advance();
        }
        if self.advance() != Some(b'}') {
            return Err(self.error("Expected } after literal size"));
        }

        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("Invalid literal size"))?;

        if self.advance() != Some(b'\r') || self.advance() != Some(b'\n') {
            return Err(self.error("Expected CRLF after literal size"));
        }

        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("Incomplete literal data"))?;

        let data = &input[self.pos..end];
        self.pos = end;
        Ok(Token::Literal(data))
    }

    fn read_number_or_atom(&mut self) -> Result<Token<'a>> {
        let s = self.take_atom_chars()?;
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let n = s.parse().map_err(|_| self.error("Number too large"))?;
            Ok(Token::Number(n))
        } else {
            Ok(Token::Atom(s))
        }
    }

    fn read_atom(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        let s = self.take_atom_chars()?;

        // `\*` in PERMANENTFLAGS
        if s == "\\" && self.peek() == Some(b'*') {
            self.advance();
            let s = std::str::from_utf8(&self.input[start..self.pos])
                .map_err(|_| self.error("Invalid UTF-8 in atom"))?;
            return Ok(Token::Atom(s));
        }

        if s.eq_ignore_ascii_case("NIL") {
            Ok(Token::Nil)
        } else {
            Ok(Token::Atom(s))
        }
    }

    fn take_atom_chars(&mut self) -> Result<&'a str> {
        let input = self.input;
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.advance();
        }
        std::str::from_utf8(&input[start..self.pos])
            .map_err(|_| self.error("Invalid UTF-8 in atom"))
    }

    /// Reads a FETCH data item name such as `BODY[HEADER.FIELDS (FROM)]<0>`.
    ///
    /// The bracketed section may itself contain spaces and parentheses, so
    /// it is taken verbatim up to the matching `]`.
    pub fn read_item_name(&mut self) -> Result<&'a str> {
        let input = self.input;
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.advance();
        }
        if self.pos == start {
            return Err(self.error("Expected data item name"));
        }

        if self.peek() == Some(b'[') {
            while let Some(b) = self.advance() {
                if b == b']' {
                    break;
                }
                if b == b'\r' {
                    return Err(self.error("Unterminated section in data item name"));
                }
            }
            if self.peek() == Some(b'<') {
                while let Some(b) = self.advance() {
                    if b == b'>' {
                        break;
                    }
                }
            }
        }

        std::str::from_utf8(&input[start..self.pos])
            .map_err(|_| self.error("Invalid UTF-8 in data item name"))
    }

    /// Creates a parse error at the current position.
    pub(crate) fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Expects and consumes a specific token.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {expected:?}, got {token:?}")))
        }
    }

    /// Expects and consumes a space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an astring (atom, quoted string or literal) as raw bytes.
    pub fn read_astring_bytes(&mut self) -> Result<Vec<u8>> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.as_bytes().to_vec()),
            Token::Number(n) => Ok(n.to_string().into_bytes()),
            Token::QuotedString(s) => Ok(s),
            Token::Literal(data) => Ok(data.to_vec()),
            token => Err(self.error(&format!("Expected astring, got {token:?}"))),
        }
    }

    /// Reads an astring, replacing invalid UTF-8.
    pub fn read_astring(&mut self) -> Result<String> {
        self.read_astring_bytes()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads a nstring (NIL or string).
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(String::from_utf8_lossy(&s).into_owned())),
            Token::Literal(data) => Ok(Some(String::from_utf8_lossy(data).into_owned())),
            token => Err(self.error(&format!("Expected nstring, got {token:?}"))),
        }
    }

    /// Reads a number that must fit in 32 bits.
    pub fn read_number(&mut self) -> Result<u32> {
        let n = self.read_number_u64()?;
        u32::try_from(n).map_err(|_| self.error("Number out of range"))
    }

    /// Reads a 64-bit number.
    pub fn read_number_u64(&mut self) -> Result<u64> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("Expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("Expected atom, got {token:?}"))),
        }
    }

    /// Skips optional spaces.
    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.advance();
        }
    }
}

/// Returns true if the byte may appear in an atom.
///
/// `\` is accepted so that flags like `\Seen` lex as a single atom.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21 |
        0x23..=0x24 |
        0x26..=0x27 |
        0x2B..=0x5A |
        0x5C |
        0x5E..=0x7A |
        0x7C |
        0x7E
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new(b"* OK");

        assert_eq!(lexer.next_token().unwrap(), Token::Asterisk);
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("OK"));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new(b"123 5000000000");

        assert_eq!(lexer.next_token().unwrap(), Token::Number(123));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Number(5_000_000_000));
    }

    #[test]
    fn test_quoted_string_escaped() {
        let mut lexer = Lexer::new(b"\"hello \\\"world\\\"\"");

        assert_eq!(
            lexer.next_token().unwrap(),
            Token::QuotedString(b"hello \"world\"".to_vec())
        );
    }

    #[test]
    fn test_quoted_string_keeps_8bit() {
        let mut lexer = Lexer::new(b"\"caf\xe9\"");

        assert_eq!(
            lexer.next_token().unwrap(),
            Token::QuotedString(b"caf\xe9".to_vec())
        );
    }

    #[test]
    fn test_nil_any_case() {
        let mut lexer = Lexer::new(b"NIL nil");

        assert_eq!(lexer.next_token().unwrap(), Token::Nil);
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Nil);
    }

    #[test]
    fn test_flags() {
        let mut lexer = Lexer::new(b"(\\Seen \\*)");

        assert_eq!(lexer.next_token().unwrap(), Token::LParen);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("\\Seen"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("\\*"));
        assert_eq!(lexer.next_token().unwrap(), Token::RParen);
    }

    #[test]
    fn test_literal_is_raw() {
        let mut lexer = Lexer::new(b"{7}\r\n(a \"b)\r\n");

        match lexer.next_token().unwrap() {
            Token::Literal(data) => assert_eq!(data, b"(a \"b)\r"),
            other => panic!("Expected literal, got {other:?}"),
        }
        assert_eq!(lexer.remaining(), b"\n");
    }

    #[test]
    fn test_literal_plus_marker() {
        let mut lexer = Lexer::new(b"{2+}\r\nok");

        assert_eq!(lexer.next_token().unwrap(), Token::Literal(b"ok"));
    }

    #[test]
    fn test_incomplete_literal() {
        let mut lexer = Lexer::new(b"{10}\r\nshort");

        let err = lexer.next_token().unwrap_err();
        assert!(err.to_string().contains("Incomplete literal data"));
    }

    #[test]
    fn test_item_name_with_section() {
        let mut lexer = Lexer::new(b"BODY[HEADER.FIELDS (DATE FROM)]<0> {3}");

        assert_eq!(
            lexer.read_item_name().unwrap(),
            "BODY[HEADER.FIELDS (DATE FROM)]<0>"
        );
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
    }

    #[test]
    fn test_item_name_plain() {
        let mut lexer = Lexer::new(b"RFC822.SIZE 44");

        assert_eq!(lexer.read_item_name().unwrap(), "RFC822.SIZE");
    }

    #[test]
    fn test_is_atom_char() {
        assert!(is_atom_char(b'A'));
        assert!(is_atom_char(b'\\'));
        assert!(is_atom_char(b'.'));
        assert!(!is_atom_char(b' '));
        assert!(!is_atom_char(b'('));
        assert!(!is_atom_char(b'['));
        assert!(!is_atom_char(b']'));
        assert!(!is_atom_char(b'"'));
        assert!(!is_atom_char(b'%'));
        assert!(!is_atom_char(b'*'));
        assert!(!is_atom_char(b'{'));
    }
}
