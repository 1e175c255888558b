//! Typed parse tree for parenthesized IMAP data.
//!
//! FETCH items such as `BODYSTRUCTURE` and `ENVELOPE` are untyped nested
//! lists on the wire. They are decoded into a closed set of node kinds
//! first; the classifier and the header code pattern-match on the tree.

use std::borrow::Cow;

use super::lexer::{Lexer, Token};
use crate::Result;

/// Nesting limit for lists, well above anything a real BODYSTRUCTURE uses.
const MAX_DEPTH: usize = 64;

/// One node of the parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `NIL`.
    Nil,
    /// Bare atom, e.g. `\Seen` or `7BIT`.
    Atom(String),
    /// Bare number.
    Number(u64),
    /// Quoted string, escapes removed.
    QuotedString(Vec<u8>),
    /// Literal payload, byte-exact.
    Literal(Vec<u8>),
    /// Parenthesized list.
    List(Vec<Value>),
}

impl Value {
    /// Parses one value at the lexer's position.
    pub fn parse(lexer: &mut Lexer<'_>) -> Result<Self> {
        Self::parse_at_depth(lexer, 0)
    }

    fn parse_at_depth(lexer: &mut Lexer<'_>, depth: usize) -> Result<Self> {
        match lexer.next_token()? {
            Token::Nil => Ok(Self::Nil),
            Token::Atom(s) => Ok(Self::Atom(s.to_string())),
            Token::Number(n) => Ok(Self::Number(n)),
            Token::QuotedString(s) => Ok(Self::QuotedString(s)),
            Token::Literal(data) => Ok(Self::Literal(data.to_vec())),
            Token::LParen => {
                if depth >= MAX_DEPTH {
                    return Err(lexer.error("List nesting too deep"));
                }
                Self::parse_list_body(lexer, depth + 1).map(Self::List)
            }
            token => Err(lexer.error(&format!("Unexpected token in value: {token:?}"))),
        }
    }

    /// Parses list items up to and including the closing parenthesis.
    fn parse_list_body(lexer: &mut Lexer<'_>, depth: usize) -> Result<Vec<Self>> {
        let mut items = Vec::new();
        loop {
            lexer.skip_spaces();
            if lexer.peek() == Some(b')') {
                lexer.advance();
                return Ok(items);
            }
            if lexer.is_eof() {
                return Err(lexer.error("Unterminated list"));
            }
            items.push(Self::parse_at_depth(lexer, depth)?);
        }
    }

    /// Returns true for `NIL`.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns the items of a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the raw bytes of a string-like value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Atom(s) => Some(s.as_bytes()),
            Self::QuotedString(b) | Self::Literal(b) => Some(b),
            _ => None,
        }
    }

    /// Returns a string-like or numeric value as text.
    ///
    /// Invalid UTF-8 is replaced; callers that need the exact bytes use
    /// [`Value::as_bytes`].
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Number(n) => Some(Cow::Owned(n.to_string())),
            other => other.as_bytes().map(String::from_utf8_lossy),
        }
    }

    /// Returns a number, accepting digits sent as a string too.
    #[must_use]
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Atom(_) | Self::QuotedString(_) => self.as_text()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Serializes the value back to wire form.
    ///
    /// Literals are re-emitted with their `{N}\r\n` marker so the payload
    /// comes back byte-for-byte.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Nil => out.extend_from_slice(b"NIL"),
            Self::Atom(s) => out.extend_from_slice(s.as_bytes()),
            Self::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
            Self::QuotedString(bytes) => {
                out.push(b'"');
                for &b in bytes {
                    if b == b'"' || b == b'\\' {
                        out.push(b'\\');
                    }
                    out.push(b);
                }
                out.push(b'"');
            }
            Self::Literal(bytes) => {
                out.extend_from_slice(format!("{{{}}}\r\n", bytes.len()).as_bytes());
                out.extend_from_slice(bytes);
            }
            Self::List(items) => {
                out.push(b'(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    item.write_to(out);
                }
                out.push(b')');
            }
        }
    }

    /// Serializes the value into a new buffer.
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> Value {
        Value::parse(&mut Lexer::new(input)).unwrap()
    }

    #[test]
    fn nested_lists() {
        let value = parse(b"((\"TEXT\" \"PLAIN\" NIL) \"MIXED\")");

        let outer = value.as_list().unwrap();
        assert_eq!(outer.len(), 2);
        let inner = outer[0].as_list().unwrap();
        assert_eq!(inner[0].as_text().unwrap(), "TEXT");
        assert!(inner[2].is_nil());
        assert_eq!(outer[1].as_text().unwrap(), "MIXED");
    }

    #[test]
    fn literal_inside_list() {
        let value = parse(b"(\"a\" {3}\r\n\xe9\xe8) 1)");

        let items = value.as_list().unwrap();
        assert_eq!(items[1], Value::Literal(b"\xe9\xe8)".to_vec()));
        assert_eq!(items[2], Value::Number(1));
    }

    #[test]
    fn number_from_string() {
        assert_eq!(parse(b"\"42\"").as_number(), Some(42));
        assert_eq!(parse(b"42").as_number(), Some(42));
        assert_eq!(parse(b"NIL").as_number(), None);
    }

    #[test]
    fn tolerates_extra_spaces() {
        let value = parse(b"( 1  2 )");
        assert_eq!(value, Value::List(vec![Value::Number(1), Value::Number(2)]));
    }

    #[test]
    fn unterminated_list_fails() {
        assert!(Value::parse(&mut Lexer::new(b"(1 2")).is_err());
    }

    #[test]
    fn depth_is_bounded() {
        let input = "(".repeat(MAX_DEPTH + 2);
        assert!(Value::parse(&mut Lexer::new(input.as_bytes())).is_err());
    }

    #[test]
    fn wire_form_escapes_quotes() {
        let value = Value::List(vec![
            Value::QuotedString(b"say \"hi\"".to_vec()),
            Value::Nil,
            Value::Literal(b"x\r\ny".to_vec()),
        ]);
        assert_eq!(
            value.to_wire(),
            b"(\"say \\\"hi\\\"\" NIL {4}\r\nx\r\ny)".to_vec()
        );
    }
}
