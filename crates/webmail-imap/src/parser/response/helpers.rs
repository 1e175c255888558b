//! Parser helper functions.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, NamespaceEntry, Namespaces,
    ResponseCode, SeqNum, Uid, UidValidity,
};
use crate::utf7;
use crate::{Error, Result};

use super::types::{QuotaResource, StatusItem};

/// Parses a response code.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;
    let upper = atom.to_uppercase();

    let code = match upper.as_str() {
        "ALERT" => ResponseCode::Alert,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "NONEXISTENT" => ResponseCode::NonExistent,
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let uid = Uid::new(n).ok_or_else(|| lexer.error("Invalid UID 0"))?;
            ResponseCode::UidNext(uid)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let validity = UidValidity::new(n).ok_or_else(|| lexer.error("Invalid UIDVALIDITY 0"))?;
            ResponseCode::UidValidity(validity)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let seq = SeqNum::new(n).ok_or_else(|| lexer.error("Invalid sequence number 0"))?;
            ResponseCode::Unseen(seq)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            let flags = parse_flag_list(lexer)?;
            ResponseCode::PermanentFlags(flags.into_iter().collect())
        }
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    // Codes may carry arguments we do not interpret.
    while lexer.peek() != Some(b']') && !lexer.is_eof() {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses space-separated capability atoms up to the end of the data.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }

    Ok(caps)
}

/// Parses a flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;

    let mut flags = Flags::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            Token::Space => {}
            token => {
                return Err(lexer.error(&format!("Unexpected token in flag list: {token:?}")));
            }
        }
    }

    Ok(flags)
}

/// Parses a mailbox name and decodes it from modified UTF-7.
pub fn parse_mailbox_name(lexer: &mut Lexer<'_>) -> Result<Mailbox> {
    let raw = lexer.read_astring()?;
    Ok(Mailbox::new(utf7::decode_or_raw(&raw)))
}

/// Parses a hierarchy delimiter: a quoted single character or `NIL`.
fn parse_delimiter(lexer: &mut Lexer<'_>) -> Result<Option<char>> {
    match lexer.next_token()? {
        Token::Nil => Ok(None),
        Token::QuotedString(s) => Ok(String::from_utf8_lossy(&s).chars().next()),
        token => Err(lexer.error(&format!("Expected delimiter, got {token:?}"))),
    }
}

/// Parses a LIST or LSUB response.
///
/// The name may be quoted, an atom, or a literal. Extended data that
/// follows the name (RFC 5258 `CHILDINFO` and the like) is skipped.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            Token::Space => {}
            token => {
                return Err(lexer.error(&format!("Unexpected token in LIST attributes: {token:?}")));
            }
        }
    }

    lexer.expect_space()?;
    let delimiter = parse_delimiter(lexer)?;
    lexer.expect_space()?;
    let mailbox = parse_mailbox_name(lexer)?;

    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox,
    })
}

/// Parses the numbers of a SEARCH or SORT response.
pub fn parse_number_list(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut nums = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Number(n) => {
                let n = u32::try_from(n).map_err(|_| lexer.error("Number out of range"))?;
                nums.push(n);
            }
            // Trailing space before CRLF, seen from some servers.
            Token::Crlf | Token::Eof => break,
            // RFC 4731/5267 result options are not requested.
            _ => {}
        }
    }

    Ok(nums)
}

/// Parses a STATUS response.
pub fn parse_status_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<StatusItem>)> {
    let mailbox = parse_mailbox_name(lexer)?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(name) => {
                lexer.expect_space()?;
                let value = lexer.read_number()?;

                let item = match name.to_uppercase().as_str() {
                    "MESSAGES" => StatusItem::Messages(value),
                    "RECENT" => StatusItem::Recent(value),
                    "UNSEEN" => StatusItem::Unseen(value),
                    "UIDNEXT" => match Uid::new(value) {
                        Some(uid) => StatusItem::UidNext(uid),
                        None => continue,
                    },
                    "UIDVALIDITY" => match UidValidity::new(value) {
                        Some(v) => StatusItem::UidValidity(v),
                        None => continue,
                    },
                    _ => continue,
                };
                items.push(item);
            }
            Token::Eof => return Err(lexer.error("Unterminated STATUS item list")),
            _ => {}
        }
    }

    Ok((mailbox, items))
}

/// Parses one NAMESPACE group: `NIL` or `(("prefix" "delim") ...)`.
fn parse_namespace_group(lexer: &mut Lexer<'_>) -> Result<Vec<NamespaceEntry>> {
    match lexer.next_token()? {
        Token::Nil => return Ok(Vec::new()),
        Token::LParen => {}
        token => return Err(lexer.error(&format!("Expected namespace group, got {token:?}"))),
    }

    let mut entries = Vec::new();
    loop {
        lexer.skip_spaces();
        match lexer.next_token()? {
            Token::RParen => break,
            Token::LParen => {
                let prefix = lexer.read_astring()?;
                lexer.expect_space()?;
                let delimiter = parse_delimiter(lexer)?;
                // Namespace response extensions are ignored.
                let mut depth = 1usize;
                while depth > 0 {
                    match lexer.next_token()? {
                        Token::LParen => depth += 1,
                        Token::RParen => depth -= 1,
                        Token::Eof => return Err(lexer.error("Unterminated namespace entry")),
                        _ => {}
                    }
                }
                entries.push(NamespaceEntry {
                    prefix: utf7::decode_or_raw(&prefix),
                    delimiter,
                });
            }
            token => return Err(lexer.error(&format!("Unexpected token in namespace: {token:?}"))),
        }
    }

    Ok(entries)
}

/// Parses a NAMESPACE response: personal, other users, shared.
pub fn parse_namespace_response(lexer: &mut Lexer<'_>) -> Result<Namespaces> {
    let personal = parse_namespace_group(lexer)?;
    lexer.expect_space()?;
    let other_users = parse_namespace_group(lexer)?;
    lexer.expect_space()?;
    let shared = parse_namespace_group(lexer)?;

    Ok(Namespaces {
        personal,
        other_users,
        shared,
    })
}

/// Parses a QUOTAROOT response.
pub fn parse_quotaroot_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<String>)> {
    let mailbox = parse_mailbox_name(lexer)?;
    let mut roots = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if matches!(lexer.peek(), Some(b'\r') | None) {
            break;
        }
        roots.push(lexer.read_astring()?);
    }
    Ok((mailbox, roots))
}

/// Parses a QUOTA response.
pub fn parse_quota_response(lexer: &mut Lexer<'_>) -> Result<(String, Vec<QuotaResource>)> {
    let root = lexer.read_astring()?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut resources = Vec::new();
    loop {
        lexer.skip_spaces();
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(name) => {
                lexer.expect_space()?;
                let usage = lexer.read_number_u64()?;
                lexer.expect_space()?;
                let limit = lexer.read_number_u64()?;
                resources.push(QuotaResource {
                    name: name.to_ascii_uppercase(),
                    usage,
                    limit,
                });
            }
            token => return Err(lexer.error(&format!("Unexpected token in quota list: {token:?}"))),
        }
    }

    Ok((root, resources))
}

/// Reads text until CRLF.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let remaining = lexer.remaining();

    let end = remaining
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(remaining.len());

    lexer.skip(end);

    if lexer.peek() == Some(b'\r') {
        lexer.skip(2);
    }

    String::from_utf8_lossy(&remaining[..end]).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn namespace_with_nil_groups() {
        let mut lexer = Lexer::new(b"((\"INBOX.\" \".\")) NIL ((\"#public/\" \"/\"))\r\n");
        let ns = parse_namespace_response(&mut lexer).unwrap();

        assert_eq!(ns.personal.len(), 1);
        assert_eq!(ns.personal[0].prefix, "INBOX.");
        assert_eq!(ns.personal[0].delimiter, Some('.'));
        assert!(ns.other_users.is_empty());
        assert_eq!(ns.shared[0].delimiter, Some('/'));
    }

    #[test]
    fn namespace_with_extension_data() {
        let mut lexer =
            Lexer::new(b"((\"\" \"/\" \"X-PARAM\" (\"FLAG1\" \"FLAG2\"))) NIL NIL\r\n");
        let ns = parse_namespace_response(&mut lexer).unwrap();
        assert_eq!(ns.personal[0].prefix, "");
        assert_eq!(ns.first_delimiter(), Some('/'));
    }

    #[test]
    fn list_with_literal_name() {
        let mut lexer = Lexer::new(b"(\\HasNoChildren) \".\" {12}\r\nEntw&APw-rfe\r\n");
        let list = parse_list_response(&mut lexer).unwrap();
        assert_eq!(list.mailbox.as_str(), "Entw\u{fc}rfe");
        assert_eq!(list.delimiter, Some('.'));
    }

    #[test]
    fn list_with_nil_delimiter() {
        let mut lexer = Lexer::new(b"(\\Noselect) NIL \"\"\r\n");
        let list = parse_list_response(&mut lexer).unwrap();
        assert_eq!(list.delimiter, None);
    }

    #[test]
    fn quota_response() {
        let mut lexer = Lexer::new(b"\"\" (STORAGE 500 1000 MESSAGE 3 100)\r\n");
        let (root, resources) = parse_quota_response(&mut lexer).unwrap();
        assert_eq!(root, "");
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].name, "STORAGE");
        assert_eq!(resources[0].usage, 500);
        assert_eq!(resources[0].limit, 1000);
    }

    #[test]
    fn quotaroot_response() {
        let mut lexer = Lexer::new(b"INBOX \"\"\r\n");
        let (mailbox, roots) = parse_quotaroot_response(&mut lexer).unwrap();
        assert!(mailbox.is_inbox());
        assert_eq!(roots, vec![String::new()]);
    }

    #[test]
    fn sort_numbers_with_trailing_space() {
        let mut lexer = Lexer::new(b" 4 2 9 \r\n");
        assert_eq!(parse_number_list(&mut lexer).unwrap(), vec![4, 2, 9]);
    }
}
