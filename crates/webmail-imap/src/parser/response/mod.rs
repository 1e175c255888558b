//! IMAP response parser.
//!
//! Parses one complete server response, as delivered by the framed reader,
//! into a [`Response`].

#![allow(clippy::missing_errors_doc)]

mod helpers;
mod types;

pub use types::{QuotaResource, Response, StatusItem, UntaggedResponse};

use crate::parser::fetch::FetchRecord;
use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::{Error, Result};

pub(crate) use helpers::parse_flag_list;
use helpers::{
    parse_capability_data, parse_list_response, parse_namespace_response, parse_number_list,
    parse_quota_response, parse_quotaroot_response, parse_response_code, parse_status_response,
    read_text_until_crlf,
};

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses a complete response.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer),
            Token::Plus => Ok(Self::parse_continuation(&mut lexer)),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            token => Err(Error::Parse {
                position: 0,
                message: format!("Expected *, +, or tag, got {token:?}"),
            }),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag_str: &str) -> Result<Response> {
        lexer.expect_space()?;

        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag: Tag::new(tag_str),
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        lexer.expect_space()?;

        let untagged = match lexer.next_token()? {
            Token::Atom(s) => Self::parse_untagged_keyword(lexer, s)?,
            Token::Number(n) => Self::parse_message_data(lexer, n)?,
            token => {
                return Err(lexer.error(&format!(
                    "Unexpected token in untagged response: {token:?}"
                )));
            }
        };

        Ok(Response::Untagged(untagged))
    }

    fn parse_untagged_keyword(lexer: &mut Lexer<'_>, keyword: &str) -> Result<UntaggedResponse> {
        let upper = keyword.to_uppercase();
        let response = match upper.as_str() {
            "OK" => {
                let (code, text) = Self::parse_resp_text(lexer)?;
                UntaggedResponse::Ok { code, text }
            }
            "NO" => {
                let (code, text) = Self::parse_resp_text(lexer)?;
                UntaggedResponse::No { code, text }
            }
            "BAD" => {
                let (code, text) = Self::parse_resp_text(lexer)?;
                UntaggedResponse::Bad { code, text }
            }
            "PREAUTH" => {
                let (code, text) = Self::parse_resp_text(lexer)?;
                UntaggedResponse::PreAuth { code, text }
            }
            "BYE" => {
                let (code, text) = Self::parse_resp_text(lexer)?;
                UntaggedResponse::Bye { code, text }
            }
            "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
            "FLAGS" => {
                lexer.expect_space()?;
                UntaggedResponse::Flags(parse_flag_list(lexer)?)
            }
            "LIST" => {
                lexer.expect_space()?;
                UntaggedResponse::List(parse_list_response(lexer)?)
            }
            "LSUB" => {
                lexer.expect_space()?;
                UntaggedResponse::Lsub(parse_list_response(lexer)?)
            }
            "SEARCH" => UntaggedResponse::Search(parse_number_list(lexer)?),
            "SORT" => UntaggedResponse::Sort(parse_number_list(lexer)?),
            "STATUS" => {
                lexer.expect_space()?;
                let (mailbox, items) = parse_status_response(lexer)?;
                UntaggedResponse::Status { mailbox, items }
            }
            "NAMESPACE" => {
                lexer.expect_space()?;
                UntaggedResponse::Namespace(parse_namespace_response(lexer)?)
            }
            "QUOTAROOT" => {
                lexer.expect_space()?;
                let (mailbox, roots) = parse_quotaroot_response(lexer)?;
                UntaggedResponse::QuotaRoot { mailbox, roots }
            }
            "QUOTA" => {
                lexer.expect_space()?;
                let (root, resources) = parse_quota_response(lexer)?;
                UntaggedResponse::Quota { root, resources }
            }
            _ => return Err(lexer.error(&format!("Unknown untagged response: {keyword}"))),
        };
        Ok(response)
    }

    fn parse_message_data(lexer: &mut Lexer<'_>, n: u64) -> Result<UntaggedResponse> {
        let n = u32::try_from(n).map_err(|_| lexer.error("Message number out of range"))?;
        lexer.expect_space()?;
        let keyword = lexer.read_atom_string()?;

        match keyword.to_uppercase().as_str() {
            "EXISTS" => Ok(UntaggedResponse::Exists(n)),
            "RECENT" => Ok(UntaggedResponse::Recent(n)),
            "EXPUNGE" => {
                let seq = SeqNum::new(n).ok_or_else(|| lexer.error("Invalid sequence number 0"))?;
                Ok(UntaggedResponse::Expunge(seq))
            }
            "FETCH" => {
                let seq = SeqNum::new(n).ok_or_else(|| lexer.error("Invalid sequence number 0"))?;
                lexer.expect_space()?;
                Ok(UntaggedResponse::Fetch(FetchRecord::parse(seq, lexer)?))
            }
            _ => Err(lexer.error(&format!("Unknown message data: {keyword}"))),
        }
    }

    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }

        let text = read_text_until_crlf(lexer);

        Response::Continuation {
            text: if text.is_empty() { None } else { Some(text) },
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom_string()?;
        match s.to_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(lexer.error(&format!("Invalid status: {s}"))),
        }
    }

    /// Parses `[code] text`; both parts are optional.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }

        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };

        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }

        let text = read_text_until_crlf(lexer);

        Ok((code, text))
    }
}
