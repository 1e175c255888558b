//! RFC 2047 encoded words in header values.

use crate::charset;
use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::error::{Error, Result};

/// Decodes every `=?charset?B|Q?text?=` word in `value`.
///
/// Whitespace between two adjacent encoded words is dropped, as the RFC
/// requires; all other text passes through unchanged.
///
/// # Errors
///
/// Fails if a word is malformed or its charset is unknown.
pub fn decode_encoded_words(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        if let Some((decoded, consumed)) = decode_word(candidate)? {
            if !(after_word && before.chars().all(char::is_whitespace)) {
                out.push_str(before);
            }
            out.push_str(&decoded);
            rest = &candidate[consumed..];
            after_word = true;
        } else {
            out.push_str(before);
            out.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Decodes one encoded word at the start of `input`.
///
/// Returns the text and the number of bytes consumed, or `None` if the
/// input does not have the shape of an encoded word.
fn decode_word(input: &str) -> Result<Option<(String, usize)>> {
    let Some(body) = input.strip_prefix("=?") else {
        return Ok(None);
    };
    let mut fields = body.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(tail)) = (fields.next(), fields.next(), fields.next())
    else {
        return Ok(None);
    };
    let Some(end) = tail.find("?=") else {
        return Ok(None);
    };
    if charset.is_empty() || charset.contains(char::is_whitespace) || encoding.len() != 1 {
        return Ok(None);
    }
    let text = &tail[..end];
    if text.contains(char::is_whitespace) {
        return Ok(None);
    }

    // RFC 2231 allows `charset*language`.
    let charset = charset.split('*').next().unwrap_or(charset);
    let bytes = match encoding {
        "B" | "b" => decode_base64(text.as_bytes())?,
        "Q" | "q" => decode_quoted_printable(text.replace('_', " ").as_bytes())?,
        other => {
            return Err(Error::EncodedWord(format!("unknown word encoding {other}")));
        }
    };
    let decoded = charset::decode(&bytes, charset)?;
    let consumed = 2 + body.len() - tail.len() + end + 2;
    Ok(Some((decoded, consumed)))
}

/// Decodes encoded words, returning `value` unchanged if that fails.
#[must_use]
pub fn decode_header_lossy(value: &str) -> String {
    decode_encoded_words(value).unwrap_or_else(|_| value.to_string())
}
