//! MIME parameter values, including RFC 2231 extended and continued
//! parameters.

use percent_encoding::percent_decode_str;

use crate::charset;
use crate::error::{Error, Result};
use crate::words::decode_encoded_words;

/// Decodes an RFC 2231 extended value: `charset'language'percent-text`.
///
/// # Errors
///
/// Fails if the value lacks the two `'` separators or the bytes are
/// invalid in the named charset.
pub fn decode_extended_value(value: &str) -> Result<String> {
    let (charset, encoded) = split_extended(value)?;
    let bytes: Vec<u8> = percent_decode_str(encoded).collect();
    charset::decode(&bytes, charset_or_default(charset))
}

fn split_extended(value: &str) -> Result<(&str, &str)> {
    let mut parts = value.splitn(3, '\'');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(charset), Some(_language), Some(text)) => Ok((charset, text)),
        _ => Err(Error::EncodedWord(format!(
            "extended value without charset: {value}"
        ))),
    }
}

fn charset_or_default(charset: &str) -> &str {
    if charset.is_empty() { "us-ascii" } else { charset }
}

/// Looks up parameter `name` in `params` and decodes it.
///
/// Tries, in order: the extended form `name*`, RFC 2231 continuations
/// (`name*0`, `name*1*`, ...), then the plain `name`, whose value may
/// carry RFC 2047 encoded words. Names compare case-insensitively.
///
/// Returns `None` when the parameter is absent, and `Some(Err(_))` when it
/// is present but cannot be decoded.
#[must_use]
pub fn decode_parameter(params: &[(String, String)], name: &str) -> Option<Result<String>> {
    let find = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    };

    if let Some(value) = find(&format!("{name}*")) {
        return Some(decode_extended_value(value));
    }
    if let Some(result) = decode_continuation(params, name) {
        return Some(result);
    }
    find(name).map(decode_encoded_words)
}

fn decode_continuation(params: &[(String, String)], name: &str) -> Option<Result<String>> {
    let mut segments: Vec<(u32, bool, &str)> = params
        .iter()
        .filter_map(|(key, value)| {
            let lower = key.to_ascii_lowercase();
            let rest = lower.strip_prefix(&name.to_ascii_lowercase())?.strip_prefix('*')?;
            let (index, extended) = rest
                .strip_suffix('*')
                .map_or((rest, false), |index| (index, true));
            Some((index.parse().ok()?, extended, value.as_str()))
        })
        .collect();
    if segments.is_empty() {
        return None;
    }
    segments.sort_by_key(|(index, _, _)| *index);

    let mut charset = None;
    let mut bytes = Vec::new();
    for (index, extended, value) in segments {
        if !extended {
            bytes.extend_from_slice(value.as_bytes());
            continue;
        }
        let encoded = if index == 0 {
            match split_extended(value) {
                Ok((cs, text)) => {
                    charset = Some(charset_or_default(cs));
                    text
                }
                Err(e) => return Some(Err(e)),
            }
        } else {
            value
        };
        bytes.extend(percent_decode_str(encoded));
    }

    Some(match charset {
        Some(charset) => charset::decode(&bytes, charset),
        None => String::from_utf8(bytes)
            .map_err(|e| Error::Charset(format!("invalid UTF-8: {e}")))
            .and_then(|joined| decode_encoded_words(&joined)),
    })
}
