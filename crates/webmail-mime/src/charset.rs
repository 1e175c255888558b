//! Charset conversion to UTF-8.
//!
//! Covers the charsets that dominate real mail: UTF-8, US-ASCII and the
//! Latin single-byte sets. Anything else is reported as unknown so callers
//! can fall back to a lossy UTF-8 reading.

use crate::error::{Error, Result};

/// Windows-1252 code points for bytes `0x80..=0x9F`. Unassigned bytes map
/// to their C1 control equivalents, as browsers do.
const WINDOWS_1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{81}', '\u{201A}', '\u{192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{2C6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8D}', '\u{17D}', '\u{8F}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{2DC}', '\u{2122}', '\u{161}', '\u{203A}', '\u{153}', '\u{9D}', '\u{17E}', '\u{178}',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Utf8,
    Ascii,
    Latin1,
    Latin9,
    Windows1252,
}

impl Charset {
    fn lookup(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        match label.as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "us-ascii" | "ascii" | "ansi_x3.4-1968" => Some(Self::Ascii),
            "iso-8859-1" | "iso8859-1" | "latin1" | "l1" => Some(Self::Latin1),
            "iso-8859-15" | "iso8859-15" | "latin9" => Some(Self::Latin9),
            "windows-1252" | "cp1252" => Some(Self::Windows1252),
            _ => None,
        }
    }
}

/// Returns true if `label` names a charset [`decode`] understands.
#[must_use]
pub fn is_supported(label: &str) -> bool {
    Charset::lookup(label).is_some()
}

/// Decodes `bytes` in `charset` to a UTF-8 string.
///
/// # Errors
///
/// Fails for unknown charsets and for bytes invalid in UTF-8 or ASCII.
pub fn decode(bytes: &[u8], charset: &str) -> Result<String> {
    let charset =
        Charset::lookup(charset).ok_or_else(|| Error::Charset(format!("unknown charset {charset}")))?;

    match charset {
        Charset::Utf8 => String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::Charset(format!("invalid UTF-8: {e}"))),
        Charset::Ascii => {
            if bytes.is_ascii() {
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            } else {
                Err(Error::Charset("8-bit byte in US-ASCII text".into()))
            }
        }
        Charset::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        Charset::Latin9 => Ok(bytes.iter().map(|&b| latin9(b)).collect()),
        Charset::Windows1252 => Ok(bytes.iter().map(|&b| windows_1252(b)).collect()),
    }
}

/// Decodes `bytes` in `charset`, falling back to lossy UTF-8 when the
/// charset is unknown or the bytes do not fit it.
#[must_use]
pub fn decode_lossy(bytes: &[u8], charset: Option<&str>) -> String {
    charset
        .and_then(|charset| decode(bytes, charset).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

fn windows_1252(b: u8) -> char {
    match b {
        0x80..=0x9F => WINDOWS_1252_HIGH[usize::from(b - 0x80)],
        _ => char::from(b),
    }
}

fn latin9(b: u8) -> char {
    match b {
        0xA4 => '\u{20AC}',
        0xA6 => '\u{160}',
        0xA8 => '\u{161}',
        0xB4 => '\u{17D}',
        0xB8 => '\u{17E}',
        0xBC => '\u{152}',
        0xBD => '\u{153}',
        0xBE => '\u{178}',
        _ => char::from(b),
    }
}
