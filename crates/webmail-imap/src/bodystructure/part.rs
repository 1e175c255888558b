//! A single non-multipart body part, read from its BODYSTRUCTURE list.

use serde::Serialize;
use webmail_mime::TransferEncoding;

use super::StructureError;
use super::filename;
use crate::parser::Value;

/// Content-Disposition of a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disposition {
    /// Lowercased disposition type, usually `attachment` or `inline`.
    pub kind: String,
    /// Disposition parameters in server order.
    pub params: Vec<(String, String)>,
}

/// Everything the server reports about one leaf part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartDescriptor {
    /// Dotted part number, usable in `BODY[...]`.
    pub path: String,
    /// Lowercased `type/subtype`.
    pub mime_type: String,
    /// Content-Type parameters in server order, names as sent.
    pub params: Vec<(String, String)>,
    /// Content-ID as sent, angle brackets included.
    pub content_id: Option<String>,
    /// Content-Description.
    pub description: Option<String>,
    /// Content-Transfer-Encoding.
    pub encoding: TransferEncoding,
    /// Encoded size in octets.
    pub size: u64,
    /// Display filename; never empty.
    pub filename: String,
    /// Line count of `text/*` and `message/rfc822` parts.
    pub text_lines: Option<u64>,
    /// Content-MD5.
    pub md5: Option<String>,
    /// Content-Disposition.
    pub disposition: Option<Disposition>,
    /// Content-Language tags.
    pub language: Vec<String>,
    /// Content-Location.
    pub location: Option<String>,
    /// Envelope of an embedded `message/rfc822`.
    #[serde(skip)]
    pub envelope: Option<Value>,
    /// Body structure of an embedded `message/rfc822`.
    #[serde(skip)]
    pub nested: Option<Value>,
}

impl PartDescriptor {
    /// Reads a leaf from the items of its parenthesized list.
    pub(crate) fn parse(path: &str, items: &[Value]) -> Result<Self, StructureError> {
        let fail = |message: &str| StructureError::new(path, message);
        if items.len() < 7 {
            return Err(fail("leaf part has fewer than seven fields"));
        }

        let kind = text(&items[0]).ok_or_else(|| fail("missing media type"))?;
        let subtype = text(&items[1]).ok_or_else(|| fail("missing media subtype"))?;
        let mime_type = format!("{kind}/{subtype}").to_ascii_lowercase();
        let params = pairs(&items[2]).ok_or_else(|| fail("malformed parameter list"))?;
        let size = items[6]
            .as_number()
            .ok_or_else(|| fail("size is not a number"))?;

        // Extension data moves by the type-specific fields in front of it.
        let rfc822 = mime_type == "message/rfc822";
        let (text_lines, extension) = if rfc822 {
            (items.get(9).and_then(Value::as_number), 10)
        } else if mime_type.starts_with("text/") {
            (items.get(7).and_then(Value::as_number), 8)
        } else {
            (None, 7)
        };
        let field = |offset: usize| items.get(extension + offset);

        let disposition = match field(1) {
            None | Some(Value::Nil) => None,
            Some(value) => Some(disposition(value).ok_or_else(|| fail("malformed disposition"))?),
        };

        let mut part = Self {
            path: path.to_string(),
            mime_type,
            params,
            content_id: text(&items[3]),
            description: text(&items[4]),
            encoding: text(&items[5])
                .map_or_else(TransferEncoding::default, |e| TransferEncoding::parse(&e)),
            size,
            filename: String::new(),
            text_lines,
            md5: field(0).and_then(text),
            disposition,
            language: field(2).map(language).unwrap_or_default(),
            location: field(3).and_then(text),
            envelope: rfc822.then(|| items.get(7).cloned()).flatten(),
            nested: rfc822.then(|| items.get(8).cloned()).flatten(),
        };
        part.filename = filename::resolve(&part);
        Ok(part)
    }

    /// Looks up a Content-Type parameter, case-insensitively.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The declared charset, if any.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    /// Content-ID without its angle brackets.
    #[must_use]
    pub fn cid(&self) -> Option<&str> {
        let id = self.content_id.as_deref()?.trim();
        let id = id.strip_prefix('<').unwrap_or(id);
        let id = id.strip_suffix('>').unwrap_or(id);
        (!id.is_empty()).then_some(id)
    }
}

/// Reads a string field. Eight-bit bytes that are not UTF-8 are taken
/// as Latin-1.
pub(crate) fn text(value: &Value) -> Option<String> {
    let bytes = value.as_bytes()?;
    Some(match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    })
}

/// Reads a `(key value key value ...)` list. `NIL` is an empty list.
fn pairs(value: &Value) -> Option<Vec<(String, String)>> {
    if value.is_nil() {
        return Some(Vec::new());
    }
    let items = value.as_list()?;
    if items.len() % 2 != 0 {
        return None;
    }
    items
        .chunks_exact(2)
        .map(|pair| Some((text(&pair[0])?, text(&pair[1]).unwrap_or_default())))
        .collect()
}

fn disposition(value: &Value) -> Option<Disposition> {
    let items = value.as_list()?;
    Some(Disposition {
        kind: text(items.first()?)?.to_ascii_lowercase(),
        params: items.get(1).map_or(Some(Vec::new()), pairs)?,
    })
}

fn language(value: &Value) -> Vec<String> {
    match value.as_list() {
        Some(items) => items.iter().filter_map(text).collect(),
        None => text(value).into_iter().collect(),
    }
}
