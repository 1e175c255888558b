//! Sorting the leaves of a BODYSTRUCTURE tree into displayable content,
//! attachments and inline resources.

use std::collections::BTreeMap;

use serde::Serialize;

use super::part::{PartDescriptor, text};
use super::StructureError;
use crate::parser::Value;

/// A text body format the viewer can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    /// `text/plain`.
    Plain,
    /// `text/html`.
    Html,
}

impl ContentFormat {
    fn of(mime_type: &str) -> Option<Self> {
        match mime_type {
            "text/plain" => Some(Self::Plain),
            "text/html" => Some(Self::Html),
            _ => None,
        }
    }

    /// The other format.
    #[must_use]
    pub const fn alternative(self) -> Self {
        match self {
            Self::Plain => Self::Html,
            Self::Html => Self::Plain,
        }
    }
}

/// The leaves of one message, sorted by role.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    /// Displayable bodies per format, at most one each.
    pub contents: BTreeMap<ContentFormat, Vec<PartDescriptor>>,
    /// Everything offered for download, in tree order.
    pub attachments: Vec<PartDescriptor>,
    /// Resources referenced from an HTML body, keyed by bare Content-ID.
    pub inlines: BTreeMap<String, PartDescriptor>,
}

impl Classification {
    /// Classifies a `BODYSTRUCTURE` value.
    ///
    /// Part numbers follow RFC 3501: children of a multipart are numbered
    /// from 1 below their parent, and a single-part message is part `1`.
    /// `message/rfc822` parts are leaves; their own structure is kept on
    /// the descriptor but not walked.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError`] naming the first malformed part.
    pub fn classify(structure: &Value) -> Result<Self, StructureError> {
        let mut classification = Self::default();
        let items = structure
            .as_list()
            .ok_or_else(|| StructureError::new("", "body structure is not a list"))?;
        if is_multipart(items) {
            classification.walk_multipart("", items)?;
        } else {
            classification.add_leaf("1", items, None)?;
        }
        Ok(classification)
    }

    fn walk_multipart(&mut self, path: &str, items: &[Value]) -> Result<(), StructureError> {
        let children: Vec<&[Value]> = items.iter().map_while(Value::as_list).collect();
        let subtype = items
            .get(children.len())
            .and_then(text)
            .ok_or_else(|| StructureError::new(path, "multipart without subtype"))?
            .to_ascii_lowercase();

        for (index, child) in children.into_iter().enumerate() {
            let child_path = if path.is_empty() {
                (index + 1).to_string()
            } else {
                format!("{path}.{}", index + 1)
            };
            if is_multipart(child) {
                self.walk_multipart(&child_path, child)?;
            } else {
                self.add_leaf(&child_path, child, Some(&subtype))?;
            }
        }
        Ok(())
    }

    fn add_leaf(
        &mut self,
        path: &str,
        items: &[Value],
        parent: Option<&str>,
    ) -> Result<(), StructureError> {
        let part = PartDescriptor::parse(path, items)?;

        // The first plain and the first html body are content, any later
        // one is a download, related or not.
        if let Some(format) = ContentFormat::of(&part.mime_type) {
            if self.contents.contains_key(&format) {
                self.attachments.push(part);
            } else {
                self.contents.insert(format, vec![part]);
            }
            return Ok(());
        }

        if parent == Some("related") {
            if let Some(cid) = part.cid().map(str::to_string) {
                self.inlines.insert(cid, part);
                return Ok(());
            }
        }
        self.attachments.push(part);
        Ok(())
    }

    /// Returns true when anything is offered for download.
    #[must_use]
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// The attachment at part number `path`.
    #[must_use]
    pub fn find_attachment(&self, path: &str) -> Option<&PartDescriptor> {
        self.attachments.iter().find(|part| part.path == path)
    }

    /// The body to show in `format`.
    #[must_use]
    pub fn content(&self, format: ContentFormat) -> Option<&PartDescriptor> {
        self.contents.get(&format).and_then(|parts| parts.first())
    }

    /// `wanted` when the message has it, otherwise the other format, or
    /// `None` for a message without a displayable body.
    #[must_use]
    pub fn preferred_format(&self, wanted: ContentFormat) -> Option<ContentFormat> {
        [wanted, wanted.alternative()]
            .into_iter()
            .find(|format| self.content(*format).is_some())
    }

    /// The charset declared by whichever part sits at `path`.
    #[must_use]
    pub fn charset_of(&self, path: &str) -> Option<&str> {
        self.parts()
            .find(|part| part.path == path)
            .and_then(PartDescriptor::charset)
    }

    /// Every classified leaf: contents, then attachments, then inlines.
    pub fn parts(&self) -> impl Iterator<Item = &PartDescriptor> {
        self.contents
            .values()
            .flatten()
            .chain(&self.attachments)
            .chain(self.inlines.values())
    }
}

fn is_multipart(items: &[Value]) -> bool {
    matches!(items.first(), Some(Value::List(_)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::Lexer;

    fn classify(wire: &str) -> Classification {
        let value = Value::parse(&mut Lexer::new(wire.as_bytes())).unwrap();
        Classification::classify(&value).unwrap()
    }

    fn paths(parts: &[PartDescriptor]) -> Vec<&str> {
        parts.iter().map(|part| part.path.as_str()).collect()
    }

    const PLAIN: &str = r#"("TEXT" "PLAIN" ("CHARSET" "utf-8") NIL NIL "7BIT" 12 1 NIL NIL NIL NIL)"#;
    const HTML: &str = r#"("TEXT" "HTML" ("CHARSET" "iso-8859-1") NIL NIL "QUOTED-PRINTABLE" 40 2 NIL NIL NIL NIL)"#;

    #[test]
    fn test_single_part_is_part_one() {
        let c = classify(HTML);
        let html = c.content(ContentFormat::Html).unwrap();
        assert_eq!(html.path, "1");
        assert_eq!(html.charset(), Some("iso-8859-1"));
        assert_eq!(html.text_lines, Some(2));
        assert!(!c.has_attachments());
        assert_eq!(c.preferred_format(ContentFormat::Plain), Some(ContentFormat::Html));
    }

    #[test]
    fn test_second_plain_part_is_attachment() {
        let c = classify(&format!(r#"({PLAIN} {PLAIN} "MIXED")"#));
        assert_eq!(paths(&c.contents[&ContentFormat::Plain]), ["1"]);
        assert_eq!(paths(&c.attachments), ["2"]);
        assert_eq!(c.attachments[0].filename, "part_2");
    }

    #[test]
    fn test_nested_paths() {
        let pdf = r#"("APPLICATION" "PDF" ("NAME" "a.pdf") NIL NIL "BASE64" 100 NIL NIL NIL NIL)"#;
        let c = classify(&format!(
            r#"((({PLAIN} {HTML} "ALTERNATIVE") {pdf} "MIXED") {pdf} "MIXED")"#
        ));
        assert_eq!(paths(&c.contents[&ContentFormat::Plain]), ["1.1.1"]);
        assert_eq!(paths(&c.contents[&ContentFormat::Html]), ["1.1.2"]);
        assert_eq!(paths(&c.attachments), ["1.2", "2"]);
        assert_eq!(c.find_attachment("1.2").unwrap().filename, "a.pdf");
        assert!(c.find_attachment("1.1.1").is_none());
    }

    #[test]
    fn test_related_parts_with_cid_are_inline() {
        let logo = r#"("IMAGE" "PNG" ("NAME" "logo.png") "<logo@x>" NIL "BASE64" 300 NIL ("INLINE" NIL) NIL NIL)"#;
        let orphan = r#"("IMAGE" "GIF" NIL NIL NIL "BASE64" 30 NIL NIL NIL NIL)"#;
        let c = classify(&format!(r#"({HTML} {logo} {orphan} "RELATED")"#));

        let inline = &c.inlines["logo@x"];
        assert_eq!(inline.path, "2");
        assert_eq!(inline.disposition.as_ref().unwrap().kind, "inline");
        assert_eq!(paths(&c.attachments), ["3"]);
        assert_eq!(c.attachments[0].filename, "part_3");
    }

    #[test]
    fn test_cid_outside_related_is_attachment() {
        let image = r#"("IMAGE" "PNG" NIL "<img@x>" NIL "BASE64" 300 NIL NIL NIL NIL)"#;
        let c = classify(&format!(r#"({PLAIN} {image} "MIXED")"#));
        assert!(c.inlines.is_empty());
        assert_eq!(paths(&c.attachments), ["2"]);
    }

    #[test]
    fn test_rfc822_is_not_descended() {
        let inner = r#"("MESSAGE" "RFC822" NIL NIL NIL "7BIT" 500 (NIL "Hi" NIL NIL NIL NIL NIL NIL NIL NIL) ("TEXT" "PLAIN" NIL NIL NIL "7BIT" 10 1) 20 NIL ("ATTACHMENT" ("FILENAME" "fwd.eml")) NIL NIL)"#;
        let c = classify(&format!(r#"({PLAIN} {inner} "MIXED")"#));

        assert_eq!(c.contents.len(), 1);
        let forwarded = c.find_attachment("2").unwrap();
        assert_eq!(forwarded.text_lines, Some(20));
        assert_eq!(forwarded.filename, "fwd.eml");
        assert!(forwarded.envelope.is_some());
        assert!(forwarded.nested.as_ref().unwrap().as_list().is_some());
    }

    #[test]
    fn test_encoded_names() {
        let extended = r#"("APPLICATION" "PDF" ("NAME*" "utf-8''r%C3%A9sum%C3%A9.pdf") NIL NIL "BASE64" 10 NIL NIL NIL NIL)"#;
        let words = r#"("APPLICATION" "OCTET-STREAM" NIL NIL NIL "BASE64" 10 NIL ("ATTACHMENT" ("FILENAME" "=?utf-8?q?na=C3=AFve.txt?=")) NIL NIL)"#;
        let c = classify(&format!(r#"({PLAIN} {extended} {words} "MIXED")"#));
        assert_eq!(c.attachments[0].filename, "r\u{e9}sum\u{e9}.pdf");
        assert_eq!(c.attachments[1].filename, "na\u{ef}ve.txt");
    }

    #[test]
    fn test_minimal_leaf_without_extensions() {
        let c = classify(r#"("APPLICATION" "ZIP" NIL NIL NIL "BASE64" 42)"#);
        let zip = c.find_attachment("1").unwrap();
        assert_eq!(zip.size, 42);
        assert!(zip.disposition.is_none());
        assert!(zip.language.is_empty());
        assert_eq!(c.preferred_format(ContentFormat::Html), None);
    }

    #[test]
    fn test_charset_of_any_part() {
        let c = classify(&format!(r#"({PLAIN} {HTML} "ALTERNATIVE")"#));
        assert_eq!(c.charset_of("2"), Some("iso-8859-1"));
        assert_eq!(c.charset_of("9"), None);
    }

    #[test]
    fn test_truncated_leaf_names_its_path() {
        let value = Value::parse(&mut Lexer::new(
            format!(r#"({PLAIN} ("IMAGE" "PNG" NIL) "MIXED")"#).as_bytes(),
        ))
        .unwrap();
        let err = Classification::classify(&value).unwrap_err();
        assert_eq!(err.path, "2");
    }

    #[test]
    fn test_serializes_formats_lowercase() {
        let c = classify(HTML);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["contents"]["html"][0]["path"], "1");
        assert_eq!(json["contents"]["html"][0]["encoding"], "quoted-printable");
    }
}
