//! Display filenames for parts.

use webmail_mime::param::decode_parameter;

use super::PartDescriptor;

/// Picks the filename to show for `part`.
///
/// The Content-Type `name` wins over the disposition `filename`; either
/// may be RFC 2231 or RFC 2047 encoded. A missing, empty or undecodable
/// name falls back to `part_<path>`.
pub(super) fn resolve(part: &PartDescriptor) -> String {
    let declared = decode_parameter(&part.params, "name").or_else(|| {
        part.disposition
            .as_ref()
            .and_then(|disposition| decode_parameter(&disposition.params, "filename"))
    });

    match declared {
        Some(Ok(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(Err(e)) => {
            tracing::debug!(path = %part.path, %e, "undecodable part filename");
            synthesized(&part.path)
        }
        _ => synthesized(&part.path),
    }
}

fn synthesized(path: &str) -> String {
    format!("part_{path}")
}
