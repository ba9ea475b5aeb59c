//! OPML subscription lists.

use crate::error::{ErrorKind, Result};
use crate::models::{Outline, OutlineKind};
use exn::ResultExt;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Parse an OPML document into the flat list of its outlines.
///
/// Nested outlines are visited depth-first in document order. Outline types
/// other than `rss`, `include`, `link` (or no type at all) are logged and
/// skipped.
pub fn parse(data: &[u8]) -> Result<Vec<Outline>> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    let mut outlines = Vec::new();
    // Open elements above the current event; the root sits at depth 0.
    let mut depth = 0usize;
    let mut in_body = false;
    let mut has_body = false;

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .or_raise(|| ErrorKind::MalformedXml(format!("at byte {}", reader.buffer_position())))?;
        let (start, empty) = match event {
            Event::Start(start) => (start, false),
            Event::Empty(start) => (start, true),
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    in_body = false;
                }
                continue;
            },
            Event::Eof => break,
            _ => continue,
        };
        match (depth, start.name().as_ref()) {
            (0, b"opml") => {},
            (0, _) => exn::bail!(ErrorKind::InvalidDocument("OPML document")),
            (1, b"body") => {
                has_body = true;
                in_body = !empty;
            },
            (_, b"outline") if in_body => outlines.extend(outline(&start, reader.decoder())?),
            _ => {},
        }
        if !empty {
            depth += 1;
        }
    }

    if depth != 0 {
        exn::bail!(ErrorKind::MalformedXml("unexpected end of document".to_string()));
    }
    if !has_body {
        exn::bail!(ErrorKind::InvalidDocument("OPML document"));
    }
    Ok(outlines)
}

fn outline(start: &BytesStart<'_>, decoder: Decoder) -> Result<Option<Outline>> {
    let kind = attribute(start, "type", decoder)?;
    let Some(kind) = OutlineKind::from_attribute(kind.as_deref()) else {
        tracing::warn!(kind = kind.as_deref(), "outline type not supported");
        return Ok(None);
    };
    let uri = match kind {
        OutlineKind::Rss => attribute(start, "xmlUrl", decoder)?,
        OutlineKind::Include | OutlineKind::Link => attribute(start, "url", decoder)?,
        OutlineKind::Untyped => None,
    };
    Ok(Some(Outline {
        kind,
        text: attribute(start, "text", decoder)?,
        title: attribute(start, "title", decoder)?,
        category: attribute(start, "category", decoder)?,
        uri,
    }))
}

/// Unescaped and trimmed, `None` when missing or empty.
fn attribute(start: &BytesStart<'_>, name: &str, decoder: Decoder) -> Result<Option<String>> {
    let malformed = || ErrorKind::MalformedXml(format!("attribute {name}"));
    let Some(attribute) = start.try_get_attribute(name).or_raise(malformed)? else {
        return Ok(None);
    };
    let value = attribute.decode_and_unescape_value(decoder).or_raise(malformed)?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}
