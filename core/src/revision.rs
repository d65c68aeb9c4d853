//! Pulls the revision text out of a MediaWiki API response.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

use crate::error::CheckError;

const REVISION_ELEMENT: &[u8] = b"rev";
const TIMESTAMP_ATTRIBUTE: &str = "timestamp";

/// Raw markup of one revision plus its timestamp, as delivered by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevisionContent {
    pub content: String,
    pub timestamp: Option<String>,
}

impl RevisionContent {
    pub fn new(content: impl Into<String>, timestamp: Option<String>) -> Self {
        Self {
            content: content.into(),
            timestamp,
        }
    }
}

/// Single forward pass over the XML envelope. Text is collected only inside
/// `<rev>`; every other element is skipped. A payload without `<rev>` yields
/// empty content.
pub fn extract_revision(payload: &str) -> Result<RevisionContent, CheckError> {
    let mut reader = Reader::from_str(payload);
    reader.trim_text(false);

    let mut content = String::new();
    let mut timestamp = None;
    let mut in_revision = false;
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        let event = reader.read_event().map_err(|e| malformed(&reader, e))?;
        match event {
            Event::Start(start) => {
                depth += 1;
                saw_root = true;
                if start.name().as_ref() == REVISION_ELEMENT {
                    timestamp = revision_timestamp(&start)?;
                    in_revision = true;
                }
            }
            Event::Empty(start) => {
                saw_root = true;
                if start.name().as_ref() == REVISION_ELEMENT {
                    timestamp = revision_timestamp(&start)?;
                }
            }
            Event::End(end) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CheckError::MalformedPayload("unbalanced end tag".into()))?;
                if end.name().as_ref() == REVISION_ELEMENT {
                    in_revision = false;
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| malformed(&reader, e))?;
                if depth == 0 && !text.trim().is_empty() {
                    return Err(CheckError::MalformedPayload(
                        "text outside the root element".into(),
                    ));
                }
                if in_revision {
                    content.push_str(&text);
                }
            }
            Event::CData(data) => {
                if in_revision {
                    content.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(CheckError::MalformedPayload("no root element".into()));
    }
    if depth != 0 {
        return Err(CheckError::MalformedPayload(format!(
            "{depth} element(s) left unclosed"
        )));
    }

    Ok(RevisionContent { content, timestamp })
}

fn revision_timestamp(
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<Option<String>, CheckError> {
    let attribute = start
        .try_get_attribute(TIMESTAMP_ATTRIBUTE)
        .map_err(|e| CheckError::MalformedPayload(format!("bad attribute on <rev>: {e}")))?;
    match attribute {
        Some(attribute) => {
            let value = attribute
                .unescape_value()
                .map_err(|e| CheckError::MalformedPayload(format!("bad timestamp: {e}")))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

fn malformed(reader: &Reader<&[u8]>, err: quick_xml::Error) -> CheckError {
    CheckError::MalformedPayload(format!(
        "{err} at byte {}",
        reader.buffer_position()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"<?xml version="1.0"?><api><query><pages><page pageid="1" ns="0" title="Test"><revisions><rev timestamp="2012-03-01T10:00:00Z" xml:space="preserve">Hello &amp; ''welcome''
* item</rev></revisions></page></pages></query></api>"#;

    #[test]
    fn extracts_text_and_timestamp() {
        let revision = extract_revision(PAYLOAD).unwrap();
        assert_eq!(revision.content, "Hello & ''welcome''\n* item");
        assert_eq!(revision.timestamp.as_deref(), Some("2012-03-01T10:00:00Z"));
    }

    #[test]
    fn missing_revision_yields_empty_content() {
        let payload = r#"<api><query><pages><page ns="0" title="Nope" missing=""/></pages></query></api>"#;
        let revision = extract_revision(payload).unwrap();
        assert!(revision.content.is_empty());
        assert_eq!(revision.timestamp, None);
    }

    #[test]
    fn ignores_text_of_other_elements() {
        let payload = r#"<api><warnings>deprecated</warnings><rev timestamp="t">body</rev></api>"#;
        let revision = extract_revision(payload).unwrap();
        assert_eq!(revision.content, "body");
    }

    #[test]
    fn keeps_cdata_inside_revision() {
        let payload = r#"<api><rev><![CDATA[a <b> c]]></rev></api>"#;
        assert_eq!(extract_revision(payload).unwrap().content, "a <b> c");
    }

    #[test]
    fn rejects_malformed_envelopes() {
        for payload in [
            "",
            "not xml at all",
            "<api><rev>unclosed",
            "<api><rev>x</api></rev>",
            "<api><rev>&bogus;</rev></api>",
        ] {
            let err = extract_revision(payload).unwrap_err();
            assert!(
                matches!(err, CheckError::MalformedPayload(_)),
                "expected malformed payload for {payload:?}, got {err:?}"
            );
        }
    }
}
