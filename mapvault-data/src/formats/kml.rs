//! KML placemark counter.
//!
//! The document is streamed with `quick-xml`; nothing is kept beyond the
//! current nesting depth and a running count.

use mapvault_core::KmlMetadata;
use quick_xml::{Reader, events::Event};
use thiserror::Error;

/// Structural problems found in a KML document.
#[derive(Debug, Error)]
pub enum KmlError {
    /// The XML tokenizer rejected the input.
    #[error("invalid XML at byte {position}: {source}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
    /// The document contained no element at all.
    #[error("document has no root element")]
    NoRootElement,
    /// A second element started after the root closed.
    #[error("document has more than one root element")]
    MultipleRootElements,
    /// Character data appeared outside the root element.
    #[error("text outside the root element")]
    TextOutsideRoot,
    /// An end tag appeared with no open element.
    #[error("unexpected closing tag")]
    UnexpectedClose,
    /// The input ended with elements still open.
    #[error("{open} element(s) left unclosed")]
    Unclosed { open: usize },
}

/// Count `Placemark` elements, matching by local name so that prefixed
/// elements such as `<kml:Placemark>` are included.
///
/// # Examples
///
/// ```
/// use mapvault_data::parse_kml;
///
/// let doc = br#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document>
///     <Placemark><name>A</name></Placemark>
///     <Placemark/>
/// </Document></kml>"#;
/// assert_eq!(parse_kml(doc)?.placemarks, 2);
/// # Ok::<(), mapvault_data::KmlError>(())
/// ```
pub fn parse_kml(bytes: &[u8]) -> Result<KmlMetadata, KmlError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut depth = 0_usize;
    let mut seen_root = false;
    let mut placemarks = 0_u64;

    loop {
        let event = reader.read_event().map_err(|source| KmlError::Syntax {
            position: reader.error_position(),
            source,
        })?;
        match event {
            Event::Start(ref element) | Event::Empty(ref element) => {
                claim_root(depth, &mut seen_root)?;
                if element.local_name().as_ref() == b"Placemark" {
                    placemarks += 1;
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth.checked_sub(1).ok_or(KmlError::UnexpectedClose)?;
            }
            Event::Text(ref text) if depth == 0 && !text.iter().all(u8::is_ascii_whitespace) => {
                return Err(KmlError::TextOutsideRoot);
            }
            Event::CData(_) if depth == 0 => return Err(KmlError::TextOutsideRoot),
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(KmlError::NoRootElement);
    }
    if depth > 0 {
        return Err(KmlError::Unclosed { open: depth });
    }
    Ok(KmlMetadata { placemarks })
}

/// An element opening at depth zero is the root; only one is allowed.
fn claim_root(depth: usize, seen_root: &mut bool) -> Result<(), KmlError> {
    if depth > 0 {
        return Ok(());
    }
    if *seen_root {
        return Err(KmlError::MultipleRootElements);
    }
    *seen_root = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::none("<kml><Document/></kml>", 0)]
    #[case::nested(
        "<kml><Document><Folder><Placemark/><Placemark><name>b</name></Placemark></Folder></Document></kml>",
        2
    )]
    #[case::prefixed(
        r#"<kml:kml xmlns:kml="http://www.opengis.net/kml/2.2"><kml:Placemark/></kml:kml>"#,
        1
    )]
    #[case::declaration_and_comments(
        "<?xml version=\"1.0\"?>\n<!-- export -->\n<kml><Placemark/></kml>\n",
        1
    )]
    #[case::lookalike_names("<kml><PlacemarkStyle/><placemark/></kml>", 0)]
    #[case::self_closing_root("<Placemark/>", 1)]
    fn counts_placemarks(#[case] doc: &str, #[case] expected: u64) {
        let metadata = parse_kml(doc.as_bytes()).expect("well-formed KML");
        assert_eq!(metadata.placemarks, expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   \n")]
    #[case::plain_text("just some text")]
    #[case::mismatched("<kml><Document></kml></Document>")]
    #[case::unclosed("<kml><Document>")]
    #[case::stray_close("<kml/></Document>")]
    #[case::two_roots("<kml/><kml/>")]
    #[case::trailing_text("<kml/>trailing")]
    fn rejects_malformed_markup(#[case] doc: &str) {
        assert!(parse_kml(doc.as_bytes()).is_err(), "accepted: {doc:?}");
    }

    #[rstest]
    fn reports_missing_root() {
        assert!(matches!(
            parse_kml(b"<!-- nothing here -->"),
            Err(KmlError::NoRootElement)
        ));
    }
}
