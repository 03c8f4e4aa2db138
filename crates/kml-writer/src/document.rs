//! URL embedding and document well-formedness checks.

use quick_xml::events::Event;
use quick_xml::Reader;

/// How a URL is embedded inside a markup element.
///
/// Export URLs carry `&`-joined query strings; left raw they corrupt the
/// document. The CDATA form is preferred for such URLs because viewers
/// read the section verbatim, while the escaped form round-trips through
/// strict parsers that reject stray CDATA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedStrategy {
    /// Wrap in `<![CDATA[...]]>`.
    Cdata,
    /// Entity-escape reserved characters.
    Escaped,
}

impl EmbedStrategy {
    /// The strategy tried first for a given URL.
    pub fn preferred_for(url: &str) -> Self {
        if url.contains(['&', '<', '>']) {
            EmbedStrategy::Cdata
        } else {
            EmbedStrategy::Escaped
        }
    }

    /// The one retry: the other strategy.
    pub fn alternate(&self) -> Self {
        match self {
            EmbedStrategy::Cdata => EmbedStrategy::Escaped,
            EmbedStrategy::Escaped => EmbedStrategy::Cdata,
        }
    }

    /// Render the URL for element content under this strategy.
    pub fn embed(&self, url: &str) -> String {
        match self {
            // A literal "]]>" inside the URL would terminate the section;
            // split it across two sections.
            EmbedStrategy::Cdata => {
                format!("<![CDATA[{}]]>", url.replace("]]>", "]]]]><![CDATA[>"))
            }
            EmbedStrategy::Escaped => quick_xml::escape::escape(url).into_owned(),
        }
    }
}

/// Check that a document parses cleanly end to end.
///
/// Returns the parser's diagnostic on failure so the assembler can log
/// it before retrying with the alternate embedding.
pub fn validate_kml(doc: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(doc);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => return Ok(()),
            // Unescape text so undeclared entities (a raw '&' from an
            // unwrapped query string) are caught, not passed through.
            Ok(Event::Text(t)) => {
                if let Err(e) = t.unescape() {
                    return Err(format!(
                        "invalid text at position {}: {:?}",
                        reader.buffer_position(),
                        e
                    ));
                }
            }
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "parse error at position {}: {:?}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
        buf.clear();
    }
}
