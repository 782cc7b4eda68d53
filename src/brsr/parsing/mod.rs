pub mod lexical;
pub mod schema;
#[cfg(test)]
pub mod tests;

use log::{info, warn};
use std::borrow::Cow;

use crate::core::types::ParsedDocument;
use crate::error::{Error, Result};

pub use lexical::LexicalParser;
pub use schema::SchemaParser;

pub const XBRLI_NS: &str = "http://www.xbrl.org/2003/instance";
pub const LINK_NS: &str = "http://www.xbrl.org/2003/linkbase";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XBRLDI_NS: &str = "http://xbrl.org/2006/xbrldi";

/// A way of turning instance bytes into a validated document.
pub trait DocumentParser: Send + Sync {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &[u8]) -> Result<ParsedDocument>;
}

/// Parsers tried in priority order. Advances only on error.
pub struct ParserChain {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl ParserChain {
    pub fn new(parsers: Vec<Box<dyn DocumentParser>>) -> Self {
        Self { parsers }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    pub fn parse(&self, content: &[u8]) -> Result<ParsedDocument> {
        let mut last_error = Error::Parse("no document parser configured".into());

        for (i, parser) in self.parsers.iter().enumerate() {
            match parser.parse(content) {
                Ok(doc) => {
                    info!(
                        "Parsed with {} parser for {} ({} facts)",
                        parser.name(),
                        doc.entity_id(),
                        doc.facts().len()
                    );
                    return Ok(doc);
                }
                Err(e) => {
                    if i + 1 < self.parsers.len() {
                        warn!("{} parsing failed, trying next parser: {}", parser.name(), e);
                    } else {
                        warn!("{} parsing failed: {}", parser.name(), e);
                    }
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// Decode instance bytes as UTF-8, dropping a leading BOM.
pub fn decode_content(content: &[u8]) -> Result<Cow<'_, str>> {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(content);
    if had_errors {
        return Err(Error::Parse("document is not valid UTF-8".into()));
    }
    Ok(text)
}

/// Year of an `xs:date` / `xs:dateTime` period boundary.
pub fn year_of(date_text: &str) -> Option<i32> {
    let trimmed = date_text.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(|d| chrono::Datelike::year(&d))
}
