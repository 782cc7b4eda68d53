use log::info;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use super::{DocumentParser, XBRLI_NS};
use crate::core::types::{ParsedDocument, QName, RawFact, SourceTier};
use crate::error::{Error, Result};

/// Streaming, namespace-aware fallback parser. Knows nothing about the
/// taxonomy: contexts are found by the instance namespace, facts are leaf
/// elements in the disclosure namespace. No unit resolution.
#[derive(Debug, Clone)]
pub struct LexicalParser {
    disclosure_namespace: String,
}

impl LexicalParser {
    pub fn new(disclosure_namespace: &str) -> Self {
        Self {
            disclosure_namespace: disclosure_namespace.to_string(),
        }
    }
}

struct Frame {
    namespace: Option<String>,
    local_name: String,
    context_ref: Option<String>,
    text: String,
    has_children: bool,
}

impl Frame {
    fn open(namespace: Option<String>, e: &BytesStart) -> Result<Self> {
        let context_ref = match e
            .try_get_attribute("contextRef")
            .map_err(|e| Error::Parse(format!("bad attribute: {}", e)))?
        {
            Some(attr) => Some(
                attr.unescape_value()
                    .map_err(|e| Error::Parse(format!("bad contextRef value: {}", e)))?
                    .into_owned(),
            ),
            None => None,
        };

        Ok(Self {
            namespace,
            local_name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            context_ref,
            text: String::new(),
            has_children: false,
        })
    }

    fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name == local_name
    }
}

#[derive(Default)]
struct Scan {
    stack: Vec<Frame>,
    saw_root: bool,
    entity_id: Option<String>,
    entity_name: Option<String>,
    year: Option<i32>,
    facts: Vec<RawFact>,
}

impl Scan {
    fn push(&mut self, frame: Frame) {
        if let Some(parent) = self.stack.last_mut() {
            parent.has_children = true;
        }
        self.saw_root = true;
        self.stack.push(frame);
    }

    fn pop(&mut self, disclosure_namespace: &str) -> Result<()> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::Parse("closing tag without matching opening tag".into()))?;
        let inside_context = self.stack.iter().any(|f| f.is(XBRLI_NS, "context"));
        let text = frame.text.trim();

        if inside_context && frame.is(XBRLI_NS, "identifier") && !text.is_empty() {
            self.entity_id = Some(text.to_string());
        }
        if inside_context && frame.is(XBRLI_NS, "endDate") {
            if let Some(year) = text.get(..4).and_then(|y| y.parse::<i32>().ok()) {
                self.year = Some(year);
            }
        }

        if frame.has_children || text.is_empty() {
            return Ok(());
        }
        let Some(namespace) = frame.namespace.as_deref() else {
            return Ok(());
        };
        if !namespace.contains(disclosure_namespace) {
            return Ok(());
        }

        if self.entity_name.is_none() && frame.local_name.contains("CompanyName") {
            self.entity_name = Some(text.to_string());
        }

        self.facts.push(RawFact {
            qname: QName::new(Some(namespace), &frame.local_name),
            value: text.to_string(),
            unit: None,
            context_ref: frame.context_ref.clone(),
            source: SourceTier::Xbrl,
        });
        Ok(())
    }
}

fn namespace_uri(resolved: &ResolveResult) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    }
}

impl DocumentParser for LexicalParser {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn parse(&self, content: &[u8]) -> Result<ParsedDocument> {
        let mut reader = NsReader::from_reader(content);
        reader.config_mut().trim_text(true);

        let mut scan = Scan::default();
        let mut buf = Vec::new();

        loop {
            let (resolved, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(|e| Error::Parse(format!("lexical parsing failed: {}", e)))?;

            match event {
                Event::Start(e) => {
                    let frame = Frame::open(namespace_uri(&resolved), &e)?;
                    scan.push(frame);
                }
                Event::Empty(e) => {
                    let frame = Frame::open(namespace_uri(&resolved), &e)?;
                    scan.push(frame);
                    scan.pop(&self.disclosure_namespace)?;
                }
                Event::End(_) => scan.pop(&self.disclosure_namespace)?,
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::Parse(format!("bad text content: {}", e)))?;
                    if let Some(top) = scan.stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    if let Some(top) = scan.stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !scan.saw_root {
            return Err(Error::Parse("document has no root element".into()));
        }
        if !scan.stack.is_empty() {
            return Err(Error::Parse("unexpected end of document".into()));
        }

        info!("Extracted {} facts using lexical fallback", scan.facts.len());
        if scan.entity_id.is_none() {
            return Err(Error::Validation(
                "Could not determine company_id in lexical fallback".into(),
            ));
        }
        if scan.year.is_none() {
            return Err(Error::Validation(
                "Could not determine reporting_year in lexical fallback".into(),
            ));
        }
        ParsedDocument::new(scan.entity_id, scan.entity_name, scan.year, scan.facts)
    }
}
