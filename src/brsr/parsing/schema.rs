use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};
use scraper::Html;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use super::{decode_content, year_of, DocumentParser, LINK_NS, XBRLDI_NS, XBRLI_NS, XSI_NS};
use crate::core::types::{ParsedDocument, QName, RawFact, SourceTier};
use crate::error::{Error, Result};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Instance-aware parser: resolves contexts and units by id and understands
/// nil facts, before handing facts to the mapper.
#[derive(Debug, Default, Clone)]
pub struct SchemaParser;

impl SchemaParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for SchemaParser {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn parse(&self, content: &[u8]) -> Result<ParsedDocument> {
        let text = decode_content(content)?;
        let xml_tree = Document::parse(&text)
            .map_err(|e| Error::Parse(format!("instance could not be loaded: {}", e)))?;

        let root = xml_tree.root_element();
        if root.tag_name().name() != "xbrl" {
            return Err(Error::Parse(format!(
                "expected an xbrl root element, found '{}'",
                root.tag_name().name()
            )));
        }

        let (entity_id, reporting_year) = scan_contexts(root);
        let units = collect_units(root);

        let mut facts = Vec::new();
        let mut entity_name: Option<String> = None;

        for fact_elem in root.children().filter(|n| is_fact_element(n)) {
            let local_name = fact_elem.tag_name().name();

            if fact_elem.children().any(|c| c.is_element()) {
                debug!("Skipping tuple {}", local_name);
                continue;
            }
            if fact_elem.attribute((XSI_NS, "nil")) == Some("true") {
                debug!("Skipping nil fact {}", local_name);
                continue;
            }

            let value = sanitize_value(fact_elem.text().unwrap_or(""));
            if entity_name.is_none() && local_name.contains("CompanyName") && !value.is_empty() {
                entity_name = Some(value.clone());
            }

            let unit = fact_elem
                .attribute("unitRef")
                .and_then(|unit_ref| units.get(unit_ref))
                .cloned();

            facts.push(RawFact {
                qname: QName::new(fact_elem.tag_name().namespace(), local_name),
                value,
                unit,
                context_ref: fact_elem.attribute("contextRef").map(str::to_string),
                source: SourceTier::Xbrl,
            });
        }

        info!("Extracted {} facts from XBRL", facts.len());
        ParsedDocument::new(entity_id, entity_name, reporting_year, facts)
    }
}

/// Entity identifier and period-end year. Later contexts override earlier ones.
fn scan_contexts(root: Node) -> (Option<String>, Option<i32>) {
    let mut entity_id = None;
    let mut year = None;

    for context in root.descendants().filter(|n| n.has_tag_name((XBRLI_NS, "context"))) {
        if let Some(identifier) = context
            .descendants()
            .find(|n| n.has_tag_name((XBRLI_NS, "identifier")))
            .and_then(|n| n.text())
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            entity_id = Some(identifier.to_string());
        }

        if let Some(period) = context.children().find(|n| n.has_tag_name((XBRLI_NS, "period"))) {
            let end = period
                .children()
                .find(|n| n.has_tag_name((XBRLI_NS, "endDate")) || n.has_tag_name((XBRLI_NS, "instant")))
                .and_then(|n| n.text())
                .and_then(year_of);
            if end.is_some() {
                year = end;
            }
        }
    }

    (entity_id, year)
}

/// unit id -> first declared measure
fn collect_units(root: Node) -> HashMap<String, String> {
    let mut units = HashMap::new();
    for unit in root.children().filter(|n| n.has_tag_name((XBRLI_NS, "unit"))) {
        let Some(id) = unit.attribute("id") else {
            continue;
        };
        if let Some(measure) = unit
            .descendants()
            .find(|n| n.has_tag_name((XBRLI_NS, "measure")))
            .and_then(|n| n.text())
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            units.insert(id.to_string(), measure.to_string());
        }
    }
    units
}

fn is_fact_element(node: &Node) -> bool {
    if !node.is_element() {
        return false;
    }
    match node.tag_name().namespace() {
        Some(ns) => ![XBRLI_NS, LINK_NS, XBRLDI_NS].contains(&ns),
        None => false,
    }
}

/// NFKC-normalise, strip embedded HTML from text blocks and collapse whitespace.
fn sanitize_value(input: &str) -> String {
    let mut output: String = input.nfkc().collect();

    if output.contains('<') {
        let fragment = Html::parse_fragment(&output);
        output = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    }

    WHITESPACE.replace_all(output.trim(), " ").to_string()
}
