use log::{error, info, warn};
use roxmltree::Document;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::brsr::parsing::{decode_content, LINK_NS, XLINK_NS};
use crate::error::{Error, Result};

/// Load element name -> human readable label from a label linkbase.
/// Missing or unreadable files give an empty table.
pub fn load_label_linkbase(path: &Path, concept_prefix: &str) -> HashMap<String, String> {
    if !path.exists() {
        warn!("Taxonomy label file not found: {}", path.display());
        return HashMap::new();
    }

    let labels = fs::read(path)
        .map_err(Error::from)
        .and_then(|bytes| parse_label_linkbase(&bytes, concept_prefix));

    match labels {
        Ok(labels) => {
            info!("Loaded {} taxonomy labels from {}", labels.len(), path.display());
            labels
        }
        Err(e) => {
            error!("Failed to parse taxonomy labels: {}", e);
            HashMap::new()
        }
    }
}

/// Joins `link:loc` -> `link:labelArc` -> `link:label` on their xlink labels.
pub fn parse_label_linkbase(content: &[u8], concept_prefix: &str) -> Result<HashMap<String, String>> {
    let text = decode_content(content)?;
    let xml_tree = Document::parse(&text)
        .map_err(|e| Error::Parse(format!("label linkbase could not be loaded: {}", e)))?;

    let mut label_text: HashMap<&str, &str> = HashMap::new();
    let mut arcs: HashMap<&str, &str> = HashMap::new();
    let mut locators: Vec<(&str, &str)> = Vec::new();

    for node in xml_tree.descendants().filter(|n| n.is_element()) {
        if node.has_tag_name((LINK_NS, "label")) {
            if let (Some(id), Some(text)) = (node.attribute((XLINK_NS, "label")), node.text()) {
                let text = text.trim();
                if !text.is_empty() {
                    label_text.insert(id, text);
                }
            }
        } else if node.has_tag_name((LINK_NS, "labelArc")) {
            if let (Some(from), Some(to)) = (
                node.attribute((XLINK_NS, "from")),
                node.attribute((XLINK_NS, "to")),
            ) {
                arcs.insert(from, to);
            }
        } else if node.has_tag_name((LINK_NS, "loc")) {
            if let (Some(href), Some(label)) = (
                node.attribute((XLINK_NS, "href")),
                node.attribute((XLINK_NS, "label")),
            ) {
                locators.push((href, label));
            }
        }
    }

    let mut labels = HashMap::new();
    for (href, loc_label) in locators {
        let Some((_, element_id)) = href.split_once('#') else {
            continue;
        };
        let element_name = element_id.strip_prefix(concept_prefix).unwrap_or(element_id);
        if let Some(text) = arcs.get(loc_label).and_then(|to| label_text.get(to)) {
            labels.insert(element_name.to_string(), text.to_string());
        }
    }

    Ok(labels)
}
