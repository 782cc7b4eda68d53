use log::{debug, error, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use strum::Display;

use super::labels::load_label_linkbase;
use crate::core::config::ExtractorConfig;
use crate::core::types::{DataSource, RawFact, SourceTier};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Environmental,
    Social,
    Governance,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    Boolean,
    Integer,
    Float,
    /// Also covers unrecognised type names; values are auto-detected
    #[default]
    #[serde(other)]
    String,
}

/// Which lookup tier produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum MappingTier {
    #[default]
    Curated,
    Alias,
    TaxonomyLabel,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorMapping {
    pub indicator_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: Category,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_type: DataType,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(skip)]
    pub mapping_tier: MappingTier,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl IndicatorMapping {
    fn with_tier(&self, tier: MappingTier) -> Self {
        Self {
            mapping_tier: tier,
            ..self.clone()
        }
    }

    /// Provenance tag for a record mapped through this entry.
    pub fn data_source(&self, source: SourceTier) -> DataSource {
        if source == SourceTier::PublicApi {
            return DataSource::PublicApi;
        }
        match self.mapping_tier {
            MappingTier::Curated | MappingTier::Alias => DataSource::Xbrl,
            MappingTier::TaxonomyLabel => DataSource::XbrlTaxonomy,
            MappingTier::Partial => DataSource::XbrlPartial,
        }
    }
}

/// On-disk layout of the curated mapping file. Entries stay untyped so one
/// malformed entry only costs itself.
#[derive(Debug, Default, Deserialize)]
struct MappingFile {
    #[serde(default)]
    mappings: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    alternative_names: HashMap<String, String>,
}

/// Maps raw local names to canonical indicators. Immutable once built.
#[derive(Debug, Default, Clone)]
pub struct MetricMapper {
    /// Ordered by key so the partial tier is reproducible
    curated: BTreeMap<String, IndicatorMapping>,
    aliases: HashMap<String, String>,
    labels: HashMap<String, String>,
}

impl MetricMapper {
    pub fn new(
        curated: BTreeMap<String, IndicatorMapping>,
        aliases: HashMap<String, String>,
        labels: HashMap<String, String>,
    ) -> Self {
        Self {
            curated,
            aliases,
            labels,
        }
    }

    /// Load both tables named in the config. Missing or broken files are
    /// logged and leave that table empty.
    pub fn load(config: &ExtractorConfig) -> Self {
        let (curated, aliases) = match read_mapping_file(&config.taxonomy_mapping_path) {
            Ok(Some(tables)) => tables,
            Ok(None) => {
                warn!(
                    "Taxonomy mapping file not found: {}",
                    config.taxonomy_mapping_path.display()
                );
                Default::default()
            }
            Err(e) => {
                error!("Failed to load taxonomy mapping: {}", e);
                Default::default()
            }
        };
        info!("Loaded {} curated mappings, {} aliases", curated.len(), aliases.len());

        let labels = load_label_linkbase(&config.label_linkbase_path, &config.label_concept_prefix);
        Self::new(curated, aliases, labels)
    }

    pub fn curated_len(&self) -> usize {
        self.curated.len()
    }

    pub fn label_len(&self) -> usize {
        self.labels.len()
    }

    pub fn map_fact(&self, fact: &RawFact) -> Option<(String, IndicatorMapping)> {
        self.map_local_name(fact.local_name())
    }

    /// Curated, then alias, then taxonomy label, then partial substring match.
    pub fn map_local_name(&self, local_name: &str) -> Option<(String, IndicatorMapping)> {
        if let Some(mapping) = self.curated.get(local_name) {
            return Some((mapping.indicator_name.clone(), mapping.with_tier(MappingTier::Curated)));
        }

        if let Some(mapping) = self
            .aliases
            .get(local_name)
            .and_then(|canonical| self.curated.get(canonical))
        {
            return Some((mapping.indicator_name.clone(), mapping.with_tier(MappingTier::Alias)));
        }

        if let Some(label) = self.labels.get(local_name) {
            return Some((
                label.clone(),
                IndicatorMapping {
                    indicator_name: label.clone(),
                    category: Category::Other,
                    data_type: DataType::String,
                    unit: None,
                    mapping_tier: MappingTier::TaxonomyLabel,
                },
            ));
        }

        if local_name.is_empty() {
            return None;
        }
        let needle = local_name.to_lowercase();
        self.curated
            .iter()
            .find(|(key, _)| {
                let key = key.to_lowercase();
                key.contains(&needle) || needle.contains(&key)
            })
            .map(|(key, mapping)| {
                debug!("Partial match: {} -> {}", local_name, key);
                (mapping.indicator_name.clone(), mapping.with_tier(MappingTier::Partial))
            })
    }
}

type Tables = (BTreeMap<String, IndicatorMapping>, HashMap<String, String>);

fn read_mapping_file(path: &Path) -> Result<Option<Tables>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let file: MappingFile = serde_json::from_str(&content)?;

    let mut curated = BTreeMap::new();
    for (category, entries) in file.mappings {
        for (local_name, entry) in entries {
            match serde_json::from_value::<IndicatorMapping>(entry) {
                Ok(mapping) => {
                    curated.insert(local_name, mapping);
                }
                Err(e) => warn!("Skipping mapping {}/{}: {}", category, local_name, e),
            }
        }
    }
    Ok(Some((curated, file.alternative_names)))
}
