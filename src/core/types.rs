use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use strum::Display;

use crate::error::{Error, Result};

/// Namespace-qualified element name of a fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QName {
    pub namespace: Option<String>,
    pub local_name: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local_name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local_name: local_name.to_string(),
        }
    }

    pub fn local(local_name: &str) -> Self {
        Self::new(None, local_name)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Where a fact came from. Drives the source adjustment of the quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceTier {
    /// Either parser over the filed instance document
    Xbrl,
    /// External market-data fallback
    PublicApi,
    Manual,
}

/// An extracted, unmapped field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFact {
    pub qname: QName,
    pub value: String,
    pub unit: Option<String>,
    pub context_ref: Option<String>,
    pub source: SourceTier,
}

impl RawFact {
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }
}

/// Result of a successful parse. Only constructible with an entity id and a
/// positive reporting year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDocument {
    entity_id: String,
    entity_name: Option<String>,
    reporting_year: i32,
    facts: Vec<RawFact>,
}

impl ParsedDocument {
    pub fn new(
        entity_id: Option<String>,
        entity_name: Option<String>,
        reporting_year: Option<i32>,
        facts: Vec<RawFact>,
    ) -> Result<Self> {
        let entity_id = entity_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Validation("Could not determine company_id from contexts".into()))?;
        let reporting_year = reporting_year.filter(|y| *y > 0).ok_or_else(|| {
            Error::Validation("Could not determine reporting_year from contexts".into())
        })?;

        Ok(Self {
            entity_id,
            entity_name: entity_name.filter(|n| !n.trim().is_empty()),
            reporting_year,
            facts,
        })
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn entity_name(&self) -> Option<&str> {
        self.entity_name.as_deref()
    }

    pub fn reporting_year(&self) -> i32 {
        self.reporting_year
    }

    pub fn facts(&self) -> &[RawFact] {
        &self.facts
    }

    pub fn into_facts(self) -> Vec<RawFact> {
        self.facts
    }
}

/// Typed indicator value. Serialises as a bare JSON/CSV scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl IndicatorValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, IndicatorValue::Absent)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, IndicatorValue::Int(_) | IndicatorValue::Float(_))
    }
}

impl Serialize for IndicatorValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            IndicatorValue::Absent => serializer.serialize_none(),
            IndicatorValue::Bool(b) => serializer.serialize_bool(*b),
            IndicatorValue::Int(i) => serializer.serialize_i64(*i),
            IndicatorValue::Float(f) => serializer.serialize_f64(*f),
            IndicatorValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for IndicatorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorValue::Absent => Ok(()),
            IndicatorValue::Bool(b) => write!(f, "{}", b),
            IndicatorValue::Int(i) => write!(f, "{}", i),
            IndicatorValue::Float(x) => write!(f, "{}", x),
            IndicatorValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Provenance tag carried on every output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum DataSource {
    #[serde(rename = "xbrl")]
    #[strum(serialize = "xbrl")]
    Xbrl,
    #[serde(rename = "xbrl (taxonomy)")]
    #[strum(serialize = "xbrl (taxonomy)")]
    XbrlTaxonomy,
    #[serde(rename = "xbrl (partial)")]
    #[strum(serialize = "xbrl (partial)")]
    XbrlPartial,
    #[serde(rename = "public-api")]
    #[strum(serialize = "public-api")]
    PublicApi,
}

/// Final output unit of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EsgRecord {
    pub company_id: String,
    pub company_name: String,
    pub reporting_year: i32,
    pub indicator_name: String,
    pub indicator_value: IndicatorValue,
    pub value_unit: Option<String>,
    pub data_quality_score: u8,
    pub data_source: DataSource,
    pub extraction_timestamp: DateTime<Utc>,
}
