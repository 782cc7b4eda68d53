use chrono::{Datelike, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use log::{error, info, warn};
use serde::Serialize;

use crate::brsr::companies::CompanyDirectory;
use crate::brsr::parsing::{DocumentParser, LexicalParser, ParserChain, SchemaParser};
use crate::brsr::public::{PublicDataSource, YahooEsgSource};
use crate::core::config::ExtractorConfig;
use crate::core::types::{EsgRecord, RawFact};
use crate::error::Result;
use crate::fetch::XbrlFetcher;
use crate::mapping::{normalize_value, MetricMapper};
use crate::quality::QualityScorer;

/// Entity id used for records that only come from the public data source.
pub const UNKNOWN_COMPANY_ID: &str = "UNKNOWN";

/// Per-document pipeline: fetch, parse through the tiers, resolve the entity
/// name, then map, normalise and score every fact.
pub struct Extractor {
    config: ExtractorConfig,
    fetcher: XbrlFetcher,
    parsers: ParserChain,
    mapper: MetricMapper,
    scorer: QualityScorer,
    directory: CompanyDirectory,
    public_source: Option<Box<dyn PublicDataSource>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Success { records: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutcome {
    pub location: String,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_records: usize,
    pub companies: usize,
    pub indicators: usize,
    pub avg_quality_score: f64,
}

impl BatchSummary {
    pub fn from_records(records: &[EsgRecord]) -> Self {
        let avg_quality_score = if records.is_empty() {
            0.0
        } else {
            records
                .iter()
                .map(|r| f64::from(r.data_quality_score))
                .sum::<f64>()
                / records.len() as f64
        };

        Self {
            total_records: records.len(),
            companies: records.iter().map(|r| r.company_id.as_str()).unique().count(),
            indicators: records.iter().map(|r| r.indicator_name.as_str()).unique().count(),
            avg_quality_score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub records: Vec<EsgRecord>,
    pub outcomes: Vec<DocumentOutcome>,
    pub summary: BatchSummary,
}

impl BatchResult {
    pub fn failed(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DocumentStatus::Failed { .. }))
    }
}

impl Extractor {
    /// Build every component from the config. Table files that are missing
    /// only leave their lookups empty.
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let mapper = MetricMapper::load(&config);
        let directory = CompanyDirectory::load(&config.company_directory_path);
        let public_source: Option<Box<dyn PublicDataSource>> = if config.enable_public_data_fallback {
            Some(Box::new(YahooEsgSource::new(&config)?))
        } else {
            None
        };
        Self::with_components(config, mapper, directory, public_source)
    }

    pub fn with_components(
        config: ExtractorConfig,
        mapper: MetricMapper,
        directory: CompanyDirectory,
        public_source: Option<Box<dyn PublicDataSource>>,
    ) -> Result<Self> {
        config.validate()?;
        let fetcher = XbrlFetcher::new(&config)?;

        let mut parsers: Vec<Box<dyn DocumentParser>> = Vec::new();
        if config.enable_schema_parser {
            parsers.push(Box::new(SchemaParser::new()));
        }
        parsers.push(Box::new(LexicalParser::new(&config.disclosure_namespace)));
        let parsers = ParserChain::new(parsers);
        info!("Document parsers: {}", parsers.names().join(" -> "));

        Ok(Self {
            scorer: QualityScorer::new(config.data_quality_base),
            config,
            fetcher,
            parsers,
            mapper,
            directory,
            public_source,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn mapper(&self) -> &MetricMapper {
        &self.mapper
    }

    /// Fetch failures are returned; everything after the fetch degrades
    /// to fewer (possibly zero) records instead.
    pub async fn process_url(&self, url: &str) -> Result<Vec<EsgRecord>> {
        info!("Processing XBRL URL: {}", url);
        let content = self
            .fetcher
            .fetch(url)
            .await
            .inspect_err(|e| error!("Failed to fetch {}: {}", url, e))?;
        Ok(self.process_content(&content, url, Some(url)).await)
    }

    pub async fn process_content(
        &self,
        content: &[u8],
        source_name: &str,
        url: Option<&str>,
    ) -> Vec<EsgRecord> {
        let doc = match self.parsers.parse(content) {
            Ok(doc) => doc,
            Err(e) => {
                error!("All document parsers failed for {}: {}", source_name, e);
                return match url {
                    Some(url) => self.fallback_to_public_data(url, source_name).await,
                    None => Vec::new(),
                };
            }
        };

        let company_name = self
            .directory
            .resolve_name(doc.entity_name(), url, source_name);
        let company_id = doc.entity_id().to_string();
        let year = doc.reporting_year();

        let records = self.transform_facts(doc.into_facts(), &company_id, &company_name, year);
        info!(
            "Extracted {} ESG records for {} (year {})",
            records.len(),
            company_id,
            year
        );
        records
    }

    async fn fallback_to_public_data(&self, url: &str, source_name: &str) -> Vec<EsgRecord> {
        let Some(source) = self.public_source.as_ref() else {
            return Vec::new();
        };
        info!("Using public ESG data fallback for {}", url);

        let company_name = self.directory.resolve_name(None, Some(url), source_name);
        let year = Utc::now().year() - 1;
        let facts = source.fetch_esg_data(UNKNOWN_COMPANY_ID, &company_name).await;
        if facts.is_empty() {
            warn!("No public ESG data available");
            return Vec::new();
        }

        self.transform_facts(facts, UNKNOWN_COMPANY_ID, &company_name, year)
    }

    /// Unmapped facts are dropped. One timestamp per document.
    pub fn transform_facts(
        &self,
        facts: Vec<RawFact>,
        company_id: &str,
        company_name: &str,
        reporting_year: i32,
    ) -> Vec<EsgRecord> {
        let timestamp = Utc::now();

        facts
            .into_iter()
            .filter_map(|fact| {
                let (indicator_name, mapping) = self.mapper.map_fact(&fact)?;
                let value = normalize_value(&fact.value, Some(mapping.data_type)).into_value();
                let unit = fact.unit.clone().or_else(|| mapping.unit.clone());
                let score = self.scorer.score(
                    &value,
                    unit.as_deref(),
                    fact.context_ref.as_deref(),
                    fact.source,
                );

                Some(EsgRecord {
                    company_id: company_id.to_string(),
                    company_name: company_name.to_string(),
                    reporting_year,
                    indicator_name,
                    indicator_value: value,
                    value_unit: unit,
                    data_quality_score: score,
                    data_source: mapping.data_source(fact.source),
                    extraction_timestamp: timestamp,
                })
            })
            .collect()
    }

    /// Documents are independent; a failure is recorded against its URL and
    /// never aborts the batch. Output keeps input order.
    pub async fn process_urls<I, S>(&self, urls: I) -> BatchResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls: Vec<String> = urls.into_iter().map(|u| u.as_ref().to_string()).collect();
        let total = urls.len();

        let results: Vec<(String, Result<Vec<EsgRecord>>)> = stream::iter(urls.into_iter().enumerate())
            .map(|(i, url)| async move {
                info!("[{}/{}] Processing: {}", i + 1, total, url);
                let result = self.process_url(&url).await;
                (url, result)
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let mut records = Vec::new();
        let mut outcomes = Vec::with_capacity(results.len());
        for (location, result) in results {
            let status = match result {
                Ok(mut doc_records) => {
                    let count = doc_records.len();
                    records.append(&mut doc_records);
                    DocumentStatus::Success { records: count }
                }
                Err(e) => {
                    error!("Error processing {}: {}", location, e);
                    DocumentStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(DocumentOutcome { location, status });
        }

        let summary = BatchSummary::from_records(&records);
        if records.is_empty() {
            warn!("No ESG records extracted from any URL");
        } else {
            info!("Total records: {}", summary.total_records);
            info!("Companies: {}", summary.companies);
            info!("Indicators: {}", summary.indicators);
            info!("Avg quality score: {:.1}", summary.avg_quality_score);
        }

        BatchResult {
            records,
            outcomes,
            summary,
        }
    }
}
