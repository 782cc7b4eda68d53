use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const NSE_ARCHIVE_PREFIX: &str = "https://nsearchives.nseindia.com/";
pub const YAHOO_QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff_factor: f64,
    pub verify_ssl: bool,
    pub user_agent: String,
    /// Lowercase URL prefixes we expect documents to come from. Anything else is logged.
    pub expected_hosts: Vec<String>,
    pub document_extension: String,
    /// Substring identifying the disclosure taxonomy namespace for the lexical parser.
    pub disclosure_namespace: String,
    pub data_quality_base: i32,
    pub enable_schema_parser: bool,
    pub enable_public_data_fallback: bool,
    pub taxonomy_mapping_path: PathBuf,
    pub label_linkbase_path: PathBuf,
    pub label_concept_prefix: String,
    pub company_directory_path: PathBuf,
    pub public_data_url: String,
    pub ticker_suffix: String,
    pub output_dir: PathBuf,
    pub batch_concurrency: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff_factor: 2.0,
            verify_ssl: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            expected_hosts: vec![NSE_ARCHIVE_PREFIX.to_string(), "http://localhost".to_string()],
            document_extension: ".xml".to_string(),
            disclosure_namespace: "sebi.gov.in/xbrl".to_string(),
            data_quality_base: 80,
            enable_schema_parser: true,
            enable_public_data_fallback: true,
            taxonomy_mapping_path: PathBuf::from("data/brsr_taxonomy_mapping.json"),
            label_linkbase_path: PathBuf::from("Taxonomy_BRSR/core/in-capmkt-lab.xml"),
            label_concept_prefix: "in-capmkt_".to_string(),
            company_directory_path: PathBuf::from("Insider_Trading.csv"),
            public_data_url: YAHOO_QUOTE_SUMMARY_URL.to_string(),
            ticker_suffix: ".NS".to_string(),
            output_dir: PathBuf::from("./output"),
            batch_concurrency: 1,
        }
    }
}

impl ExtractorConfig {
    /// Defaults overridden by `BRSR_*` environment variables (a `.env` file is honoured).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::default();

        if let Some(secs) = env_parse::<u64>("BRSR_REQUEST_TIMEOUT")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = env_parse("BRSR_MAX_RETRIES")? {
            config.max_retries = v;
        }
        if let Some(v) = env_parse("BRSR_RETRY_BACKOFF_FACTOR")? {
            config.retry_backoff_factor = v;
        }
        if let Some(v) = env_parse("BRSR_VERIFY_SSL")? {
            config.verify_ssl = v;
        }
        if let Ok(v) = std::env::var("BRSR_USER_AGENT") {
            config.user_agent = v;
        }
        if let Ok(v) = std::env::var("BRSR_EXPECTED_HOSTS") {
            config.expected_hosts = v
                .split(',')
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("BRSR_DISCLOSURE_NAMESPACE") {
            config.disclosure_namespace = v;
        }
        if let Some(v) = env_parse("BRSR_DATA_QUALITY_BASE")? {
            config.data_quality_base = v;
        }
        if let Some(v) = env_parse("BRSR_ENABLE_SCHEMA_PARSER")? {
            config.enable_schema_parser = v;
        }
        if let Some(v) = env_parse("BRSR_ENABLE_PUBLIC_DATA_FALLBACK")? {
            config.enable_public_data_fallback = v;
        }
        if let Ok(v) = std::env::var("BRSR_TAXONOMY_MAPPING_PATH") {
            config.taxonomy_mapping_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BRSR_LABEL_LINKBASE_PATH") {
            config.label_linkbase_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BRSR_COMPANY_DIRECTORY_PATH") {
            config.company_directory_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BRSR_PUBLIC_DATA_URL") {
            config.public_data_url = v;
        }
        if let Ok(v) = std::env::var("BRSR_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse("BRSR_BATCH_CONCURRENCY")? {
            config.batch_concurrency = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry_backoff_factor < 0.0 || !self.retry_backoff_factor.is_finite() {
            return Err(Error::Validation(format!(
                "retry_backoff_factor must be a non-negative number, got {}",
                self.retry_backoff_factor
            )));
        }
        if self.batch_concurrency == 0 {
            return Err(Error::Validation("batch_concurrency must be at least 1".into()));
        }
        if self.document_extension.is_empty() {
            return Err(Error::Validation("document_extension cannot be empty".into()));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Validation(format!("{} has invalid value '{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}
