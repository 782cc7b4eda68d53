pub mod brsr;
pub mod core;
pub mod error;
pub mod export;
pub mod extractor;
pub mod fetch;
pub mod mapping;
pub mod quality;

// Re-exports
pub use crate::core::config::ExtractorConfig;
pub use crate::core::types::{
    DataSource, EsgRecord, IndicatorValue, ParsedDocument, QName, RawFact, SourceTier,
};
pub use error::{Error, Result};
pub use extractor::{BatchResult, BatchSummary, DocumentOutcome, DocumentStatus, Extractor};
