use log::{error, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::Result;

/// Known entity display names, keyed by document URL and by entity identifier.
/// Only used for name resolution.
#[derive(Debug, Default, Clone)]
pub struct CompanyDirectory {
    by_url: HashMap<String, String>,
    /// Ordered so containment matching is reproducible
    by_id: BTreeMap<String, String>,
}

impl CompanyDirectory {
    pub fn new(by_url: HashMap<String, String>, by_id: BTreeMap<String, String>) -> Self {
        Self { by_url, by_id }
    }

    /// Load from a CSV with `XBRL`, `COMPANY` and `Company ID` columns.
    /// A missing or unreadable file gives an empty directory.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!("{} not found, company lookup disabled", path.display());
            return Self::default();
        }

        match Self::read_csv(path) {
            Ok(directory) => {
                info!(
                    "Loaded company database: {} URLs, {} IDs",
                    directory.by_url.len(),
                    directory.by_id.len()
                );
                directory
            }
            Err(e) => {
                error!("Failed to load company database: {}", e);
                Self::default()
            }
        }
    }

    fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);

        let company_col = column("COMPANY");
        let url_col = column("XBRL");
        let id_col = column("Company ID");

        let mut directory = Self::default();
        let Some(company_col) = company_col else {
            warn!("{} has no COMPANY column", path.display());
            return Ok(directory);
        };

        for record in reader.records() {
            let record = record?;
            let Some(company) = record.get(company_col).map(str::trim).filter(|c| !c.is_empty())
            else {
                continue;
            };
            if let Some(url) = url_col.and_then(|i| record.get(i)).map(str::trim) {
                if !url.is_empty() {
                    directory.by_url.insert(url.to_string(), company.to_string());
                }
            }
            if let Some(id) = id_col.and_then(|i| record.get(i)).map(str::trim) {
                if !id.is_empty() {
                    directory.by_id.insert(id.to_string(), company.to_string());
                }
            }
        }

        Ok(directory)
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty() && self.by_id.is_empty()
    }

    /// Look a name up by URL, then by the file stem of `source_name`, then by
    /// any known id contained in that stem.
    pub fn lookup(&self, url: Option<&str>, source_name: &str) -> Option<&str> {
        if let Some(name) = url.and_then(|u| self.by_url.get(u)) {
            info!("Found company name from URL mapping: {}", name);
            return Some(name.as_str());
        }

        let stem = Path::new(source_name).file_stem()?.to_str()?;
        if let Some(name) = self.by_id.get(stem) {
            info!("Found company name from ID mapping: {}", name);
            return Some(name.as_str());
        }

        self.by_id
            .iter()
            .find(|(id, _)| stem.contains(id.as_str()))
            .map(|(_, name)| {
                info!("Found company name from partial ID mapping: {}", name);
                name.as_str()
            })
    }

    /// Keep a real name; otherwise consult the directory; otherwise `Unknown`.
    pub fn resolve_name(&self, current: Option<&str>, url: Option<&str>, source_name: &str) -> String {
        match current.map(str::trim) {
            Some(name) if !name.is_empty() && !name.eq_ignore_ascii_case("unknown") => {
                name.to_string()
            }
            _ => self
                .lookup(url, source_name)
                .unwrap_or("Unknown")
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const URL: &str = "https://nsearchives.nseindia.com/corporate/xbrl/BRSR_1467735_17062025071711_WEB.xml";

    fn directory() -> CompanyDirectory {
        let mut by_url = HashMap::new();
        by_url.insert(URL.to_string(), "Reliance Industries Limited".to_string());
        let mut by_id = BTreeMap::new();
        by_id.insert("BRSR_1467642".to_string(), "Tata Steel Limited".to_string());
        by_id.insert("BRSR_9_ABC".to_string(), "Exact Co".to_string());
        CompanyDirectory::new(by_url, by_id)
    }

    #[test]
    fn keeps_existing_name() {
        let dir = directory();
        assert_eq!(dir.resolve_name(Some("Infosys"), Some(URL), URL), "Infosys");
    }

    #[test]
    fn resolves_by_url_then_id() {
        let dir = directory();
        assert_eq!(
            dir.resolve_name(Some("unknown"), Some(URL), URL),
            "Reliance Industries Limited"
        );
        assert_eq!(dir.resolve_name(None, None, "/tmp/BRSR_9_ABC.xml"), "Exact Co");
        assert_eq!(
            dir.resolve_name(Some(""), None, "uploads/BRSR_1467642_17062025052610_WEB.xml"),
            "Tata Steel Limited"
        );
    }

    #[test]
    fn falls_back_to_unknown() {
        assert_eq!(directory().resolve_name(None, None, "other.xml"), "Unknown");
    }

    #[test]
    fn loads_csv_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Insider_Trading.csv");
        fs::write(
            &path,
            format!(
                "SYMBOL,COMPANY,XBRL,Company ID\nRELIANCE,Reliance Industries Limited,{},BRSR_1467735\nTATASTEEL,Tata Steel Limited,,BRSR_1467642\n",
                URL
            ),
        )
        .unwrap();

        let directory = CompanyDirectory::load(&path);
        assert_eq!(directory.lookup(Some(URL), URL), Some("Reliance Industries Limited"));
        assert_eq!(
            directory.lookup(None, "BRSR_1467642_17062025052610_WEB.xml"),
            Some("Tata Steel Limited")
        );
    }

    #[test]
    fn missing_file_is_not_fatal() {
        let directory = CompanyDirectory::load(Path::new("/nonexistent/companies.csv"));
        assert!(directory.is_empty());
    }
}
