use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::types::EsgRecord;
use crate::error::Result;

pub const DEFAULT_BASE_NAME: &str = "brsr_esg_metrics";

/// Lets spreadsheet tools detect UTF-8 in the exported CSV
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Flat CSV row; the value column is the display form of the typed value.
#[derive(Serialize)]
struct CsvRow<'a> {
    company_id: &'a str,
    company_name: &'a str,
    reporting_year: i32,
    indicator_name: &'a str,
    indicator_value: String,
    value_unit: Option<&'a str>,
    data_quality_score: u8,
    data_source: String,
    extraction_timestamp: String,
}

impl<'a> From<&'a EsgRecord> for CsvRow<'a> {
    fn from(r: &'a EsgRecord) -> Self {
        Self {
            company_id: &r.company_id,
            company_name: &r.company_name,
            reporting_year: r.reporting_year,
            indicator_name: &r.indicator_name,
            indicator_value: r.indicator_value.to_string(),
            value_unit: r.value_unit.as_deref(),
            data_quality_score: r.data_quality_score,
            data_source: r.data_source.to_string(),
            extraction_timestamp: r.extraction_timestamp.to_rfc3339(),
        }
    }
}

pub fn write_csv<W: Write>(records: &[EsgRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(CsvRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(records: &[EsgRecord], writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// Writes `<base>.csv` and `<base>.json` into `out_dir`, creating it if needed.
pub fn export_outputs(records: &[EsgRecord], out_dir: &Path, base_name: &str) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let csv_path = out_dir.join(format!("{}.csv", base_name));
    let mut csv_file = BufWriter::new(File::create(&csv_path)?);
    csv_file.write_all(UTF8_BOM)?;
    write_csv(records, &mut csv_file)?;
    csv_file.flush()?;
    info!("Exported CSV to {}", csv_path.display());

    let json_path = out_dir.join(format!("{}.json", base_name));
    let mut json_writer = BufWriter::new(File::create(&json_path)?);
    write_json(records, &mut json_writer)?;
    json_writer.flush()?;
    info!("Exported JSON to {}", json_path.display());

    Ok(vec![csv_path, json_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DataSource, IndicatorValue};
    use chrono::{TimeZone, Utc};

    fn records() -> Vec<EsgRecord> {
        let ts = Utc.with_ymd_and_hms(2025, 6, 17, 7, 17, 11).unwrap();
        vec![
            EsgRecord {
                company_id: "L1".into(),
                company_name: "Acme, Ltd".into(),
                reporting_year: 2024,
                indicator_name: "ghg_scope1_total".into(),
                indicator_value: IndicatorValue::Float(5000.5),
                value_unit: Some("tCO2e".into()),
                data_quality_score: 100,
                data_source: DataSource::Xbrl,
                extraction_timestamp: ts,
            },
            EsgRecord {
                company_id: "L1".into(),
                company_name: "Acme, Ltd".into(),
                reporting_year: 2024,
                indicator_name: "Scrip code".into(),
                indicator_value: IndicatorValue::Absent,
                value_unit: None,
                data_quality_score: 0,
                data_source: DataSource::XbrlTaxonomy,
                extraction_timestamp: ts,
            },
        ]
    }

    #[test]
    fn csv_has_header_and_flat_values() {
        let mut out = Vec::new();
        write_csv(&records(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines[0],
            "company_id,company_name,reporting_year,indicator_name,indicator_value,value_unit,data_quality_score,data_source,extraction_timestamp"
        );
        assert_eq!(
            lines[1],
            "L1,\"Acme, Ltd\",2024,ghg_scope1_total,5000.5,tCO2e,100,xbrl,2025-06-17T07:17:11+00:00"
        );
        assert_eq!(
            lines[2],
            "L1,\"Acme, Ltd\",2024,Scrip code,,,0,xbrl (taxonomy),2025-06-17T07:17:11+00:00"
        );
    }

    #[test]
    fn json_keeps_typed_values() {
        let mut out = Vec::new();
        write_json(&records(), &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(parsed[0]["indicator_value"], serde_json::json!(5000.5));
        assert_eq!(parsed[0]["data_source"], "xbrl");
        assert!(parsed[1]["indicator_value"].is_null());
        assert!(parsed[1]["value_unit"].is_null());
        assert_eq!(parsed[1]["data_source"], "xbrl (taxonomy)");
    }

    #[test]
    fn export_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested/output");
        let paths = export_outputs(&records(), &out_dir, DEFAULT_BASE_NAME).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(out_dir.join("brsr_esg_metrics.json").exists());

        let csv = fs::read(out_dir.join("brsr_esg_metrics.csv")).unwrap();
        assert!(csv.starts_with(UTF8_BOM));
        assert!(csv[UTF8_BOM.len()..].starts_with(b"company_id,company_name,"));
    }
}
