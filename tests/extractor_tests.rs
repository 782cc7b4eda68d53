mod common;

use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use brsr_extractor::{
    DataSource, DocumentStatus, EsgRecord, Extractor, ExtractorConfig, IndicatorValue,
};
use chrono::{Datelike, Utc};
use common::{spawn, test_config, FULL_BRSR, MINIMAL_BRSR};
use serde_json::json;

fn record<'a>(records: &'a [EsgRecord], indicator: &str) -> &'a EsgRecord {
    records
        .iter()
        .find(|r| r.indicator_name == indicator)
        .unwrap_or_else(|| panic!("no record for {}", indicator))
}

#[tokio::test]
async fn full_document_maps_through_every_tier() {
    let extractor = Extractor::new(test_config()).unwrap();
    let records = extractor
        .process_content(FULL_BRSR.as_bytes(), "BRSR_1467735.xml", None)
        .await;

    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| r.company_id == "L17110MH1973PLC019786"));
    assert!(records.iter().all(|r| r.company_name == "Reliance Industries Limited"));
    assert!(records.iter().all(|r| r.reporting_year == 2025));

    let employees = record(&records, "employees_total");
    assert_eq!(employees.indicator_value, IndicatorValue::Int(1000));
    assert_eq!(employees.value_unit.as_deref(), Some("xbrli:pure"));
    assert_eq!(employees.data_quality_score, 100);
    assert_eq!(employees.data_source, DataSource::Xbrl);

    let csr = record(&records, "csr_spending");
    assert_eq!(csr.indicator_value, IndicatorValue::Float(5_000_000.0));
    assert_eq!(csr.value_unit.as_deref(), Some("iso4217:INR"));

    let policy = record(&records, "board_diversity_policy");
    assert_eq!(policy.indicator_value, IndicatorValue::Bool(true));
    assert_eq!(policy.data_quality_score, 85);

    let scrip = record(&records, "Scrip code");
    assert_eq!(scrip.indicator_value, IndicatorValue::Int(500325));
    assert_eq!(scrip.data_source, DataSource::XbrlTaxonomy);

    // nil facts never become records
    assert!(records.iter().all(|r| r.indicator_name != "water_withdrawal_total"));
}

#[tokio::test]
async fn lexical_tier_alone_still_extracts() {
    let config = ExtractorConfig {
        enable_schema_parser: false,
        ..test_config()
    };
    let extractor = Extractor::new(config).unwrap();
    let records = extractor
        .process_content(FULL_BRSR.as_bytes(), "upload.xml", None)
        .await;

    assert_eq!(records.len(), 6);
    let ghg = record(&records, "ghg_scope1_total");
    // no unit resolution in the lexical tier, the curated unit fills in
    assert_eq!(ghg.value_unit.as_deref(), Some("tCO2e"));
    assert_eq!(ghg.indicator_value, IndicatorValue::Float(5000.5));
}

#[tokio::test]
async fn entity_name_comes_from_directory_when_missing() {
    let extractor = Extractor::new(test_config()).unwrap();
    let records = extractor
        .process_content(
            MINIMAL_BRSR.as_bytes(),
            "downloads/BRSR_1467642_17062025052610_WEB.xml",
            None,
        )
        .await;

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.company_name == "Tata Steel Limited"));

    let records = extractor
        .process_content(MINIMAL_BRSR.as_bytes(), "other.xml", None)
        .await;
    assert!(records.iter().all(|r| r.company_name == "Unknown"));
}

#[tokio::test]
async fn batch_isolates_failed_documents() {
    let app = Router::new()
        .route("/corporate/xbrl/BRSR_ok.xml", get(|| async { MINIMAL_BRSR }))
        .route(
            "/corporate/xbrl/BRSR_missing.xml",
            get(|| async { (StatusCode::NOT_FOUND, "no such filing") }),
        );
    let base = spawn(app).await;
    let missing = format!("{}/corporate/xbrl/BRSR_missing.xml", base);
    let ok = format!("{}/corporate/xbrl/BRSR_ok.xml", base);

    let config = ExtractorConfig {
        batch_concurrency: 2,
        ..test_config()
    };
    let extractor = Extractor::new(config).unwrap();
    let batch = extractor.process_urls([missing.as_str(), ok.as_str()]).await;

    assert_eq!(batch.records.len(), 2);
    assert!(batch
        .records
        .iter()
        .all(|r| r.company_id == "L12345MH2000PLC123456"));

    assert_eq!(batch.outcomes.len(), 2);
    assert_eq!(batch.outcomes[0].location, missing);
    assert!(matches!(batch.outcomes[0].status, DocumentStatus::Failed { .. }));
    assert_eq!(batch.outcomes[1].location, ok);
    assert_eq!(batch.outcomes[1].status, DocumentStatus::Success { records: 2 });
    assert_eq!(batch.failed().count(), 1);

    assert_eq!(batch.summary.total_records, 2);
    assert_eq!(batch.summary.companies, 1);
    assert_eq!(batch.summary.indicators, 2);
    assert_eq!(batch.summary.avg_quality_score, 97.5);
}

#[tokio::test]
async fn single_url_failure_surfaces_reason() {
    let app = Router::new().route(
        "/BRSR_gone.xml",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = spawn(app).await;

    let extractor = Extractor::new(test_config()).unwrap();
    let err = extractor
        .process_url(&format!("{}/BRSR_gone.xml", base))
        .await
        .unwrap_err();
    assert!(err.is_fetch());
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn public_fallback_used_when_document_is_unusable() {
    let app = Router::new()
        .route(
            "/corporate/xbrl/BRSR_1467735_17062025071711_WEB.xml",
            get(|| async { "<html><body>Maintenance</body></html>" }),
        )
        .route(
            "/quote/:symbol",
            get(|Path(symbol): Path<String>| async move {
                if symbol != "RELIANCE.NS" {
                    return Json(json!({"quoteSummary": {"result": [], "error": "unknown"}}));
                }
                Json(json!({
                    "quoteSummary": {
                        "result": [{
                            "esgScores": {
                                "totalEsg": {"raw": 28.5, "fmt": "28.5"},
                                "environmentScore": {"raw": 12.1, "fmt": "12.1"},
                                "peerGroup": "Refiners & Pipelines",
                                "percentile": {}
                            }
                        }],
                        "error": null
                    }
                }))
            }),
        );
    let base = spawn(app).await;

    let config = ExtractorConfig {
        enable_public_data_fallback: true,
        public_data_url: format!("{}/quote", base),
        ..test_config()
    };
    let extractor = Extractor::new(config).unwrap();
    let records = extractor
        .process_url(&format!(
            "{}/corporate/xbrl/BRSR_1467735_17062025071711_WEB.xml",
            base
        ))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    for r in &records {
        assert_eq!(r.company_id, "UNKNOWN");
        assert_eq!(r.company_name, "Reliance Industries Limited");
        assert_eq!(r.reporting_year, Utc::now().year() - 1);
        assert_eq!(r.data_source, DataSource::PublicApi);
        assert_eq!(r.data_quality_score, 80);
    }
    assert_eq!(
        record(&records, "esg_risk_score_total").indicator_value,
        IndicatorValue::Float(28.5)
    );
}

#[tokio::test]
async fn uploads_never_reach_public_fallback() {
    let config = ExtractorConfig {
        enable_public_data_fallback: true,
        public_data_url: "http://127.0.0.1:9/unreachable".to_string(),
        ..test_config()
    };
    let extractor = Extractor::new(config).unwrap();
    let records = extractor
        .process_content(b"<html/>", "BRSR_1467735.xml", None)
        .await;
    assert!(records.is_empty());
}
