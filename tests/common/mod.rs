#![allow(dead_code)]

use axum::Router;
use brsr_extractor::ExtractorConfig;
use std::path::PathBuf;
use std::time::Duration;

pub const MINIMAL_BRSR: &str = include_str!("../../src/brsr/parsing/tests/data/minimal_brsr.xml");
pub const FULL_BRSR: &str = include_str!("../../src/brsr/parsing/tests/data/full_brsr.xml");

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Config pointing at the fixtures in `tests/data`, with no network fallback.
pub fn test_config() -> ExtractorConfig {
    ExtractorConfig {
        request_timeout: Duration::from_secs(5),
        max_retries: 1,
        taxonomy_mapping_path: PathBuf::from("tests/data/mapping.json"),
        label_linkbase_path: PathBuf::from("tests/data/labels.xml"),
        company_directory_path: PathBuf::from("tests/data/companies.csv"),
        enable_public_data_fallback: false,
        ..Default::default()
    }
}
