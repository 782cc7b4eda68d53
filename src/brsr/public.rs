use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use serde_json::Value;

use super::tickers::{guess_ticker, Ticker};
use crate::core::config::ExtractorConfig;
use crate::core::types::{QName, RawFact, SourceTier};
use crate::error::Result;

/// Last-resort source of approximate indicator values. Never fails: any
/// problem is logged and yields no facts.
#[async_trait]
pub trait PublicDataSource: Send + Sync {
    async fn fetch_esg_data(&self, company_id: &str, company_name: &str) -> Vec<RawFact>;
}

/// ESG scores from the Yahoo Finance quote summary endpoint.
pub struct YahooEsgSource {
    client: Client,
    base_url: String,
    ticker_suffix: String,
}

impl YahooEsgSource {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            base_url: config.public_data_url.trim_end_matches('/').to_string(),
            ticker_suffix: config.ticker_suffix.clone(),
        })
    }

    async fn query(&self, ticker: &Ticker) -> anyhow::Result<Value> {
        let url = format!("{}/{}", self.base_url, ticker);
        log::debug!("Public ESG request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("modules", "esgScores")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("HTTP {} from {}", response.status(), url));
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl PublicDataSource for YahooEsgSource {
    async fn fetch_esg_data(&self, company_id: &str, company_name: &str) -> Vec<RawFact> {
        let Some(ticker) = guess_ticker(company_name, &self.ticker_suffix) else {
            warn!("Could not find ticker for {}", company_id);
            return Vec::new();
        };

        info!("Fetching public ESG data for ticker: {}", ticker);
        let body = match self.query(&ticker).await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to fetch public ESG data: {}", e);
                return Vec::new();
            }
        };

        let facts = esg_scores_to_facts(&body);
        if facts.is_empty() {
            warn!("No sustainability data available for {}", ticker);
        } else {
            info!("Fetched {} ESG metrics from public sources", facts.len());
        }
        facts
    }
}

/// Flatten `quoteSummary.result[0].esgScores` into loosely typed facts,
/// dropping null, NaN and structured entries.
pub fn esg_scores_to_facts(body: &Value) -> Vec<RawFact> {
    let Some(scores) = body
        .pointer("/quoteSummary/result/0/esgScores")
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    scores
        .iter()
        .filter_map(|(name, value)| {
            scalar_text(value).map(|text| RawFact {
                qname: QName::local(name),
                value: text,
                unit: None,
                context_ref: None,
                source: SourceTier::PublicApi,
            })
        })
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("raw").and_then(scalar_text),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_nan() => None,
            _ => Some(n.to_string()),
        },
        Value::String(s) if s.trim().is_empty() || s.eq_ignore_ascii_case("nan") => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_esg_scores() {
        let body = json!({
            "quoteSummary": {
                "result": [{
                    "esgScores": {
                        "totalEsg": {"raw": 28.5, "fmt": "28.5"},
                        "environmentScore": {"raw": 12.1, "fmt": "12.1"},
                        "peerGroup": "Oil & Gas Refining",
                        "palmOil": false,
                        "percentile": {},
                        "relatedControversy": ["Product & Service Incidents"],
                        "esgPerformance": null,
                        "ratingYear": 2024
                    }
                }],
                "error": null
            }
        });

        let facts = esg_scores_to_facts(&body);
        let by_name = |n: &str| facts.iter().find(|f| f.local_name() == n).map(|f| f.value.clone());

        assert_eq!(by_name("totalEsg").as_deref(), Some("28.5"));
        assert_eq!(by_name("environmentScore").as_deref(), Some("12.1"));
        assert_eq!(by_name("peerGroup").as_deref(), Some("Oil & Gas Refining"));
        assert_eq!(by_name("palmOil").as_deref(), Some("false"));
        assert_eq!(by_name("ratingYear").as_deref(), Some("2024"));
        assert!(by_name("percentile").is_none());
        assert!(by_name("relatedControversy").is_none());
        assert!(by_name("esgPerformance").is_none());
        assert!(facts.iter().all(|f| f.source == SourceTier::PublicApi));
    }

    #[test]
    fn unexpected_shape_yields_nothing() {
        assert!(esg_scores_to_facts(&json!({"finance": {"error": "Not Found"}})).is_empty());
        assert!(esg_scores_to_facts(&json!({"quoteSummary": {"result": []}})).is_empty());
    }

    #[tokio::test]
    async fn unresolvable_name_returns_empty() {
        let source = YahooEsgSource::new(&ExtractorConfig::default()).unwrap();
        assert!(source.fetch_esg_data("UNKNOWN", "").await.is_empty());
    }
}
