use log::{debug, info, warn};
use reqwest::Client;
use std::time::Duration;

use crate::core::config::ExtractorConfig;
use crate::error::{Error, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Outcome of a single attempt that did not produce a document.
enum AttemptError {
    /// Worth retrying: timeouts and transport failures
    Transient(reqwest::Error),
    /// The server answered, but not with a usable document
    Terminal(String),
}

/// Fetches XBRL instance documents with exponential backoff on transport failures.
#[derive(Clone)]
pub struct XbrlFetcher {
    client: Client,
    max_retries: u32,
    backoff_factor: f64,
    expected_hosts: Vec<String>,
    document_extension: String,
}

impl XbrlFetcher {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff_factor: config.retry_backoff_factor,
            expected_hosts: config.expected_hosts.clone(),
            document_extension: config.document_extension.to_lowercase(),
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.validate_url(url)?;

        let attempts = self.max_retries + 1;
        let mut last_error = String::from("no attempt made");

        for attempt in 0..attempts {
            info!("Fetching XBRL from {} (attempt {}/{})", url, attempt + 1, attempts);

            match self.try_fetch(url).await {
                Ok(content) => {
                    info!("Successfully fetched {} bytes from {}", content.len(), url);
                    return Ok(content);
                }
                Err(AttemptError::Terminal(reason)) => {
                    return Err(Error::Fetch {
                        url: url.to_string(),
                        attempts: attempt + 1,
                        reason,
                    });
                }
                Err(AttemptError::Transient(e)) => {
                    if e.is_timeout() {
                        warn!("Timeout fetching {} (attempt {}): {}", url, attempt + 1, e);
                    } else {
                        warn!("Request failed for {} (attempt {}): {}", url, attempt + 1, e);
                    }
                    last_error = e.to_string();

                    if attempt < self.max_retries {
                        let delay = self.backoff_delay(attempt);
                        info!("Retrying in {:.1} seconds...", delay.as_secs_f64());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(Error::Fetch {
            url: url.to_string(),
            attempts,
            reason: last_error,
        })
    }

    async fn try_fetch(&self, url: &str) -> std::result::Result<Vec<u8>, AttemptError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, mime::TEXT_XML.as_ref())
            .send()
            .await
            .map_err(AttemptError::Transient)?;

        debug!("Response status: {}", response.status());

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Terminal(format!("HTTP {} for {}", status.as_u16(), url)));
        }

        let content = response.bytes().await.map_err(AttemptError::Transient)?;
        if !looks_like_xml(&content) {
            return Err(AttemptError::Terminal(format!("Response from {} is not XML-like", url)));
        }

        Ok(content.to_vec())
    }

    /// `backoff_factor ^ attempt` seconds, attempt being 0-based.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let secs = self.backoff_factor.powi(attempt as i32);
        Duration::from_secs_f64(secs.clamp(0.0, 3600.0))
    }

    pub fn validate_url(&self, url: &str) -> Result<()> {
        let lower = url.to_lowercase();
        if !self.expected_hosts.iter().any(|host| lower.starts_with(host.as_str())) {
            warn!("Unexpected XBRL host: {}", url);
        }
        if !lower.ends_with(&self.document_extension) {
            return Err(Error::Validation(format!(
                "Expected {} XBRL instance: {}",
                self.document_extension, url
            )));
        }
        Ok(())
    }
}

/// True when the first non-whitespace byte (after an optional BOM) opens a tag.
pub fn looks_like_xml(content: &[u8]) -> bool {
    let trimmed = content.trim_ascii_start();
    let trimmed = trimmed.strip_prefix(UTF8_BOM).unwrap_or(trimmed);
    trimmed.trim_ascii_start().starts_with(b"<")
}
