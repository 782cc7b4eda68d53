use std::fmt;

use crate::error::{Error, Result};

/// Exchange ticker symbol, e.g. `RELIANCE.NS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(ticker: String) -> Result<Self> {
        let uppercase_ticker = ticker.trim().to_uppercase();
        if uppercase_ticker.is_empty() {
            return Err(Error::Validation("Ticker cannot be empty".into()));
        }
        if !uppercase_ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '&')
        {
            return Err(Error::Validation(format!(
                "Ticker must contain only alphanumeric characters, hyphens or dots: {}",
                ticker
            )));
        }
        Ok(Ticker(uppercase_ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Best-effort guess: first word of the entity name plus the exchange suffix.
/// Returns `None` whenever the name gives nothing usable.
pub fn guess_ticker(company_name: &str, suffix: &str) -> Option<Ticker> {
    let name = company_name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("unknown") {
        return None;
    }

    let first_word: String = name
        .split_whitespace()
        .next()?
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '&' || *c == '-')
        .collect();
    if first_word.is_empty() {
        return None;
    }

    Ticker::new(format!("{}{}", first_word, suffix)).ok()
}
