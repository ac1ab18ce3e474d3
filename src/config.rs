use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub sheet_url: Option<String>,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let seconds = |key: &str, default: u64| -> anyhow::Result<Duration> {
            let secs = match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a whole number of seconds"))?,
                None => default,
            };
            Ok(Duration::from_secs(secs))
        };

        Ok(Self {
            sheet_url: lookup("DASHBOARD_SHEET_URL").filter(|url| !url.trim().is_empty()),
            cache_ttl: seconds("DASHBOARD_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
            fetch_timeout: seconds("DASHBOARD_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?,
        })
    }

    pub fn require_sheet_url(&self) -> anyhow::Result<&str> {
        self.sheet_url.as_deref().context(
            "DASHBOARD_SHEET_URL must be set to the sheet's CSV export URL, or pass --csv/--xlsx",
        )
    }
}
