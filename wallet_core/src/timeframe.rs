use crate::{Result, WalletError};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Window a price or price history is requested for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum AssetPriceTimeframe {
    Live,
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
    OneYear,
    All,
}

impl AssetPriceTimeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetPriceTimeframe::Live => "live",
            AssetPriceTimeframe::OneDay => "1d",
            AssetPriceTimeframe::OneWeek => "1w",
            AssetPriceTimeframe::OneMonth => "1m",
            AssetPriceTimeframe::ThreeMonths => "3m",
            AssetPriceTimeframe::OneYear => "1y",
            AssetPriceTimeframe::All => "all",
        }
    }

    /// Earliest instant covered by this window, `None` when unbounded
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let span = match self {
            AssetPriceTimeframe::Live | AssetPriceTimeframe::All => return None,
            AssetPriceTimeframe::OneDay => Duration::days(1),
            AssetPriceTimeframe::OneWeek => Duration::weeks(1),
            AssetPriceTimeframe::OneMonth => Duration::days(30),
            AssetPriceTimeframe::ThreeMonths => Duration::days(90),
            AssetPriceTimeframe::OneYear => Duration::days(365),
        };
        let cutoff = now - span;
        debug!("Timeframe {} => cutoff {}", self, cutoff.timestamp());
        Some(cutoff)
    }

    /// Whether `at` falls inside this window ending at `now`
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.cutoff(now) {
            Some(cutoff) => at >= cutoff && at <= now,
            None => true,
        }
    }
}

impl fmt::Display for AssetPriceTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetPriceTimeframe {
    type Err = WalletError;

    /// Accepts `live`, `all` or `<n><unit>` for the supported n/unit pairs
    /// (1d, 1w, 1m, 3m, 1y)
    fn from_str(timeframe: &str) -> Result<Self> {
        let normalized = timeframe.trim().to_lowercase();
        match normalized.as_str() {
            "live" => return Ok(AssetPriceTimeframe::Live),
            "all" => return Ok(AssetPriceTimeframe::All),
            _ => {}
        }

        let re = Regex::new(r"^(\d+)(d|w|m|y)$")
            .map_err(|e| WalletError::TimeframeParse(format!("Regex error: {}", e)))?;
        let captures = re
            .captures(&normalized)
            .ok_or_else(|| WalletError::TimeframeParse(format!("Invalid timeframe format: {}", timeframe)))?;

        let amount: u32 = captures[1]
            .parse()
            .map_err(|e| WalletError::TimeframeParse(format!("Invalid number: {}", e)))?;

        match (amount, &captures[2]) {
            (1, "d") => Ok(AssetPriceTimeframe::OneDay),
            (1, "w") => Ok(AssetPriceTimeframe::OneWeek),
            (1, "m") => Ok(AssetPriceTimeframe::OneMonth),
            (3, "m") => Ok(AssetPriceTimeframe::ThreeMonths),
            (1, "y") => Ok(AssetPriceTimeframe::OneYear),
            _ => Err(WalletError::TimeframeParse(format!("Unsupported timeframe: {}", timeframe))),
        }
    }
}

impl TryFrom<String> for AssetPriceTimeframe {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AssetPriceTimeframe> for String {
    fn from(timeframe: AssetPriceTimeframe) -> Self {
        timeframe.as_str().to_string()
    }
}
