use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use wallet_core::format::parse_price;
use wallet_core::{AssetPriceTimeframe, PriceSource};

/// Fiat prices of the network's native asset and of the asset being viewed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResolvedPrices {
    pub base: Decimal,
    pub target: Decimal,
}

/// Resolves fiat prices from a price source. Unavailable prices are zero.
#[derive(Clone)]
pub struct PriceAggregator {
    source: Arc<dyn PriceSource>,
    fiat_currency: String,
}

impl PriceAggregator {
    pub fn new(source: Arc<dyn PriceSource>, fiat_currency: &str) -> Self {
        Self {
            source,
            fiat_currency: fiat_currency.to_lowercase(),
        }
    }

    pub fn fiat_currency(&self) -> &str {
        &self.fiat_currency
    }

    /// Price of `base_symbol` and `target_symbol`. The base price is fetched
    /// first; when both symbols are the same asset it is the only fetch.
    pub async fn resolve_prices(
        &self,
        base_symbol: &str,
        target_symbol: &str,
        timeframe: AssetPriceTimeframe,
    ) -> ResolvedPrices {
        let base = self.fetch_price(base_symbol, timeframe).await;

        if target_symbol.eq_ignore_ascii_case(base_symbol) {
            return ResolvedPrices { base, target: base };
        }

        let target = self.fetch_price(target_symbol, timeframe).await;
        debug!(
            "Resolved prices {}={} {}={} ({})",
            base_symbol, base, target_symbol, target, self.fiat_currency
        );

        ResolvedPrices { base, target }
    }

    async fn fetch_price(&self, symbol: &str, timeframe: AssetPriceTimeframe) -> Decimal {
        let asset = symbol.to_lowercase();
        let assets = [asset.clone()];
        let fiats = [self.fiat_currency.clone()];

        match self.source.get_price(&assets, &fiats, timeframe).await {
            Ok(quotes) => quotes
                .iter()
                .find(|quote| quote.from_asset.eq_ignore_ascii_case(&asset))
                .map(|quote| parse_price(&quote.price))
                .unwrap_or_else(|| {
                    debug!("No {} quote for {}, using 0", self.fiat_currency, symbol);
                    Decimal::ZERO
                }),
            Err(e) => {
                warn!("Price fetch for {} failed, using 0: {}", symbol, e);
                Decimal::ZERO
            }
        }
    }

    /// Price history of `asset` in date order. Points with unparsable prices
    /// are dropped; a failed fetch gives an empty history.
    pub async fn price_history(
        &self,
        asset: &str,
        timeframe: AssetPriceTimeframe,
    ) -> Vec<(DateTime<Utc>, Decimal)> {
        let points = match self.source.get_price_history(&asset.to_lowercase(), timeframe).await {
            Ok(points) => points,
            Err(e) => {
                warn!("Price history fetch for {} failed: {}", asset, e);
                return Vec::new();
            }
        };

        let mut history: Vec<(DateTime<Utc>, Decimal)> = points
            .into_iter()
            .filter_map(|point| match Decimal::from_str(point.price.trim()) {
                Ok(price) => Some((point.date, price)),
                Err(_) => {
                    debug!("Skipping history point {} with price '{}'", point.date, point.price);
                    None
                }
            })
            .collect();

        history.sort_by(|a, b| a.0.cmp(&b.0));
        history
    }
}
