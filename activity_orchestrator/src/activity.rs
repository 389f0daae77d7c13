use crate::aggregator::TransactionAggregator;
use crate::price::{PriceAggregator, ResolvedPrices};
use crate::{OrchestratorError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use config_manager::SystemConfig;
use retry_utils::RetryPolicy;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info};
use tx_classifier::{
    ClassifiedTransaction, ClassifierConfig, ClassifyContext, TransactionClassifier, TransactionKind,
};
use wallet_core::format::{fiat_from_f64, fiat_value};
use wallet_core::{
    add_hex, gas_fee_hex, hex_wei_to_decimal, Account, Asset, AssetPriceTimeframe, PriceSource,
    RawTransaction, StatusCategory, TransactionSource,
};

const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One row of an asset's activity list
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DisplayRecord {
    /// Account the transaction was fetched for
    pub account_name: String,

    pub transaction: ClassifiedTransaction,

    /// Action line including the fiat value for transfers
    pub action: String,

    pub detail: String,

    /// Amount with four fractional digits
    pub amount: String,

    /// Symbol `amount` is denominated in
    pub symbol: String,

    /// Fiat value of `amount`, two fractional digits
    pub fiat_value: String,

    /// Maximum fee in native units
    pub total_gas: f64,

    /// Fiat value of `total_gas`, two fractional digits
    pub total_gas_fiat: String,

    /// Value plus fee for native legs, fee alone otherwise (HexAmount)
    pub total_cost: String,

    pub status_label: String,

    /// ARGB colour of the status dot
    pub status_color: u32,

    pub status_category: StatusCategory,

    pub date: String,

    /// Hash of the submitted transaction, if any
    pub tx_hash: Option<String>,
}

/// What an activity view needs to know beyond the collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySettings {
    pub native_symbol: String,
    pub native_decimals: u32,
    pub fiat_currency: String,
    pub timeframe: AssetPriceTimeframe,
    pub date_format: String,
    pub include_all_assets: bool,
}

fn is_valid_date_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

impl ActivitySettings {
    pub fn from_config(config: &SystemConfig) -> Result<Self> {
        let timeframe = config.pricing.timeframe.parse::<AssetPriceTimeframe>()?;

        if !is_valid_date_format(&config.display.date_format) {
            return Err(OrchestratorError::InvalidSetting(format!(
                "Invalid date format: '{}'",
                config.display.date_format
            )));
        }

        Ok(Self {
            native_symbol: config.network.native_symbol.clone(),
            native_decimals: config.network.native_decimals,
            fiat_currency: config.pricing.fiat_currency.clone(),
            timeframe,
            date_format: config.display.date_format.clone(),
            include_all_assets: config.fetch.include_all_assets,
        })
    }

    fn format_date(&self, at: DateTime<Utc>) -> String {
        let mut out = String::new();
        if write!(out, "{}", at.format(&self.date_format)).is_err() {
            out.clear();
            let _ = write!(out, "{}", at.format(FALLBACK_DATE_FORMAT));
        }
        out
    }
}

/// Produces the display-ready activity list of one asset across accounts
pub struct AssetActivityService {
    aggregator: TransactionAggregator,
    prices: PriceAggregator,
    classifier: TransactionClassifier,
    settings: ActivitySettings,
}

impl AssetActivityService {
    pub fn new(
        transaction_source: Arc<dyn TransactionSource>,
        price_source: Arc<dyn PriceSource>,
        config: &SystemConfig,
    ) -> Result<Self> {
        config.validate()?;
        let settings = ActivitySettings::from_config(config)?;

        let retry_policy = RetryPolicy {
            max_retries: config.fetch.max_retries,
            rate_limit_delays_ms: config.fetch.rate_limit_delays_ms.clone(),
            timeout_delays_ms: config.fetch.timeout_delays_ms.clone(),
        };
        let classifier = TransactionClassifier::new(ClassifierConfig {
            exchange_proxy_address: config.swap.exchange_proxy_address.clone(),
            exchange_proxy_label: config.swap.exchange_proxy_label.clone(),
            native_symbol: config.network.native_symbol.clone(),
            native_decimals: config.network.native_decimals,
        });

        Ok(Self::with_parts(
            TransactionAggregator::new(transaction_source, retry_policy),
            PriceAggregator::new(price_source, &settings.fiat_currency),
            classifier,
            settings,
        ))
    }

    pub fn with_parts(
        aggregator: TransactionAggregator,
        prices: PriceAggregator,
        classifier: TransactionClassifier,
        settings: ActivitySettings,
    ) -> Self {
        Self {
            aggregator,
            prices,
            classifier,
            settings,
        }
    }

    pub fn settings(&self) -> &ActivitySettings {
        &self.settings
    }

    pub fn prices(&self) -> &PriceAggregator {
        &self.prices
    }

    /// Activity of `asset` across `accounts`: prices first, then every
    /// account's transactions, then one record per transaction in account
    /// order and source order within an account.
    pub async fn asset_activity(&self, accounts: &[Account], asset: &Asset) -> Vec<DisplayRecord> {
        info!(
            "Building {} activity for {} accounts",
            asset.symbol,
            accounts.len()
        );

        let prices = self
            .prices
            .resolve_prices(&self.settings.native_symbol, &asset.symbol, self.settings.timeframe)
            .await;

        let aggregated = self
            .aggregator
            .aggregate(accounts, self.settings.include_all_assets, &asset.contract_address)
            .await;

        let records: Vec<DisplayRecord> = aggregated
            .iter()
            .flat_map(|entry| {
                entry.transactions.iter().map(move |tx| {
                    self.build_record(&entry.account.name, tx, asset, accounts, &prices)
                })
            })
            .collect();

        debug!("Built {} {} activity records", records.len(), asset.symbol);
        records
    }

    /// Display record of a single transaction
    pub fn build_record(
        &self,
        account_name: &str,
        tx: &RawTransaction,
        asset: &Asset,
        accounts: &[Account],
        prices: &ResolvedPrices,
    ) -> DisplayRecord {
        let ctx = ClassifyContext {
            asset,
            sender_name: account_name,
            accounts,
        };
        let classified = self.classifier.classify(tx, &ctx);

        let unit_price = match classified.kind {
            TransactionKind::Swap => prices.base,
            _ => prices.target,
        };
        let fiat = fiat_value(&classified.display_amount, unit_price);

        let gas_fee = gas_fee_hex(&tx.tx_data.gas_limit, &tx.tx_data.gas_price);
        let total_gas = hex_wei_to_decimal(&gas_fee, self.settings.native_decimals);
        let total_gas_fiat = fiat_from_f64(total_gas, prices.base);

        let total_cost = match classified.kind {
            TransactionKind::NativeTransfer | TransactionKind::Swap => add_hex(&classified.value, &gas_fee),
            TransactionKind::TokenTransfer | TransactionKind::TokenApprove => gas_fee,
        };

        let action = match classified.kind {
            TransactionKind::NativeTransfer | TransactionKind::TokenTransfer => format!(
                "{} ({} {})",
                classified.action,
                fiat,
                self.settings.fiat_currency.to_uppercase()
            ),
            TransactionKind::TokenApprove | TransactionKind::Swap => classified.action.clone(),
        };

        let status = classified.status;
        DisplayRecord {
            account_name: account_name.to_string(),
            action,
            detail: classified.detail.clone(),
            amount: classified.display_amount.clone(),
            symbol: classified.value_symbol.clone(),
            fiat_value: fiat,
            total_gas,
            total_gas_fiat,
            total_cost,
            status_label: status.label().to_string(),
            status_color: status.color(),
            status_category: status.category(),
            date: self.settings.format_date(classified.created_time),
            tx_hash: tx.tx_hash.clone(),
            transaction: classified,
        }
    }
}
