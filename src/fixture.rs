use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use wallet_core::{
    Account, Asset, AssetPrice, AssetPriceTimeframe, PricePoint, PriceSource, RawTransaction,
    TransactionSource, WalletError,
};

/// Wallet snapshot read from a JSON file: accounts, the asset to report on,
/// transactions per account address and fiat prices per lowercase symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub accounts: Vec<Account>,
    pub asset: Asset,
    #[serde(default)]
    pub transactions: HashMap<String, Vec<RawTransaction>>,
    /// Addresses whose fetch fails
    #[serde(default)]
    pub failing_accounts: Vec<String>,
    #[serde(default)]
    pub prices: HashMap<String, String>,
    #[serde(default)]
    pub price_history: HashMap<String, Vec<PricePoint>>,
}

impl Fixture {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let fixture = serde_json::from_str(&text)?;
        Ok(fixture)
    }
}

/// Serves transactions and prices straight from a [`Fixture`]
pub struct FixtureSource {
    fixture: Fixture,
}

impl FixtureSource {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    fn transactions_for(&self, address: &str) -> Vec<RawTransaction> {
        self.fixture
            .transactions
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(address))
            .map(|(_, transactions)| transactions.clone())
            .unwrap_or_default()
    }
}

fn is_token_transaction(tx: &RawTransaction, contract_address: &str) -> bool {
    tx.tx_data.to.eq_ignore_ascii_case(contract_address)
}

#[async_trait]
impl TransactionSource for FixtureSource {
    async fn fetch_transactions(
        &self,
        account: &Account,
        include_all_assets: bool,
        contract_address: &str,
    ) -> wallet_core::Result<Vec<RawTransaction>> {
        if self
            .fixture
            .failing_accounts
            .iter()
            .any(|failing| failing.eq_ignore_ascii_case(&account.address))
        {
            return Err(WalletError::TransactionSource(format!(
                "no transactions available for {}",
                account.address
            )));
        }

        let transactions = self.transactions_for(&account.address);
        if contract_address.is_empty() {
            if include_all_assets {
                return Ok(transactions);
            }
            return Ok(transactions
                .into_iter()
                .filter(|tx| tx.tx_args.is_empty())
                .collect());
        }

        Ok(transactions
            .into_iter()
            .filter(|tx| is_token_transaction(tx, contract_address))
            .collect())
    }
}

#[async_trait]
impl PriceSource for FixtureSource {
    async fn get_price(
        &self,
        assets: &[String],
        to_assets: &[String],
        _timeframe: AssetPriceTimeframe,
    ) -> wallet_core::Result<Vec<AssetPrice>> {
        let fiat = to_assets.first().cloned().unwrap_or_default();
        Ok(assets
            .iter()
            .filter_map(|asset| {
                self.fixture.prices.get(&asset.to_lowercase()).map(|price| AssetPrice {
                    from_asset: asset.clone(),
                    to_asset: fiat.clone(),
                    price: price.clone(),
                    asset_timeframe_change: "0".to_string(),
                })
            })
            .collect())
    }

    async fn get_price_history(
        &self,
        asset: &str,
        timeframe: AssetPriceTimeframe,
    ) -> wallet_core::Result<Vec<PricePoint>> {
        let now = chrono::Utc::now();
        Ok(self
            .fixture
            .price_history
            .get(&asset.to_lowercase())
            .map(|points| {
                points
                    .iter()
                    .filter(|point| timeframe.contains(point.date, now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
