//! End-to-end checks of aggregation, price resolution and record building
//! against in-memory sources.

use activity_orchestrator::{AssetActivityService, PriceAggregator, TransactionAggregator};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use config_manager::SystemConfig;
use retry_utils::RetryPolicy;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wallet_core::{
    Account, Asset, AssetPrice, AssetPriceTimeframe, PricePoint, PriceSource, RawTransaction,
    StatusCategory, TransactionSource, TransactionStatus, TransactionType, TxData, WalletError,
};

const ACCOUNT_1: &str = "0x1111111111111111111111111111111111111111";
const ACCOUNT_2: &str = "0x2222222222222222222222222222222222222222";
const ACCOUNT_3: &str = "0x3333333333333333333333333333333333333333";
const EXTERNAL: &str = "0x9999999999999999999999999999999999999999";
const BAT_CONTRACT: &str = "0x0d8775f648430679a709e98d2b0cb6250d2887ef";
const PROXY: &str = "0xdef1c0ded9bec7f1a1670819833240f027b25eff";

const ONE_GWEI: &str = "0x3b9aca00";

fn accounts() -> Vec<Account> {
    vec![
        Account::new(ACCOUNT_1, "Account 1", false),
        Account::new(ACCOUNT_2, "Account 2", false),
        Account::new(ACCOUNT_3, "Account 3", true),
    ]
}

fn bat() -> Asset {
    Asset::new("BAT", "Basic Attention Token", BAT_CONTRACT, 18)
}

fn raw_tx(id: &str, from: &str, to: &str, value: &str, tx_type: TransactionType) -> RawTransaction {
    RawTransaction::new(
        id,
        from,
        TxData::new(to, value, "0x5208", ONE_GWEI),
        tx_type,
        TransactionStatus::Confirmed,
        Utc.with_ymd_and_hms(2021, 11, 1, 10, 0, 0).unwrap(),
    )
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        rate_limit_delays_ms: vec![1, 1],
        timeout_delays_ms: vec![1, 1],
    }
}

/// Transaction source backed by a map of address -> transactions
#[derive(Default)]
struct MockTransactionSource {
    transactions: HashMap<String, Vec<RawTransaction>>,
    failing: Vec<String>,
    rate_limited_once: Mutex<Vec<String>>,
    delays_ms: HashMap<String, u64>,
    calls: AtomicUsize,
}

impl MockTransactionSource {
    fn with(mut self, address: &str, transactions: Vec<RawTransaction>) -> Self {
        self.transactions.insert(address.to_string(), transactions);
        self
    }

    fn failing(mut self, address: &str) -> Self {
        self.failing.push(address.to_string());
        self
    }

    fn rate_limited_once(self, address: &str) -> Self {
        self.rate_limited_once.lock().unwrap().push(address.to_string());
        self
    }

    fn delayed(mut self, address: &str, ms: u64) -> Self {
        self.delays_ms.insert(address.to_string(), ms);
        self
    }
}

#[async_trait]
impl TransactionSource for MockTransactionSource {
    async fn fetch_transactions(
        &self,
        account: &Account,
        _include_all_assets: bool,
        _contract_address: &str,
    ) -> wallet_core::Result<Vec<RawTransaction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ms) = self.delays_ms.get(&account.address) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }

        if self.failing.contains(&account.address) {
            return Err(WalletError::TransactionSource("keyring locked".to_string()));
        }

        {
            let mut limited = self.rate_limited_once.lock().unwrap();
            if let Some(pos) = limited.iter().position(|a| a == &account.address) {
                limited.remove(pos);
                return Err(WalletError::RateLimit);
            }
        }

        Ok(self.transactions.get(&account.address).cloned().unwrap_or_default())
    }
}

/// Price source quoting fixed prices and recording every request
#[derive(Default)]
struct MockPriceSource {
    prices: HashMap<String, String>,
    history: Vec<PricePoint>,
    fail: bool,
    requests: Mutex<Vec<Vec<String>>>,
}

impl MockPriceSource {
    fn quoting(prices: &[(&str, &str)]) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(asset, price)| (asset.to_string(), price.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn get_price(
        &self,
        assets: &[String],
        to_assets: &[String],
        _timeframe: AssetPriceTimeframe,
    ) -> wallet_core::Result<Vec<AssetPrice>> {
        self.requests.lock().unwrap().push(assets.to_vec());

        if self.fail {
            return Err(WalletError::PriceSource("ratios unavailable".to_string()));
        }

        let fiat = to_assets.first().cloned().unwrap_or_default();
        Ok(assets
            .iter()
            .filter_map(|asset| {
                self.prices.get(asset).map(|price| AssetPrice {
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
        _asset: &str,
        _timeframe: AssetPriceTimeframe,
    ) -> wallet_core::Result<Vec<PricePoint>> {
        if self.fail {
            return Err(WalletError::Timeout);
        }
        Ok(self.history.clone())
    }
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

// ---------------------------------------------------------------------------
// Transaction aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_account_contributes_empty_list() {
    let source = MockTransactionSource::default()
        .with(ACCOUNT_1, vec![raw_tx("1", ACCOUNT_1, EXTERNAL, "0x1", TransactionType::EthSend)])
        .with(ACCOUNT_3, vec![raw_tx("3", ACCOUNT_3, EXTERNAL, "0x3", TransactionType::EthSend)])
        .failing(ACCOUNT_2);
    let aggregator = TransactionAggregator::new(Arc::new(source), fast_retries());

    let completions = AtomicUsize::new(0);
    let mut captured = None;
    aggregator
        .aggregate_with(&accounts(), true, "", |result| {
            completions.fetch_add(1, Ordering::SeqCst);
            captured = Some(result);
        })
        .await;

    assert_eq!(completions.load(Ordering::SeqCst), 1);
    let result = captured.unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result.get("Account 1").unwrap().len(), 1);
    assert!(result.get("Account 2").unwrap().is_empty());
    assert_eq!(result.get("Account 3").unwrap()[0].id, "3");
    assert_eq!(result.total_transactions(), 2);
}

#[tokio::test]
async fn test_result_follows_account_order_not_completion_order() {
    let source = MockTransactionSource::default()
        .delayed(ACCOUNT_1, 40)
        .delayed(ACCOUNT_2, 20);
    let aggregator = TransactionAggregator::new(Arc::new(source), RetryPolicy::none());

    let result = aggregator.aggregate(&accounts(), false, "").await;

    assert_eq!(result.account_names(), vec!["Account 1", "Account 2", "Account 3"]);
}

#[tokio::test]
async fn test_rate_limited_fetch_is_retried() {
    let source = Arc::new(
        MockTransactionSource::default()
            .with(ACCOUNT_1, vec![raw_tx("1", ACCOUNT_1, EXTERNAL, "0x1", TransactionType::EthSend)])
            .rate_limited_once(ACCOUNT_1),
    );
    let aggregator = TransactionAggregator::new(source.clone(), fast_retries());

    let result = aggregator.aggregate(&accounts()[..1], true, "").await;

    assert_eq!(result.get("Account 1").unwrap().len(), 1);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let source = Arc::new(MockTransactionSource::default().failing(ACCOUNT_1));
    let aggregator = TransactionAggregator::new(source.clone(), fast_retries());

    let result = aggregator.aggregate(&accounts()[..1], true, "").await;

    assert!(result.get("Account 1").unwrap().is_empty());
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_account_list() {
    let aggregator =
        TransactionAggregator::new(Arc::new(MockTransactionSource::default()), RetryPolicy::none());
    let result = aggregator.aggregate(&[], true, "").await;
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_duplicate_account_names_are_merged() {
    let source = MockTransactionSource::default()
        .with(ACCOUNT_1, vec![raw_tx("1", ACCOUNT_1, EXTERNAL, "0x1", TransactionType::EthSend)])
        .with(ACCOUNT_2, vec![raw_tx("2", ACCOUNT_2, EXTERNAL, "0x2", TransactionType::EthSend)]);
    let aggregator = TransactionAggregator::new(Arc::new(source), RetryPolicy::none());
    let twins = vec![
        Account::new(ACCOUNT_1, "Main", false),
        Account::new(ACCOUNT_2, "Main", false),
    ];

    let result = aggregator.aggregate(&twins, true, "").await;

    assert_eq!(result.len(), 1);
    let ids: Vec<&str> = result.get("Main").unwrap().iter().map(|tx| tx.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_overlapping_aggregations_are_independent() {
    let source = Arc::new(
        MockTransactionSource::default()
            .with(ACCOUNT_1, vec![raw_tx("1", ACCOUNT_1, EXTERNAL, "0x1", TransactionType::EthSend)])
            .with(ACCOUNT_2, vec![raw_tx("2", ACCOUNT_2, EXTERNAL, "0x2", TransactionType::EthSend)])
            .delayed(ACCOUNT_1, 20),
    );
    let aggregator = TransactionAggregator::new(source, RetryPolicy::none());
    let all = accounts();

    let (first, second) = tokio::join!(
        aggregator.aggregate(&all[..1], true, ""),
        aggregator.aggregate(&all[1..2], true, "")
    );

    assert_eq!(first.account_names(), vec!["Account 1"]);
    assert_eq!(first.total_transactions(), 1);
    assert_eq!(second.account_names(), vec!["Account 2"]);
    assert_eq!(second.total_transactions(), 1);
}

#[tokio::test]
async fn test_dropping_aggregation_cancels_it() {
    let source = Arc::new(MockTransactionSource::default().delayed(ACCOUNT_1, 5_000));
    let aggregator = TransactionAggregator::new(source.clone(), RetryPolicy::none());
    let all = accounts();

    let outcome =
        tokio::time::timeout(Duration::from_millis(20), aggregator.aggregate(&all, true, "")).await;
    assert!(outcome.is_err());

    // a fresh aggregation after cancellation starts from scratch
    let result = aggregator.aggregate(&all[1..], true, "").await;
    assert_eq!(result.account_names(), vec!["Account 2", "Account 3"]);
}

// ---------------------------------------------------------------------------
// Price resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_same_symbol_is_fetched_once() {
    let source = Arc::new(MockPriceSource::quoting(&[("eth", "2000")]));
    let prices = PriceAggregator::new(source.clone(), "USD");

    let resolved = prices.resolve_prices("ETH", "eth", AssetPriceTimeframe::Live).await;

    assert_eq!(resolved.base, dec("2000"));
    assert_eq!(resolved.target, dec("2000"));
    assert_eq!(source.requests(), vec![vec!["eth".to_string()]]);
    assert_eq!(prices.fiat_currency(), "usd");
}

#[tokio::test]
async fn test_base_is_fetched_before_target() {
    let source = Arc::new(MockPriceSource::quoting(&[("eth", "2000"), ("bat", "0.5")]));
    let prices = PriceAggregator::new(source.clone(), "usd");

    let resolved = prices.resolve_prices("ETH", "BAT", AssetPriceTimeframe::Live).await;

    assert_eq!(resolved.base, dec("2000"));
    assert_eq!(resolved.target, dec("0.5"));
    assert_eq!(
        source.requests(),
        vec![vec!["eth".to_string()], vec!["bat".to_string()]]
    );
}

#[tokio::test]
async fn test_unquoted_target_is_zero() {
    let source = Arc::new(MockPriceSource::quoting(&[("eth", "2000")]));
    let prices = PriceAggregator::new(source, "usd");

    let resolved = prices.resolve_prices("ETH", "NEWTOKEN", AssetPriceTimeframe::OneDay).await;

    assert_eq!(resolved.base, dec("2000"));
    assert_eq!(resolved.target, Decimal::ZERO);
}

#[tokio::test]
async fn test_failed_price_fetch_is_zero() {
    let source = Arc::new(MockPriceSource {
        fail: true,
        ..Default::default()
    });
    let prices = PriceAggregator::new(source, "usd");

    let resolved = prices.resolve_prices("ETH", "BAT", AssetPriceTimeframe::Live).await;

    assert_eq!(resolved.base, Decimal::ZERO);
    assert_eq!(resolved.target, Decimal::ZERO);
}

#[tokio::test]
async fn test_price_history_is_sorted_and_skips_bad_points() {
    let at = |day| Utc.with_ymd_and_hms(2021, 11, day, 0, 0, 0).unwrap();
    let source = Arc::new(MockPriceSource {
        history: vec![
            PricePoint { date: at(3), price: "4100.5".to_string() },
            PricePoint { date: at(1), price: "4000".to_string() },
            PricePoint { date: at(2), price: "n/a".to_string() },
        ],
        ..Default::default()
    });
    let prices = PriceAggregator::new(source, "usd");

    let history = prices.price_history("ETH", AssetPriceTimeframe::OneWeek).await;

    assert_eq!(history, vec![(at(1), dec("4000")), (at(3), dec("4100.5"))]);
}

#[tokio::test]
async fn test_failed_price_history_is_empty() {
    let source = Arc::new(MockPriceSource {
        fail: true,
        ..Default::default()
    });
    let prices = PriceAggregator::new(source, "usd");
    assert!(prices.price_history("ETH", AssetPriceTimeframe::All).await.is_empty());
}

// ---------------------------------------------------------------------------
// Display records
// ---------------------------------------------------------------------------

fn service(tx_source: MockTransactionSource, price_source: MockPriceSource) -> AssetActivityService {
    let mut config = SystemConfig::default();
    config.fetch.rate_limit_delays_ms = vec![1, 1];
    config.fetch.timeout_delays_ms = vec![1, 1];
    AssetActivityService::new(Arc::new(tx_source), Arc::new(price_source), &config).unwrap()
}

#[tokio::test]
async fn test_token_transfer_record() {
    let transfer = raw_tx("t1", ACCOUNT_1, BAT_CONTRACT, "0x0", TransactionType::Erc20Transfer)
        .with_args(&[ACCOUNT_2, "0x4563918244f40000"]);
    let service = service(
        MockTransactionSource::default().with(ACCOUNT_1, vec![transfer]),
        MockPriceSource::quoting(&[("eth", "2000"), ("bat", "0.5")]),
    );

    let records = service.asset_activity(&accounts(), &bat()).await;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.account_name, "Account 1");
    assert_eq!(record.amount, "5.0000");
    assert_eq!(record.symbol, "BAT");
    assert_eq!(record.fiat_value, "2.50");
    assert_eq!(record.action, "Account 1 sent 5.0000 BAT (2.50 USD)");
    assert_eq!(record.detail, "Account 1 -> Account 2");
    assert!((record.total_gas - 0.000021).abs() < 1e-12);
    assert_eq!(record.total_gas_fiat, "0.04");
    assert_eq!(record.total_cost, "0x1319718a5000");
    assert_eq!(record.status_label, "Confirmed");
    assert_eq!(record.status_color, 0xFF2AC194);
    assert_eq!(record.status_category, StatusCategory::Success);
    assert_eq!(record.date, "2021-11-01 10:00 AM");
}

#[tokio::test]
async fn test_native_transfer_record_adds_value_to_cost() {
    let send = raw_tx("n1", ACCOUNT_2, EXTERNAL, "0x6f05b59d3b20000", TransactionType::EthSend);
    let service = service(
        MockTransactionSource::default().with(ACCOUNT_2, vec![send]),
        MockPriceSource::quoting(&[("eth", "2000")]),
    );

    let records = service.asset_activity(&accounts(), &Asset::native("ETH")).await;

    let record = &records[0];
    assert_eq!(record.amount, "0.5000");
    assert_eq!(record.fiat_value, "1000.00");
    assert_eq!(record.detail, format!("Account 2 -> {}", EXTERNAL));
    assert_eq!(record.total_cost, "0x6f06e73453c5000");
}

#[tokio::test]
async fn test_swap_record_uses_native_price() {
    let swap = raw_tx("s1", ACCOUNT_1, PROXY, "0x6f05b59d3b20000", TransactionType::Other);
    let service = service(
        MockTransactionSource::default().with(ACCOUNT_1, vec![swap]),
        MockPriceSource::quoting(&[("eth", "2000"), ("bat", "0.5")]),
    );

    let records = service.asset_activity(&accounts(), &bat()).await;

    let record = &records[0];
    assert_eq!(record.action, "Account 1 swapped");
    assert_eq!(record.detail, "0.5000 ETH -> 0x Exchange Proxy");
    assert_eq!(record.symbol, "ETH");
    assert_eq!(record.fiat_value, "1000.00");
    assert_eq!(record.total_cost, "0x6f06e73453c5000");
}

#[tokio::test]
async fn test_approval_record_costs_gas_only() {
    let approve = raw_tx("a1", ACCOUNT_1, BAT_CONTRACT, "0x0", TransactionType::Erc20Approve)
        .with_args(&[EXTERNAL]);
    let service = service(
        MockTransactionSource::default().with(ACCOUNT_1, vec![approve]),
        MockPriceSource::quoting(&[("eth", "2000"), ("bat", "0.5")]),
    );

    let records = service.asset_activity(&accounts(), &bat()).await;

    let record = &records[0];
    assert_eq!(record.action, "Account 1 approved BAT");
    assert_eq!(record.detail, format!("Approved unlimited BAT on {}", EXTERNAL));
    assert_eq!(record.fiat_value, "0.00");
    assert_eq!(record.total_cost, "0x1319718a5000");
}

#[tokio::test]
async fn test_unpriced_asset_shows_zero_fiat() {
    let transfer = raw_tx("t1", ACCOUNT_1, BAT_CONTRACT, "0x0", TransactionType::Erc20Transfer)
        .with_args(&[EXTERNAL, "0x4563918244f40000"]);
    let service = service(
        MockTransactionSource::default().with(ACCOUNT_1, vec![transfer]),
        MockPriceSource::quoting(&[("eth", "2000")]),
    );

    let records = service.asset_activity(&accounts(), &bat()).await;

    assert_eq!(records[0].fiat_value, "0.00");
    assert_eq!(records[0].action, "Account 1 sent 5.0000 BAT (0.00 USD)");
}

#[tokio::test]
async fn test_records_follow_account_then_source_order() {
    let source = MockTransactionSource::default()
        .with(
            ACCOUNT_1,
            vec![
                raw_tx("a", ACCOUNT_1, EXTERNAL, "0x1", TransactionType::EthSend),
                raw_tx("b", ACCOUNT_1, EXTERNAL, "0x1", TransactionType::EthSend),
            ],
        )
        .with(ACCOUNT_3, vec![raw_tx("c", ACCOUNT_3, ACCOUNT_1, "0x1", TransactionType::EthSend)])
        .failing(ACCOUNT_2)
        .delayed(ACCOUNT_1, 20);
    let service = service(source, MockPriceSource::quoting(&[("eth", "2000")]));

    let records = service.asset_activity(&accounts(), &Asset::native("ETH")).await;

    let ids: Vec<&str> = records.iter().map(|r| r.transaction.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(records[2].detail, "Account 3 -> Account 1");
}

#[tokio::test]
async fn test_records_keep_their_own_hash_when_ids_repeat_across_accounts() {
    let source = MockTransactionSource::default()
        .with(
            ACCOUNT_1,
            vec![raw_tx("1", ACCOUNT_1, EXTERNAL, "0x1", TransactionType::EthSend).with_hash("0xaaaa")],
        )
        .with(
            ACCOUNT_2,
            vec![raw_tx("1", ACCOUNT_2, EXTERNAL, "0x1", TransactionType::EthSend).with_hash("0xbbbb")],
        )
        .with(ACCOUNT_3, vec![raw_tx("1", ACCOUNT_3, EXTERNAL, "0x1", TransactionType::EthSend)]);
    let service = service(source, MockPriceSource::quoting(&[("eth", "2000")]));

    let records = service.asset_activity(&accounts(), &Asset::native("ETH")).await;

    let hashes: Vec<Option<&str>> = records.iter().map(|r| r.tx_hash.as_deref()).collect();
    assert_eq!(hashes, vec![Some("0xaaaa"), Some("0xbbbb"), None]);
}

#[test]
fn test_service_rejects_invalid_config() {
    let mut config = SystemConfig::default();
    config.pricing.timeframe = "fortnight".to_string();
    let built = AssetActivityService::new(
        Arc::new(MockTransactionSource::default()),
        Arc::new(MockPriceSource::default()),
        &config,
    );
    assert!(built.is_err());
}
