pub mod wei;
pub mod hex_math;
pub mod format;
pub mod timeframe;

pub use hex_math::{add_hex, gas_fee_hex, multiply_hex};
pub use timeframe::AssetPriceTimeframe;
pub use wei::{
    decimal_to_hex_wei, decimal_to_wei_string, format_units, hex_wei_to_decimal,
    wei_string_to_decimal,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decimal count assumed for an asset when none is supplied
pub const DEFAULT_DECIMALS: u32 = 18;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Transaction source error: {0}")]
    TransactionSource(String),
    #[error("Price source error: {0}")]
    PriceSource(String),
    #[error("Source request timed out")]
    Timeout,
    #[error("Source rate limit exceeded")]
    RateLimit,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Timeframe parsing error: {0}")]
    TimeframeParse(String),
}

impl WalletError {
    /// Whether a collaborator call that failed with this error is worth repeating
    pub fn is_transient(&self) -> bool {
        matches!(self, WalletError::Timeout | WalletError::RateLimit)
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;

/// A token or the network's native currency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    /// Ticker symbol, e.g. "ETH" or "BAT"
    pub symbol: String,

    /// Human readable name
    #[serde(default)]
    pub name: String,

    /// Token contract address (empty for the native asset)
    #[serde(default)]
    pub contract_address: String,

    /// Number of decimals the raw on-chain value is scaled by
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

fn default_decimals() -> u32 {
    DEFAULT_DECIMALS
}

impl Asset {
    pub fn new(symbol: &str, name: &str, contract_address: &str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            contract_address: contract_address.to_string(),
            decimals,
        }
    }

    /// The network's native currency (no contract, 18 decimals)
    pub fn native(symbol: &str) -> Self {
        Self::new(symbol, symbol, "", DEFAULT_DECIMALS)
    }

    pub fn is_native(&self) -> bool {
        self.contract_address.is_empty()
    }
}

/// Wallet account as exposed by the keyring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub address: String,
    pub name: String,
    #[serde(default)]
    pub is_imported: bool,
}

impl Account {
    pub fn new(address: &str, name: &str, is_imported: bool) -> Self {
        Self {
            address: address.to_string(),
            name: name.to_string(),
            is_imported,
        }
    }
}

/// Display name for an address: the owning account's name if it is one of
/// ours, otherwise the address itself.
pub fn account_label(accounts: &[Account], address: &str) -> String {
    accounts
        .iter()
        .find(|account| account.address.eq_ignore_ascii_case(address))
        .map(|account| account.name.clone())
        .unwrap_or_else(|| address.to_string())
}

/// Base transaction data. All amounts are HexAmounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxData {
    #[serde(default)]
    pub nonce: String,
    pub to: String,
    pub value: String,
    pub gas_limit: String,
    pub gas_price: String,
}

impl TxData {
    pub fn new(to: &str, value: &str, gas_limit: &str, gas_price: &str) -> Self {
        Self {
            nonce: String::new(),
            to: to.to_string(),
            value: value.to_string(),
            gas_limit: gas_limit.to_string(),
            gas_price: gas_price.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    EthSend,
    Erc20Transfer,
    Erc20Approve,
    Erc721TransferFrom,
    Erc721SafeTransferFrom,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Unapproved,
    Approved,
    Rejected,
    Submitted,
    Confirmed,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusCategory {
    Pending,
    Success,
    Failure,
}

impl TransactionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Unapproved => "Unapproved",
            TransactionStatus::Approved => "Approved",
            TransactionStatus::Rejected => "Rejected",
            TransactionStatus::Submitted => "Submitted",
            TransactionStatus::Confirmed => "Confirmed",
            TransactionStatus::Error => "Error",
        }
    }

    /// ARGB colour of the status dot
    pub fn color(&self) -> u32 {
        match self {
            TransactionStatus::Unapproved => 0xFF5E6175,
            TransactionStatus::Approved | TransactionStatus::Confirmed => 0xFF2AC194,
            TransactionStatus::Submitted => 0xFFFFD43B,
            TransactionStatus::Rejected | TransactionStatus::Error => 0xFFEE6374,
        }
    }

    pub fn category(&self) -> StatusCategory {
        match self {
            TransactionStatus::Unapproved | TransactionStatus::Submitted => StatusCategory::Pending,
            TransactionStatus::Approved | TransactionStatus::Confirmed => StatusCategory::Success,
            TransactionStatus::Rejected | TransactionStatus::Error => StatusCategory::Failure,
        }
    }
}

/// Transaction record as delivered by the transaction source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawTransaction {
    /// Source-assigned identifier
    pub id: String,

    /// Sending account address
    pub from_address: String,

    pub tx_data: TxData,

    pub tx_type: TransactionType,

    /// Decoded call arguments (ERC20 recipient/spender, amount)
    #[serde(default)]
    pub tx_args: Vec<String>,

    pub status: TransactionStatus,

    pub created_time: DateTime<Utc>,

    #[serde(default)]
    pub tx_hash: Option<String>,
}

impl RawTransaction {
    pub fn new(
        id: &str,
        from_address: &str,
        tx_data: TxData,
        tx_type: TransactionType,
        status: TransactionStatus,
        created_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            from_address: from_address.to_string(),
            tx_data,
            tx_type,
            tx_args: Vec::new(),
            status,
            created_time,
            tx_hash: None,
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.tx_args = args.iter().map(|arg| arg.to_string()).collect();
        self
    }

    pub fn with_hash(mut self, hash: &str) -> Self {
        self.tx_hash = Some(hash.to_string());
        self
    }
}

/// Price quote for one asset in one fiat currency. A price of "0" means unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetPrice {
    pub from_asset: String,
    pub to_asset: String,
    pub price: String,
    #[serde(default)]
    pub asset_timeframe_change: String,
}

/// Single point of an asset's price history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub price: String,
}

/// Source of pending/confirmed transactions per account
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetch transactions of one account. An empty `contract_address` means
    /// native asset only unless `include_all_assets` is set.
    async fn fetch_transactions(
        &self,
        account: &Account,
        include_all_assets: bool,
        contract_address: &str,
    ) -> Result<Vec<RawTransaction>>;
}

/// Source of fiat prices
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn get_price(
        &self,
        assets: &[String],
        to_assets: &[String],
        timeframe: AssetPriceTimeframe,
    ) -> Result<Vec<AssetPrice>>;

    async fn get_price_history(
        &self,
        asset: &str,
        timeframe: AssetPriceTimeframe,
    ) -> Result<Vec<PricePoint>>;
}
