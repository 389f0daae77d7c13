//! Builds the per-asset activity view of a wallet: fetches transactions of
//! every account, resolves fiat prices and turns each transaction into a
//! display record.

pub mod activity;
pub mod aggregator;
pub mod price;

pub use activity::{ActivitySettings, AssetActivityService, DisplayRecord};
pub use aggregator::{AccountTransactions, AggregatedTransactions, TransactionAggregator};
pub use price::{PriceAggregator, ResolvedPrices};

use config_manager::ConfigurationError;
use thiserror::Error;
use wallet_core::WalletError;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid activity setting: {0}")]
    InvalidSetting(String),
}

impl From<ConfigurationError> for OrchestratorError {
    fn from(err: ConfigurationError) -> Self {
        OrchestratorError::Config(err.to_string())
    }
}

impl From<WalletError> for OrchestratorError {
    fn from(err: WalletError) -> Self {
        OrchestratorError::InvalidSetting(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
