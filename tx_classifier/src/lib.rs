// Transaction classifier: turns raw wallet transactions into typed records
// with canonical recipient, value and display text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wallet_core::format::ASSET_PRECISION;
use wallet_core::{
    account_label, format_units, Account, Asset, RawTransaction, TransactionStatus, TransactionType,
};

/// 0x exchange proxy every in-wallet swap is routed through
pub const SWAP_EXCHANGE_PROXY: &str = "0xdef1c0ded9bec7f1a1670819833240f027b25eff";
pub const SWAP_EXCHANGE_PROXY_LABEL: &str = "0x Exchange Proxy";

/// Configuration for transaction classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub exchange_proxy_address: String,
    pub exchange_proxy_label: String,
    pub native_symbol: String,
    pub native_decimals: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            exchange_proxy_address: SWAP_EXCHANGE_PROXY.to_string(),
            exchange_proxy_label: SWAP_EXCHANGE_PROXY_LABEL.to_string(),
            native_symbol: "ETH".to_string(),
            native_decimals: 18,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionKind {
    NativeTransfer,
    TokenTransfer,
    TokenApprove,
    Swap,
}

/// A transaction after classification. Never mutated once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedTransaction {
    pub id: String,

    pub kind: TransactionKind,

    pub from_address: String,

    /// Display name of the sending account
    pub sender_name: String,

    /// Effective recipient address
    pub recipient: String,

    /// Account name of the recipient, or the address when it is not ours
    pub recipient_label: String,

    /// Effective value as a HexAmount
    pub value: String,

    /// Decimal count `value` is scaled by
    pub value_decimals: u32,

    /// Symbol the value is denominated in
    pub value_symbol: String,

    /// `value` at `value_decimals`, four fractional digits
    pub display_amount: String,

    /// Counterparty of an ERC20 approval
    pub approved_spender: Option<String>,

    pub action: String,

    pub detail: String,

    pub status: TransactionStatus,

    pub created_time: DateTime<Utc>,
}

/// Everything about the caller's view a classification depends on
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    /// Asset whose activity is being displayed
    pub asset: &'a Asset,

    /// Name of the account that sent the transaction
    pub sender_name: &'a str,

    /// Known wallet accounts, used to label recipients
    pub accounts: &'a [Account],
}

/// Stateless transaction classifier
#[derive(Debug, Clone)]
pub struct TransactionClassifier {
    config: ClassifierConfig,
}

impl TransactionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Whether `tx` is sent to the known exchange proxy
    pub fn is_swap(&self, tx: &RawTransaction) -> bool {
        tx.tx_data.to.eq_ignore_ascii_case(&self.config.exchange_proxy_address)
    }

    fn label_for(&self, address: &str, accounts: &[Account]) -> String {
        if address.eq_ignore_ascii_case(&self.config.exchange_proxy_address) {
            self.config.exchange_proxy_label.clone()
        } else {
            account_label(accounts, address)
        }
    }

    /// Classify one transaction.
    ///
    /// Native-transfer fields are computed first, the ERC20 transfer/approve
    /// rules then refine them, and a transaction sent to the exchange proxy
    /// is always a swap regardless of what the earlier rules decided.
    pub fn classify(&self, tx: &RawTransaction, ctx: &ClassifyContext<'_>) -> ClassifiedTransaction {
        let asset = ctx.asset;
        let base = &tx.tx_data;

        let mut kind = TransactionKind::NativeTransfer;
        let mut recipient = base.to.clone();
        let mut value = base.value.clone();
        let mut value_decimals = asset.decimals;
        let mut value_symbol = asset.symbol.clone();
        let mut approved_spender = None;

        match tx.tx_type {
            TransactionType::Erc20Transfer if tx.tx_args.len() > 1 => {
                kind = TransactionKind::TokenTransfer;
                recipient = tx.tx_args[0].clone();
                value = tx.tx_args[1].clone();
            }
            TransactionType::Erc20Approve => {
                kind = TransactionKind::TokenApprove;
                value = "0x0".to_string();
                approved_spender = Some(match tx.tx_args.first() {
                    Some(spender) => self.label_for(spender, ctx.accounts),
                    None => self.config.exchange_proxy_label.clone(),
                });
            }
            _ => {}
        }

        if self.is_swap(tx) {
            kind = TransactionKind::Swap;
            recipient = base.to.clone();
            value = base.value.clone();
            value_decimals = self.config.native_decimals;
            value_symbol = self.config.native_symbol.clone();
            approved_spender = None;
        }

        let display_amount = format_units(&value, value_decimals, ASSET_PRECISION);
        let recipient_label = self.label_for(&recipient, ctx.accounts);

        let (action, detail) = match kind {
            TransactionKind::NativeTransfer | TransactionKind::TokenTransfer => (
                format!("{} sent {} {}", ctx.sender_name, display_amount, value_symbol),
                format!("{} -> {}", ctx.sender_name, recipient_label),
            ),
            TransactionKind::TokenApprove => (
                format!("{} approved {}", ctx.sender_name, value_symbol),
                format!(
                    "Approved unlimited {} on {}",
                    value_symbol,
                    approved_spender.as_deref().unwrap_or(&self.config.exchange_proxy_label)
                ),
            ),
            TransactionKind::Swap => (
                format!("{} swapped", ctx.sender_name),
                format!("{} {} -> {}", display_amount, value_symbol, recipient_label),
            ),
        };

        debug!(
            "🔍 Classified tx {} from {} as {:?} ({} {})",
            tx.id, tx.from_address, kind, display_amount, value_symbol
        );

        ClassifiedTransaction {
            id: tx.id.clone(),
            kind,
            from_address: tx.from_address.clone(),
            sender_name: ctx.sender_name.to_string(),
            recipient,
            recipient_label,
            value,
            value_decimals,
            value_symbol,
            display_amount,
            approved_spender,
            action,
            detail,
            status: tx.status,
            created_time: tx.created_time,
        }
    }
}

impl Default for TransactionClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
