use futures::future::join_all;
use retry_utils::{retry_fetch, FailureKind, RetryPolicy};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wallet_core::{Account, RawTransaction, TransactionSource, WalletError};

/// Transactions fetched for one account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountTransactions {
    pub account: Account,
    pub transactions: Vec<RawTransaction>,
}

/// Per-account transactions keyed by account name, in the order the
/// accounts were given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedTransactions {
    entries: Vec<AccountTransactions>,
}

impl AggregatedTransactions {
    /// Add an account's transactions. A name seen before keeps its position
    /// and gets the new transactions appended.
    pub fn insert(&mut self, account: &Account, transactions: Vec<RawTransaction>) {
        match self.entries.iter_mut().find(|entry| entry.account.name == account.name) {
            Some(entry) => entry.transactions.extend(transactions),
            None => self.entries.push(AccountTransactions {
                account: account.clone(),
                transactions,
            }),
        }
    }

    pub fn get(&self, account_name: &str) -> Option<&[RawTransaction]> {
        self.entries
            .iter()
            .find(|entry| entry.account.name == account_name)
            .map(|entry| entry.transactions.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountTransactions> {
        self.entries.iter()
    }

    pub fn account_names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.account.name.as_str()).collect()
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_transactions(&self) -> usize {
        self.entries.iter().map(|entry| entry.transactions.len()).sum()
    }
}

fn failure_kind(error: &WalletError) -> FailureKind {
    if !error.is_transient() {
        return FailureKind::Permanent;
    }
    match error {
        WalletError::RateLimit => FailureKind::RateLimit,
        _ => FailureKind::Timeout,
    }
}

/// Fetches transactions for a set of accounts and groups them per account
#[derive(Clone)]
pub struct TransactionAggregator {
    source: Arc<dyn TransactionSource>,
    retry_policy: RetryPolicy,
}

impl TransactionAggregator {
    pub fn new(source: Arc<dyn TransactionSource>, retry_policy: RetryPolicy) -> Self {
        Self { source, retry_policy }
    }

    /// Fetch every account concurrently and return once all fetches have
    /// resolved. An account whose fetch fails contributes an empty list.
    ///
    /// Each call owns its accumulator; dropping the returned future drops
    /// every fetch still in flight.
    pub async fn aggregate(
        &self,
        accounts: &[Account],
        include_all_assets: bool,
        contract_address: &str,
    ) -> AggregatedTransactions {
        debug!(
            "Fetching transactions for {} accounts (all assets: {}, contract: '{}')",
            accounts.len(),
            include_all_assets,
            contract_address
        );

        let fetches = accounts
            .iter()
            .map(|account| self.fetch_account(account, include_all_assets, contract_address));
        let results = join_all(fetches).await;

        let mut aggregated = AggregatedTransactions::default();
        for (account, transactions) in accounts.iter().zip(results) {
            aggregated.insert(account, transactions);
        }

        info!(
            "📊 Aggregated {} transactions across {} accounts",
            aggregated.total_transactions(),
            aggregated.len()
        );

        aggregated
    }

    /// Same as [`aggregate`](Self::aggregate), handing the result to
    /// `on_complete` exactly once when every fetch has resolved.
    pub async fn aggregate_with<F>(
        &self,
        accounts: &[Account],
        include_all_assets: bool,
        contract_address: &str,
        on_complete: F,
    ) where
        F: FnOnce(AggregatedTransactions),
    {
        let aggregated = self.aggregate(accounts, include_all_assets, contract_address).await;
        on_complete(aggregated);
    }

    async fn fetch_account(
        &self,
        account: &Account,
        include_all_assets: bool,
        contract_address: &str,
    ) -> Vec<RawTransaction> {
        let source = &self.source;
        let outcome = retry_fetch(
            move || source.fetch_transactions(account, include_all_assets, contract_address),
            &self.retry_policy,
            failure_kind,
        )
        .await;

        match outcome.result {
            Ok(transactions) => {
                debug!(
                    "Fetched {} transactions for {} in {} attempt(s)",
                    transactions.len(),
                    account.name,
                    outcome.attempts
                );
                transactions
            }
            Err(e) => {
                warn!(
                    "Transaction fetch for {} ({}) failed after {} attempt(s), showing none: {}",
                    account.name, account.address, outcome.attempts, e
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_follows_transience() {
        assert_eq!(failure_kind(&WalletError::RateLimit), FailureKind::RateLimit);
        assert_eq!(failure_kind(&WalletError::Timeout), FailureKind::Timeout);
        assert_eq!(
            failure_kind(&WalletError::TransactionSource("locked".to_string())),
            FailureKind::Permanent
        );
        assert_eq!(
            failure_kind(&WalletError::InvalidAmount("0xzz".to_string())),
            FailureKind::Permanent
        );
    }
}
