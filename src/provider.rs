use crate::models::{
    BlockDetails, BlockInfo, SearchResultBatch, TokenBalances, TokenMetadata, TransactionRecord,
    TxTransfers,
};
use alloy_primitives::{Address, B256};
use anyhow::Result;
use async_trait::async_trait;
use std::ops::RangeInclusive;

/// Block number meaning "start from the most recent block" in address searches.
pub const LATEST_BLOCK: u64 = 0;

/// Query capabilities the aggregation layer needs from a node.
///
/// Every call is an independent request that may fail on its own. Implementations
/// must not retry transparently.
#[async_trait]
pub trait ExplorerProvider: Send + Sync {
    async fn block_number(&self) -> Result<u64>;

    async fn block_details_by_hash(&self, hash: B256) -> Result<BlockDetails>;

    /// Up to `page_size` transactions for `address` strictly before `block_number`, newest first.
    async fn search_transactions_before(
        &self,
        address: Address,
        block_number: u64,
        page_size: usize,
    ) -> Result<SearchResultBatch>;

    /// Up to `page_size` transactions for `address` strictly after `block_number`, oldest first.
    async fn search_transactions_after(
        &self,
        address: Address,
        block_number: u64,
        page_size: usize,
    ) -> Result<SearchResultBatch>;

    async fn transaction_by_hash(&self, hash: B256) -> Result<TransactionRecord>;

    async fn block_info(&self, block_number: u64) -> Result<BlockInfo>;

    async fn gas_price(&self) -> Result<u128>;

    async fn max_priority_fee(&self) -> Result<u128>;

    /// Balance container per token, in the order of `tokens`. A token whose lookup
    /// failed is reported as [`TokenBalanceValue::Error`](crate::models::TokenBalanceValue::Error)
    /// instead of failing the whole call.
    async fn token_balances(&self, address: Address, tokens: &[Address]) -> Result<TokenBalances>;

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata>;

    /// Transactions within `blocks` in which `address` sent or received a token,
    /// each listed with every token transfer the transaction emitted.
    async fn transfer_log(
        &self,
        address: Address,
        blocks: RangeInclusive<u64>,
    ) -> Result<Vec<TxTransfers>>;
}
