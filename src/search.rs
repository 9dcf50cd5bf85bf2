use crate::fanout::all_or_nothing;
use crate::models::{
    BlockContext, BlockTimestamp, ExtendedTransaction, SearchResultBatch, newest_first,
};
use crate::provider::{ExplorerProvider, LATEST_BLOCK};
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Attaches each transaction's block timestamp from the receipt with the same hash.
///
/// Output keeps the order of `batch.txs`. A transaction without a matching
/// receipt, or whose receipt has no timestamp, gets [`BlockTimestamp::Unknown`].
pub fn join_with_receipts(batch: SearchResultBatch) -> Vec<ExtendedTransaction> {
    let mut timestamps: HashMap<B256, Option<u64>> =
        HashMap::with_capacity(batch.receipts.len());
    for receipt in &batch.receipts {
        timestamps
            .entry(receipt.transaction_hash)
            .or_insert(receipt.timestamp);
    }

    batch
        .txs
        .into_iter()
        .map(|txn| {
            let timestamp = timestamps
                .get(&txn.hash)
                .copied()
                .flatten()
                .map_or(BlockTimestamp::Unknown, BlockTimestamp::Known);
            ExtendedTransaction {
                txn,
                block_data: BlockContext { timestamp },
            }
        })
        .collect()
}

/// Concatenates `lists`, drops repeated hashes (first occurrence wins), sorts
/// newest first with unknown timestamps last and keeps at most `limit` entries.
pub fn merge_newest_first<I>(lists: I, limit: usize) -> Vec<ExtendedTransaction>
where
    I: IntoIterator<Item = Vec<ExtendedTransaction>>,
{
    let mut seen = HashSet::new();
    let mut merged: Vec<ExtendedTransaction> = lists
        .into_iter()
        .flatten()
        .filter(|txn| seen.insert(txn.hash()))
        .collect();

    merged.sort_by(|a, b| newest_first(&a.block_data.timestamp, &b.block_data.timestamp));
    merged.truncate(limit);
    merged
}

/// Latest `limit` transactions across all `addresses`, newest first, each hash once.
pub async fn search_multi_address<P>(
    provider: &P,
    addresses: &[Address],
    limit: usize,
) -> Result<Vec<ExtendedTransaction>>
where
    P: ExplorerProvider + ?Sized,
{
    debug!(
        "Searching latest {} transactions for {} addresses",
        limit,
        addresses.len()
    );

    let batches = all_or_nothing(addresses.iter().map(|address| async move {
        provider
            .search_transactions_before(*address, LATEST_BLOCK, limit)
            .await
            .with_context(|| format!("Failed to search transactions for {address}"))
    }))
    .await?;

    Ok(merge_newest_first(
        batches.into_iter().map(join_with_receipts),
        limit,
    ))
}

/// One page of `address` transactions before `block_number`, in provider order.
pub async fn transactions_before<P>(
    provider: &P,
    address: Address,
    block_number: u64,
    page_size: usize,
) -> Result<Vec<ExtendedTransaction>>
where
    P: ExplorerProvider + ?Sized,
{
    let batch = provider
        .search_transactions_before(address, block_number, page_size)
        .await
        .with_context(|| {
            format!("Failed to search transactions for {address} before block {block_number}")
        })?;
    Ok(join_with_receipts(batch))
}

/// One page of `address` transactions after `block_number`, in provider order.
pub async fn transactions_after<P>(
    provider: &P,
    address: Address,
    block_number: u64,
    page_size: usize,
) -> Result<Vec<ExtendedTransaction>>
where
    P: ExplorerProvider + ?Sized,
{
    let batch = provider
        .search_transactions_after(address, block_number, page_size)
        .await
        .with_context(|| {
            format!("Failed to search transactions for {address} after block {block_number}")
        })?;
    Ok(join_with_receipts(batch))
}

pub async fn latest_transactions<P>(
    provider: &P,
    address: Address,
    limit: usize,
) -> Result<Vec<ExtendedTransaction>>
where
    P: ExplorerProvider + ?Sized,
{
    transactions_before(provider, address, LATEST_BLOCK, limit).await
}
