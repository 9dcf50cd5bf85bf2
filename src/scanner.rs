use crate::fanout::all_or_nothing;
use crate::models::{BlockContext, BlockDetails, BlockInfo, BlockTimestamp, ExtendedTransaction};
use crate::provider::ExplorerProvider;
use alloy_primitives::B256;
use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::debug;

/// Fetches `count` blocks walking backward from `start_block`, returned in that order.
///
/// Block `0` is the "no recent block known" marker and is never fetched, so a
/// `start_block` of `0` (or a `count` of `0`) yields an empty list. Any single
/// block failing fails the whole scan.
pub async fn scan_blocks_backward<P>(
    provider: &P,
    start_block: u64,
    count: usize,
) -> Result<Vec<BlockInfo>>
where
    P: ExplorerProvider + ?Sized,
{
    if count == 0 || start_block == 0 {
        return Ok(Vec::new());
    }

    let numbers: Vec<u64> = (0..count as u64)
        .map_while(|i| start_block.checked_sub(i).filter(|n| *n > 0))
        .collect();
    debug!(
        "Scanning {} blocks backward from block {}",
        numbers.len(),
        start_block
    );

    all_or_nothing(numbers.into_iter().map(|number| async move {
        provider
            .block_info(number)
            .await
            .with_context(|| format!("Failed to fetch block {number}"))
    }))
    .await
}

/// Picks up to `limit` transaction hashes from `blocks`, newest first.
///
/// Blocks are visited in the given order and each block's hashes last to first.
/// A hash seen again keeps its first position but takes the later block's timestamp.
pub fn recent_transaction_hashes(blocks: &[BlockInfo], limit: usize) -> Vec<(B256, u64)> {
    let mut positions: HashMap<B256, usize> = HashMap::new();
    let mut collected: Vec<(B256, u64)> = Vec::new();

    'blocks: for block in blocks {
        for hash in block.transactions.iter().rev() {
            if collected.len() == limit {
                break 'blocks;
            }
            match positions.get(hash) {
                Some(&at) => collected[at].1 = block.timestamp,
                None => {
                    positions.insert(*hash, collected.len());
                    collected.push((*hash, block.timestamp));
                }
            }
        }
    }

    collected
}

/// Resolves the most recent `limit` transactions of `blocks` into full records
/// carrying their block timestamp.
pub async fn collect_recent_transactions<P>(
    provider: &P,
    blocks: &[BlockInfo],
    limit: usize,
) -> Result<Vec<ExtendedTransaction>>
where
    P: ExplorerProvider + ?Sized,
{
    let hashes = recent_transaction_hashes(blocks, limit);
    debug!(
        "Resolving {} transactions from {} blocks",
        hashes.len(),
        blocks.len()
    );

    all_or_nothing(hashes.into_iter().map(|(hash, timestamp)| async move {
        let txn = provider
            .transaction_by_hash(hash)
            .await
            .with_context(|| format!("Failed to fetch transaction {hash}"))?;
        Ok::<_, anyhow::Error>(ExtendedTransaction {
            txn,
            block_data: BlockContext {
                timestamp: BlockTimestamp::Known(timestamp),
            },
        })
    }))
    .await
}

pub async fn latest_block_number<P>(provider: &P) -> Result<u64>
where
    P: ExplorerProvider + ?Sized,
{
    provider
        .block_number()
        .await
        .context("Failed to fetch latest block number")
}

pub async fn gas_price_wei<P>(provider: &P) -> Result<u128>
where
    P: ExplorerProvider + ?Sized,
{
    provider.gas_price().await.context("Failed to fetch gas price")
}

pub async fn max_priority_fee_wei<P>(provider: &P) -> Result<u128>
where
    P: ExplorerProvider + ?Sized,
{
    provider
        .max_priority_fee()
        .await
        .context("Failed to fetch max priority fee")
}

pub async fn block_details_by_hash<P>(provider: &P, hash: B256) -> Result<BlockDetails>
where
    P: ExplorerProvider + ?Sized,
{
    provider
        .block_details_by_hash(hash)
        .await
        .with_context(|| format!("Failed to fetch block details for {hash}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockProvider, hash};

    fn three_blocks() -> MockProvider {
        MockProvider::default()
            .with_block(100, 1000, &[1, 2, 3, 4, 5])
            .with_block(99, 990, &[6, 7, 8, 9, 10])
            .with_block(98, 980, &[11, 12, 13, 14, 15])
    }

    #[tokio::test]
    async fn scan_with_zero_start_or_count_is_empty_and_fetches_nothing() {
        let provider = three_blocks();
        assert!(scan_blocks_backward(&provider, 0, 5).await.unwrap().is_empty());
        assert!(scan_blocks_backward(&provider, 100, 0).await.unwrap().is_empty());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn scan_returns_blocks_in_requested_order() {
        let provider = three_blocks();
        let blocks = scan_blocks_backward(&provider, 100, 3).await.unwrap();
        let numbers: Vec<u64> = blocks.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![100, 99, 98]);
    }

    #[tokio::test]
    async fn scan_never_walks_past_block_one() {
        let provider = MockProvider::default()
            .with_block(2, 20, &[1])
            .with_block(1, 10, &[2]);
        let blocks = scan_blocks_backward(&provider, 2, 10).await.unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(!provider.calls().contains(&"block 0".to_string()));
    }

    #[tokio::test]
    async fn scan_fails_when_any_block_fails() {
        let provider = three_blocks();
        let err = scan_blocks_backward(&provider, 100, 4).await.unwrap_err();
        assert!(format!("{err:#}").contains("block 97"));
    }

    #[tokio::test]
    async fn collection_stops_at_limit_in_per_block_reverse_order() {
        let provider = three_blocks();
        let blocks = scan_blocks_backward(&provider, 100, 3).await.unwrap();

        let txns = collect_recent_transactions(&provider, &blocks, 7)
            .await
            .unwrap();

        let hashes: Vec<B256> = txns.iter().map(|t| t.hash()).collect();
        assert_eq!(
            hashes,
            [5, 4, 3, 2, 1, 10, 9].map(hash).to_vec(),
            "drawn from the first two blocks only"
        );
        assert_eq!(
            txns[0].block_data.timestamp,
            BlockTimestamp::Known(1000)
        );
        assert_eq!(
            txns[6].block_data.timestamp,
            BlockTimestamp::Known(990)
        );
    }

    #[test]
    fn duplicate_hashes_keep_position_and_take_later_timestamp() {
        let blocks = vec![
            BlockInfo {
                number: 2,
                timestamp: 20,
                transactions: vec![hash(1), hash(2)],
            },
            BlockInfo {
                number: 1,
                timestamp: 10,
                transactions: vec![hash(2), hash(3)],
            },
        ];
        assert_eq!(
            recent_transaction_hashes(&blocks, 10),
            vec![(hash(2), 10), (hash(1), 20), (hash(3), 10)]
        );
        assert!(recent_transaction_hashes(&blocks, 0).is_empty());
    }

    #[tokio::test]
    async fn collection_fails_when_a_transaction_cannot_be_resolved() {
        let mut provider = three_blocks();
        provider.transactions.remove(&hash(4));
        let blocks = scan_blocks_backward(&provider, 100, 1).await.unwrap();
        assert!(
            collect_recent_transactions(&provider, &blocks, 5)
                .await
                .is_err()
        );
    }
}
