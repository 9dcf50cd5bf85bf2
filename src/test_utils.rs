use crate::models::{
    BlockDetails, BlockInfo, SearchReceipt, SearchResultBatch, TokenBalances, TokenMetadata,
    TransactionRecord, TxTransfers,
};
use crate::provider::ExplorerProvider;
use alloy_primitives::{Address, B256, Bytes, U64, U256};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Mutex;

pub fn hash(n: u64) -> B256 {
    B256::from(U256::from(n))
}

pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn txn(n: u64) -> TransactionRecord {
    TransactionRecord {
        hash: hash(n),
        from: addr(1),
        to: Some(addr(2)),
        value: U256::from(n),
        nonce: U64::from(n),
        block_number: None,
        gas_price: None,
        input: Bytes::new(),
    }
}

pub fn receipt(n: u64, timestamp: u64) -> SearchReceipt {
    SearchReceipt {
        transaction_hash: hash(n),
        timestamp: Some(timestamp),
        status: None,
        gas_used: None,
    }
}

pub fn batch(txs: &[u64], receipts: &[(u64, u64)]) -> SearchResultBatch {
    SearchResultBatch {
        txs: txs.iter().map(|n| txn(*n)).collect(),
        receipts: receipts.iter().map(|(n, ts)| receipt(*n, *ts)).collect(),
        first_page: true,
        last_page: true,
    }
}

/// In-memory provider. Lookups with no configured answer fail.
#[derive(Default)]
pub struct MockProvider {
    pub latest_block: u64,
    pub gas_price: u128,
    pub priority_fee: u128,
    pub blocks: HashMap<u64, BlockInfo>,
    pub block_details: HashMap<B256, BlockDetails>,
    pub searches_before: HashMap<Address, SearchResultBatch>,
    pub searches_after: HashMap<Address, SearchResultBatch>,
    pub transactions: HashMap<B256, TransactionRecord>,
    pub balances: HashMap<Address, TokenBalances>,
    pub metadata: HashMap<Address, TokenMetadata>,
    pub transfers: HashMap<Address, Vec<TxTransfers>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn with_block(mut self, number: u64, timestamp: u64, txs: &[u64]) -> Self {
        self.blocks.insert(
            number,
            BlockInfo {
                number,
                timestamp,
                transactions: txs.iter().map(|n| hash(*n)).collect(),
            },
        );
        for n in txs {
            self.transactions.insert(hash(*n), txn(*n));
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn page(batch: Option<&SearchResultBatch>, page_size: usize) -> Result<SearchResultBatch> {
        let mut batch = batch.cloned().ok_or_else(|| anyhow!("search failed"))?;
        batch.txs.truncate(page_size);
        Ok(batch)
    }
}

#[async_trait]
impl ExplorerProvider for MockProvider {
    async fn block_number(&self) -> Result<u64> {
        self.record("block_number".into());
        Ok(self.latest_block)
    }

    async fn block_details_by_hash(&self, hash: B256) -> Result<BlockDetails> {
        self.record(format!("block_details {hash}"));
        self.block_details
            .get(&hash)
            .cloned()
            .ok_or_else(|| anyhow!("unknown block {hash}"))
    }

    async fn search_transactions_before(
        &self,
        address: Address,
        block_number: u64,
        page_size: usize,
    ) -> Result<SearchResultBatch> {
        self.record(format!("before {address} {block_number} {page_size}"));
        Self::page(self.searches_before.get(&address), page_size)
    }

    async fn search_transactions_after(
        &self,
        address: Address,
        block_number: u64,
        page_size: usize,
    ) -> Result<SearchResultBatch> {
        self.record(format!("after {address} {block_number} {page_size}"));
        Self::page(self.searches_after.get(&address), page_size)
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<TransactionRecord> {
        self.record(format!("transaction {hash}"));
        self.transactions
            .get(&hash)
            .cloned()
            .ok_or_else(|| anyhow!("unknown transaction {hash}"))
    }

    async fn block_info(&self, block_number: u64) -> Result<BlockInfo> {
        self.record(format!("block {block_number}"));
        self.blocks
            .get(&block_number)
            .cloned()
            .ok_or_else(|| anyhow!("unknown block {block_number}"))
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(self.gas_price)
    }

    async fn max_priority_fee(&self) -> Result<u128> {
        Ok(self.priority_fee)
    }

    async fn token_balances(&self, address: Address, tokens: &[Address]) -> Result<TokenBalances> {
        self.record(format!("balances {address} {}", tokens.len()));
        let balances = self
            .balances
            .get(&address)
            .ok_or_else(|| anyhow!("balances unavailable for {address}"))?;
        Ok(balances
            .iter()
            .filter(|(token, _)| tokens.contains(token))
            .cloned()
            .collect())
    }

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata> {
        self.record(format!("metadata {token}"));
        self.metadata
            .get(&token)
            .cloned()
            .ok_or_else(|| anyhow!("metadata call reverted for {token}"))
    }

    async fn transfer_log(
        &self,
        address: Address,
        blocks: RangeInclusive<u64>,
    ) -> Result<Vec<TxTransfers>> {
        self.record(format!("transfers {address} {blocks:?}"));
        let entries = self
            .transfers
            .get(&address)
            .ok_or_else(|| anyhow!("transfer log unavailable for {address}"))?;
        Ok(entries
            .iter()
            .filter(|entry| blocks.contains(&entry.block_number))
            .cloned()
            .collect())
    }
}
