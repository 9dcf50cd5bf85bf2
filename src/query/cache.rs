use crate::models::{BlockInfo, ExtendedTransaction};
use alloy_primitives::Address;
use std::time::Duration;

/// Last fetched main-page data, reused while it is fresh.
///
/// A plain value store: setters replace, getters read, nothing is merged.
#[derive(Debug, Clone, Default)]
pub struct MainPageCache {
    gas_price_gwei: String,
    max_priority_fee_gwei: String,
    favorite_addresses: Vec<Address>,
    favorite_txns: Vec<ExtendedTransaction>,
    last_blocks: Vec<BlockInfo>,
    last_txns: Vec<ExtendedTransaction>,
    last_update_timestamp: u64,
}

impl MainPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // favorites may legitimately be empty, so they are not checked
    pub fn has_data(&self) -> bool {
        !self.gas_price_gwei.is_empty()
            && !self.max_priority_fee_gwei.is_empty()
            && !self.last_blocks.is_empty()
            && !self.last_txns.is_empty()
            && self.last_update_timestamp != 0
    }

    /// True when the cache holds data updated less than `interval` before `now` (unix seconds).
    pub fn is_fresh(&self, now: u64, interval: Duration) -> bool {
        self.has_data() && now.saturating_sub(self.last_update_timestamp) < interval.as_secs()
    }

    pub fn set_gas_price_gwei(&mut self, gas_price_gwei: String) {
        self.gas_price_gwei = gas_price_gwei;
    }

    pub fn gas_price_gwei(&self) -> &str {
        &self.gas_price_gwei
    }

    pub fn set_max_priority_fee_gwei(&mut self, max_priority_fee_gwei: String) {
        self.max_priority_fee_gwei = max_priority_fee_gwei;
    }

    pub fn max_priority_fee_gwei(&self) -> &str {
        &self.max_priority_fee_gwei
    }

    pub fn set_favorite_addresses(&mut self, favorite_addresses: Vec<Address>) {
        self.favorite_addresses = favorite_addresses;
    }

    pub fn favorite_addresses(&self) -> &[Address] {
        &self.favorite_addresses
    }

    pub fn set_favorite_txns(&mut self, favorite_txns: Vec<ExtendedTransaction>) {
        self.favorite_txns = favorite_txns;
    }

    pub fn favorite_txns(&self) -> &[ExtendedTransaction] {
        &self.favorite_txns
    }

    pub fn set_last_blocks(&mut self, last_blocks: Vec<BlockInfo>) {
        self.last_blocks = last_blocks;
    }

    pub fn last_blocks(&self) -> &[BlockInfo] {
        &self.last_blocks
    }

    pub fn set_last_txns(&mut self, last_txns: Vec<ExtendedTransaction>) {
        self.last_txns = last_txns;
    }

    pub fn last_txns(&self) -> &[ExtendedTransaction] {
        &self.last_txns
    }

    pub fn set_last_update_timestamp(&mut self, timestamp: u64) {
        self.last_update_timestamp = timestamp;
    }

    pub fn last_update_timestamp(&self) -> u64 {
        self.last_update_timestamp
    }
}
