use crate::events::{
    Transfer, balanceOfCall, decimalsCall, decode_transfer_event, is_transfer_log, nameCall,
    symbolCall,
};
use crate::fanout::all_or_nothing;
use crate::models::{
    BlockDetails, BlockInfo, SearchResultBatch, TokenBalanceValue, TokenBalances, TokenMetadata,
    TokenTransfer, TransactionRecord, TxTransfers,
};
use crate::provider::ExplorerProvider;
use alloy::network::TransactionBuilder;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log, TransactionRequest};
use alloy::sol_types::{SolCall, SolEvent};
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::fmt::Display;
use std::future::IntoFuture;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// JSON-RPC client over one or more endpoints.
///
/// Every request is bounded by `request_timeout`. A failed or timed-out request
/// is reported to the caller as is and moves later requests to the next
/// endpoint; nothing is retried.
#[derive(Clone)]
pub struct RpcClient {
    providers: Vec<DynProvider>,
    urls: Vec<String>,
    current_provider: Arc<AtomicUsize>,
    request_timeout: Duration,
}

impl RpcClient {
    pub fn new(rpc_urls: &[String], request_timeout: Duration) -> Result<Self> {
        if rpc_urls.is_empty() {
            return Err(anyhow!("At least one RPC URL must be provided"));
        }

        let mut providers = Vec::new();
        for url in rpc_urls {
            let parsed_url = url
                .parse()
                .map_err(|_| anyhow!("Invalid RPC URL: {}", url))?;
            providers.push(ProviderBuilder::new().connect_http(parsed_url).erased());
        }

        Ok(RpcClient {
            providers,
            urls: rpc_urls.to_vec(),
            current_provider: Arc::new(AtomicUsize::new(0)),
            request_timeout,
        })
    }

    fn get_provider(&self) -> &DynProvider {
        let index = self.current_provider.load(Ordering::Relaxed) % self.providers.len();
        &self.providers[index]
    }

    pub fn get_current_url(&self) -> &str {
        let index = self.current_provider.load(Ordering::Relaxed) % self.urls.len();
        &self.urls[index]
    }

    fn rotate_provider(&self) {
        if self.providers.len() < 2 {
            return;
        }
        let next = (self.current_provider.fetch_add(1, Ordering::Relaxed) + 1) % self.providers.len();
        debug!("Rotating to RPC provider #{}", next);
    }

    async fn request<F, T, E>(&self, method: &str, call: F) -> Result<T>
    where
        F: IntoFuture<Output = std::result::Result<T, E>>,
        E: Display,
    {
        match timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("{} failed on {}: {}", method, self.get_current_url(), e);
                self.rotate_provider();
                Err(anyhow!("{} failed: {}", method, e))
            }
            Err(_) => {
                warn!(
                    "{} timed out after {} seconds on {}",
                    method,
                    self.request_timeout.as_secs(),
                    self.get_current_url()
                );
                self.rotate_provider();
                Err(anyhow!(
                    "{} timed out after {} seconds",
                    method,
                    self.request_timeout.as_secs()
                ))
            }
        }
    }

    pub async fn call_contract<C: SolCall>(&self, address: Address, call: C) -> Result<C::Return> {
        let request = TransactionRequest::default()
            .with_to(address)
            .with_input(call.abi_encode());
        let raw = self
            .request("eth_call", self.get_provider().call(request))
            .await?;
        C::abi_decode_returns(&raw)
            .with_context(|| format!("Failed to decode {} result from {}", C::SIGNATURE, address))
    }

    async fn transfer_logs(&self, filter: Filter) -> Result<Vec<Log>> {
        self.request("eth_getLogs", self.get_provider().get_logs(&filter))
            .await
    }

    async fn receipt_transfers(&self, hash: B256) -> Result<TxTransfers> {
        let receipt = self
            .request(
                "eth_getTransactionReceipt",
                self.get_provider().get_transaction_receipt(hash),
            )
            .await?
            .ok_or_else(|| anyhow!("Receipt for {} not found", hash))?;

        let token_transfers = receipt
            .inner
            .logs()
            .iter()
            .filter(|log| is_transfer_log(log))
            .filter_map(|log| {
                let event = decode_transfer_event(log).ok()?;
                Some(TokenTransfer {
                    token: log.address(),
                    from: event.from,
                    to: event.to,
                    value: event.value,
                })
            })
            .collect();

        Ok(TxTransfers {
            hash,
            block_number: receipt.block_number.unwrap_or_default(),
            token_transfers,
        })
    }
}

#[async_trait]
impl ExplorerProvider for RpcClient {
    async fn block_number(&self) -> Result<u64> {
        self.request("eth_blockNumber", self.get_provider().get_block_number())
            .await
    }

    async fn block_details_by_hash(&self, hash: B256) -> Result<BlockDetails> {
        self.request(
            "ots_getBlockDetailsByHash",
            self.get_provider()
                .raw_request::<_, BlockDetails>("ots_getBlockDetailsByHash".into(), (hash,)),
        )
        .await
    }

    async fn search_transactions_before(
        &self,
        address: Address,
        block_number: u64,
        page_size: usize,
    ) -> Result<SearchResultBatch> {
        self.request(
            "ots_searchTransactionsBefore",
            self.get_provider().raw_request::<_, SearchResultBatch>(
                "ots_searchTransactionsBefore".into(),
                (address, block_number, page_size),
            ),
        )
        .await
    }

    async fn search_transactions_after(
        &self,
        address: Address,
        block_number: u64,
        page_size: usize,
    ) -> Result<SearchResultBatch> {
        self.request(
            "ots_searchTransactionsAfter",
            self.get_provider().raw_request::<_, SearchResultBatch>(
                "ots_searchTransactionsAfter".into(),
                (address, block_number, page_size),
            ),
        )
        .await
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<TransactionRecord> {
        self.request(
            "eth_getTransactionByHash",
            self.get_provider().raw_request::<_, Option<TransactionRecord>>(
                "eth_getTransactionByHash".into(),
                (hash,),
            ),
        )
        .await?
        .ok_or_else(|| anyhow!("Transaction {} not found", hash))
    }

    async fn block_info(&self, block_number: u64) -> Result<BlockInfo> {
        let block = self
            .request(
                "eth_getBlockByNumber",
                self.get_provider()
                    .get_block_by_number(BlockNumberOrTag::Number(block_number)),
            )
            .await?
            .ok_or_else(|| anyhow!("Block {} not found", block_number))?;

        Ok(BlockInfo {
            number: block.header.number,
            timestamp: block.header.timestamp,
            transactions: block.transactions.hashes().collect(),
        })
    }

    async fn gas_price(&self) -> Result<u128> {
        self.request("eth_gasPrice", self.get_provider().get_gas_price())
            .await
    }

    async fn max_priority_fee(&self) -> Result<u128> {
        self.request(
            "eth_maxPriorityFeePerGas",
            self.get_provider().get_max_priority_fee_per_gas(),
        )
        .await
    }

    async fn token_balances(&self, address: Address, tokens: &[Address]) -> Result<TokenBalances> {
        let balances = join_all(tokens.iter().map(|token| async move {
            let value = match self.call_contract(*token, balanceOfCall { owner: address }).await {
                Ok(balance) => TokenBalanceValue::erc20(balance),
                Err(e) => TokenBalanceValue::Error(format!("{e:#}")),
            };
            (*token, value)
        }))
        .await;
        Ok(balances)
    }

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata> {
        let (name, symbol, decimals) = tokio::join!(
            self.call_contract(token, nameCall {}),
            self.call_contract(token, symbolCall {}),
            self.call_contract(token, decimalsCall {}),
        );

        let metadata = TokenMetadata {
            name: name
                .inspect_err(|e| debug!("Failed to fetch name of {}: {:#}", token, e))
                .ok(),
            symbol: symbol
                .inspect_err(|e| debug!("Failed to fetch symbol of {}: {:#}", token, e))
                .ok(),
            decimals: decimals
                .inspect_err(|e| debug!("Failed to fetch decimals of {}: {:#}", token, e))
                .ok(),
        };

        if metadata == TokenMetadata::default() {
            anyhow::bail!("Token {:?} exposes no ERC-20 metadata", token);
        }
        Ok(metadata)
    }

    async fn transfer_log(
        &self,
        address: Address,
        blocks: RangeInclusive<u64>,
    ) -> Result<Vec<TxTransfers>> {
        let base = Filter::new()
            .event_signature(Transfer::SIGNATURE_HASH)
            .from_block(*blocks.start())
            .to_block(*blocks.end());

        let (sent, received) = tokio::try_join!(
            self.transfer_logs(base.clone().topic1(address.into_word())),
            self.transfer_logs(base.topic2(address.into_word())),
        )?;

        let mut logs: Vec<Log> = sent.into_iter().chain(received).collect();
        logs.sort_by_key(|log| (log.block_number, log.log_index));

        let mut seen = HashSet::new();
        let hashes: Vec<B256> = logs
            .iter()
            .filter_map(|log| log.transaction_hash)
            .filter(|hash| seen.insert(*hash))
            .collect();
        debug!(
            "{} transactions with transfers for {} in blocks {:?}",
            hashes.len(),
            address,
            blocks
        );

        all_or_nothing(hashes.into_iter().map(|hash| self.receipt_transfers(hash))).await
    }
}
