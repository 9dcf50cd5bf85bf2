use crate::provider::ExplorerProvider;
use crate::query::cache::MainPageCache;
use crate::query::formatters::{
    OutputFormat, format_block_details, format_blocks, format_gas, format_net_transfers,
    format_overview, format_token_balances, format_transactions, wei_to_gwei,
};
use crate::scanner::{
    block_details_by_hash, collect_recent_transactions, gas_price_wei, latest_block_number,
    max_priority_fee_wei, scan_blocks_backward,
};
use crate::search::{
    latest_transactions, search_multi_address, transactions_after, transactions_before,
};
use crate::tokens::{load_token_info, positive_token_balances};
use crate::transfers::token_transfers_for_txn;
use alloy_primitives::{Address, B256};
use anyhow::Result;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;
use tracing::info;

pub fn parse_address(address: &str) -> Result<Address> {
    Address::from_str(address).map_err(|_| anyhow::anyhow!("Invalid address format: {}", address))
}

pub fn parse_hash(hash: &str) -> Result<B256> {
    B256::from_str(hash).map_err(|_| anyhow::anyhow!("Invalid hash format: {}", hash))
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

pub async fn cmd_gas<P>(provider: &P, format: &OutputFormat) -> Result<()>
where
    P: ExplorerProvider + ?Sized,
{
    let (gas_price, priority_fee) =
        tokio::try_join!(gas_price_wei(provider), max_priority_fee_wei(provider))?;
    println!("{}", format_gas(gas_price, priority_fee, format));
    Ok(())
}

pub async fn cmd_blocks<P>(
    provider: &P,
    from_block: Option<u64>,
    count: usize,
    format: &OutputFormat,
) -> Result<()>
where
    P: ExplorerProvider + ?Sized,
{
    let start = match from_block {
        Some(block) => block,
        None => latest_block_number(provider).await?,
    };
    let blocks = scan_blocks_backward(provider, start, count).await?;
    println!("{}", format_blocks(&blocks, format));
    Ok(())
}

pub async fn cmd_latest_txns<P>(
    provider: &P,
    blocks: usize,
    limit: usize,
    format: &OutputFormat,
) -> Result<()>
where
    P: ExplorerProvider + ?Sized,
{
    let latest = latest_block_number(provider).await?;
    let blocks = scan_blocks_backward(provider, latest, blocks).await?;
    let txns = collect_recent_transactions(provider, &blocks, limit).await?;
    println!("{}", format_transactions(&txns, format));
    Ok(())
}

#[derive(Default)]
pub struct AddressQuery {
    pub address: String,
    pub before: Option<u64>,
    pub after: Option<u64>,
    pub page_size: usize,
}

pub async fn cmd_address<P>(provider: &P, query: AddressQuery, format: &OutputFormat) -> Result<()>
where
    P: ExplorerProvider + ?Sized,
{
    let address = parse_address(&query.address)?;

    let txns = match (query.before, query.after) {
        (Some(_), Some(_)) => {
            return Err(anyhow::anyhow!(
                "Please specify only one of --before or --after"
            ));
        }
        (None, Some(block)) => transactions_after(provider, address, block, query.page_size).await?,
        (Some(block), None) => {
            transactions_before(provider, address, block, query.page_size).await?
        }
        (None, None) => latest_transactions(provider, address, query.page_size).await?,
    };

    println!("{}", format_transactions(&txns, format));
    Ok(())
}

pub async fn cmd_addresses<P>(
    provider: &P,
    addresses: &[String],
    limit: usize,
    format: &OutputFormat,
) -> Result<()>
where
    P: ExplorerProvider + ?Sized,
{
    let addresses = addresses
        .iter()
        .map(|a| parse_address(a))
        .collect::<Result<Vec<_>>>()?;
    let txns = search_multi_address(provider, &addresses, limit).await?;
    println!("{}", format_transactions(&txns, format));
    Ok(())
}

pub async fn cmd_tokens<P>(
    provider: &P,
    address: &str,
    tokens: &[Address],
    format: &OutputFormat,
) -> Result<()>
where
    P: ExplorerProvider + ?Sized,
{
    let address = parse_address(address)?;
    let balances = positive_token_balances(provider, address, tokens).await?;
    let entries = load_token_info(provider, &balances).await;
    println!("{}", format_token_balances(&entries, format));
    Ok(())
}

pub async fn cmd_transfers<P>(
    provider: &P,
    hash: &str,
    address: &str,
    block: u64,
    format: &OutputFormat,
) -> Result<()>
where
    P: ExplorerProvider + ?Sized,
{
    let hash = parse_hash(hash)?;
    let address = parse_address(address)?;
    let legs = token_transfers_for_txn(provider, hash, address, block).await?;
    println!("{}", format_net_transfers(&legs, format));
    Ok(())
}

pub async fn cmd_block<P>(provider: &P, hash: &str, format: &OutputFormat) -> Result<()>
where
    P: ExplorerProvider + ?Sized,
{
    let hash = parse_hash(hash)?;
    let details = block_details_by_hash(provider, hash).await?;
    println!("{}", format_block_details(&details, format));
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct OverviewQuery {
    pub block_count: usize,
    pub txn_limit: usize,
    pub favorites: Vec<Address>,
    pub interval: Duration,
}

/// Fills `cache` with fresh main-page data unless it is still fresh at `now`.
/// Returns whether anything was fetched.
pub async fn refresh_main_page<P>(
    provider: &P,
    cache: &mut MainPageCache,
    query: &OverviewQuery,
    now: u64,
) -> Result<bool>
where
    P: ExplorerProvider + ?Sized,
{
    if cache.is_fresh(now, query.interval) {
        return Ok(false);
    }

    let (gas_price, priority_fee, latest) = tokio::try_join!(
        gas_price_wei(provider),
        max_priority_fee_wei(provider),
        latest_block_number(provider),
    )?;
    let blocks = scan_blocks_backward(provider, latest, query.block_count).await?;
    let txns = collect_recent_transactions(provider, &blocks, query.txn_limit).await?;
    let favorite_txns = if query.favorites.is_empty() {
        Vec::new()
    } else {
        search_multi_address(provider, &query.favorites, query.txn_limit).await?
    };

    cache.set_gas_price_gwei(wei_to_gwei(gas_price));
    cache.set_max_priority_fee_gwei(wei_to_gwei(priority_fee));
    cache.set_last_blocks(blocks);
    cache.set_last_txns(txns);
    cache.set_favorite_addresses(query.favorites.clone());
    cache.set_favorite_txns(favorite_txns);
    cache.set_last_update_timestamp(now);
    Ok(true)
}

pub async fn cmd_overview<P>(
    provider: &P,
    query: OverviewQuery,
    watch: Option<Duration>,
    format: &OutputFormat,
) -> Result<()>
where
    P: ExplorerProvider + ?Sized,
{
    let mut cache = MainPageCache::new();

    loop {
        let now = unix_now()?;
        if refresh_main_page(provider, &mut cache, &query, now).await? {
            info!("Main page refreshed at {}", now);
        }
        println!("{}", format_overview(&cache, format));

        match watch {
            Some(every) => sleep(every).await,
            None => return Ok(()),
        }
    }
}
