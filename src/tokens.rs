use crate::fanout::best_effort;
use crate::models::{Erc20TokenInfo, TokenBalanceEntry, TokenBalances};
use crate::provider::ExplorerProvider;
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

/// Keeps only tokens whose ERC-20 slot holds a balance greater than zero.
/// Error markers and containers without the ERC-20 slot are dropped.
pub fn select_positive_balances(balances: TokenBalances) -> TokenBalances {
    balances
        .into_iter()
        .filter(|(_, value)| value.erc20_balance().is_some_and(|b| b > U256::ZERO))
        .collect()
}

/// Balances of `tokens` held by `address`, restricted to positive ones.
pub async fn positive_token_balances<P>(
    provider: &P,
    address: Address,
    tokens: &[Address],
) -> Result<TokenBalances>
where
    P: ExplorerProvider + ?Sized,
{
    let balances = provider
        .token_balances(address, tokens)
        .await
        .with_context(|| format!("Failed to fetch token balances for {address}"))?;
    let positive = select_positive_balances(balances);
    debug!(
        "{} of {} tokens held by {}",
        positive.len(),
        tokens.len(),
        address
    );
    Ok(positive)
}

/// Pairs each balance with its token's ERC-20 metadata, keeping input order.
///
/// Balance and metadata are independent: a malformed balance becomes `None`
/// without skipping the metadata fetch, and a failed metadata fetch only
/// clears that token's `info`.
pub async fn load_token_info<P>(provider: &P, balances: &TokenBalances) -> Vec<TokenBalanceEntry>
where
    P: ExplorerProvider + ?Sized,
{
    let infos = best_effort(
        "token info",
        balances.iter().map(|(token, _)| {
            (token, async move {
                let metadata = provider.token_metadata(*token).await?;
                Erc20TokenInfo::from_metadata(*token, metadata)
                    .ok_or_else(|| anyhow!("not an ERC-20 token"))
            })
        }),
    )
    .await;

    balances
        .iter()
        .zip(infos)
        .map(|((token, value), info)| {
            let balance = value.erc20_balance();
            if balance.is_none() {
                warn!("Error fetching token balance for token {}: {:?}", token, value);
            }
            TokenBalanceEntry {
                token: *token,
                balance,
                info,
            }
        })
        .collect()
}
