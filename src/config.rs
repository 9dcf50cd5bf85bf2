use alloy_primitives::{Address, address};
use anyhow::{Context, Result};
use regex::Regex;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_INTERVAL_MINUTES: u64 = 5;

/// Well-known mainnet ERC-20 tokens checked for balances when `TOKEN_ADDRESSES` is unset.
pub const DEFAULT_TOKENS: [Address; 7] = [
    address!("0xdAC17F958D2ee523a2206206994597C13D831ec7"), // USDT
    address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), // USDC
    address!("0x6B175474E89094C44Da98b954EedeAC495271d0F"), // DAI
    address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"), // WETH
    address!("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"), // WBTC
    address!("0x514910771AF9Ca656af840dff83E8264EcF986CA"), // LINK
    address!("0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"), // UNI
];

#[derive(Debug, Clone)]
pub struct Config {
    pub json_rpc_urls: Vec<String>,
    pub request_timeout: Duration,
    pub token_addresses: Vec<Address>,
    pub ipfs_gateway_url: String,
    pub cache_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let json_rpc_urls = std::env::var("JSON_RPC_URLS")
            .or_else(|_| std::env::var("JSON_RPC_URL"))
            .map(|urls| parse_rpc_urls(&urls))
            .context("JSON_RPC_URLS (or JSON_RPC_URL) must be set in .env")?;
        if json_rpc_urls.is_empty() {
            anyhow::bail!("JSON_RPC_URLS contains no URL");
        }

        let request_timeout = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.parse()
                    .context("Invalid REQUEST_TIMEOUT_SECS, expected whole seconds")?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let token_addresses = match std::env::var("TOKEN_ADDRESSES") {
            Ok(list) => parse_token_addresses(&list)?,
            Err(_) => DEFAULT_TOKENS.to_vec(),
        };

        let ipfs_gateway_url = std::env::var("IPFS_GATEWAY_URL")
            .map(|url| normalize_ipfs_gateway_url(&url))
            .unwrap_or_default();

        let cache_interval = match std::env::var("CACHE_INTERVAL_MINUTES") {
            Ok(minutes) => Duration::from_secs(
                60 * minutes
                    .parse::<u64>()
                    .context("Invalid CACHE_INTERVAL_MINUTES")?,
            ),
            Err(_) => Duration::from_secs(60 * DEFAULT_CACHE_INTERVAL_MINUTES),
        };

        Ok(Config {
            json_rpc_urls,
            request_timeout,
            token_addresses,
            ipfs_gateway_url,
            cache_interval,
        })
    }
}

pub fn parse_rpc_urls(urls: &str) -> Vec<String> {
    urls.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_token_addresses(list: &str) -> Result<Vec<Address>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Address::from_str(s).with_context(|| format!("Invalid token address: {s}")))
        .collect()
}

fn url_scheme(url: &str) -> Option<String> {
    let re = Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").ok()?;
    let captures = re.captures(url)?;
    Some(captures.get(1)?.as_str().to_lowercase())
}

fn add_protocol(url: &str) -> String {
    if url.starts_with("127.0.0.1") || url.starts_with("localhost") {
        format!("http://{url}")
    } else {
        format!("https://{url}")
    }
}

/// Normalizes a content-gateway URL to `<scheme>://<host>[/path]/ipfs/`.
///
/// Returns an empty string for blank input or a non-http(s) scheme. A missing
/// scheme becomes `http://` for local hosts and `https://` otherwise.
pub fn normalize_ipfs_gateway_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }

    let mut normalized = match url_scheme(url).as_deref() {
        Some("http") | Some("https") => url.to_string(),
        None | Some("localhost") => add_protocol(url),
        Some(_) => return String::new(),
    };

    normalized.truncate(normalized.trim_end_matches('/').len());
    if !normalized.ends_with("/ipfs") {
        normalized.push_str("/ipfs");
    }
    normalized.push('/');
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_urls_are_normalized() {
        assert_eq!(
            normalize_ipfs_gateway_url("https://ipfs.io"),
            "https://ipfs.io/ipfs/"
        );
        assert_eq!(
            normalize_ipfs_gateway_url("  dweb.link/ipfs//  "),
            "https://dweb.link/ipfs/"
        );
        assert_eq!(
            normalize_ipfs_gateway_url("localhost:8080"),
            "http://localhost:8080/ipfs/"
        );
        assert_eq!(
            normalize_ipfs_gateway_url("127.0.0.1:8080/"),
            "http://127.0.0.1:8080/ipfs/"
        );
        assert_eq!(
            normalize_ipfs_gateway_url("http://gw.example/custom/ipfs"),
            "http://gw.example/custom/ipfs/"
        );
    }

    #[test]
    fn unusable_gateway_urls_are_rejected() {
        assert_eq!(normalize_ipfs_gateway_url(""), "");
        assert_eq!(normalize_ipfs_gateway_url("   "), "");
        assert_eq!(normalize_ipfs_gateway_url("ftp://files.example"), "");
    }

    #[test]
    fn rpc_url_list_is_split_and_trimmed() {
        assert_eq!(
            parse_rpc_urls("http://a:8545, ,https://b "),
            vec!["http://a:8545".to_string(), "https://b".to_string()]
        );
    }

    #[test]
    fn token_list_rejects_bad_addresses() {
        let tokens =
            parse_token_addresses("0x6B175474E89094C44Da98b954EedeAC495271d0F,").unwrap();
        assert_eq!(tokens, vec![DEFAULT_TOKENS[2]]);
        assert!(parse_token_addresses("0x1234").is_err());
    }
}
