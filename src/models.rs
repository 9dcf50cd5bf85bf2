use alloy_primitives::{Address, B256, Bytes, U64, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Key under which an ERC-20 balance is stored inside a [`TokenBalanceValue::Slots`] container.
/// NFT-style containers key by token id instead.
pub const ERC20_BALANCE_SLOT: U256 = U256::from_limbs([1, 0, 0, 0]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
    pub transactions: Vec<B256>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: B256,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    pub value: U256,
    #[serde(default)]
    pub nonce: U64,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub gas_price: Option<U256>,
    #[serde(default)]
    pub input: Bytes,
}

/// Block timestamp attached to a transaction. `Unknown` renders as `"-"` and
/// means no receipt could be matched to the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTimestamp {
    Known(u64),
    Unknown,
}

impl BlockTimestamp {
    pub const SENTINEL: &'static str = "-";
}

impl fmt::Display for BlockTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTimestamp::Known(ts) => write!(f, "{ts}"),
            BlockTimestamp::Unknown => f.write_str(Self::SENTINEL),
        }
    }
}

impl Serialize for BlockTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Orders timestamps newest first with `Unknown` after every known value.
pub fn newest_first(a: &BlockTimestamp, b: &BlockTimestamp) -> Ordering {
    match (a, b) {
        (BlockTimestamp::Unknown, BlockTimestamp::Unknown) => Ordering::Equal,
        (BlockTimestamp::Unknown, BlockTimestamp::Known(_)) => Ordering::Greater,
        (BlockTimestamp::Known(_), BlockTimestamp::Unknown) => Ordering::Less,
        (BlockTimestamp::Known(a), BlockTimestamp::Known(b)) => b.cmp(a),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockContext {
    pub timestamp: BlockTimestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedTransaction {
    pub txn: TransactionRecord,
    #[serde(rename = "blockData")]
    pub block_data: BlockContext,
}

impl ExtendedTransaction {
    pub fn hash(&self) -> B256 {
        self.txn.hash
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReceipt {
    pub transaction_hash: B256,
    #[serde(default, deserialize_with = "deserialize_optional_quantity")]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub gas_used: Option<U64>,
}

/// One page of an address search. `txs` and `receipts` are not co-indexed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultBatch {
    pub txs: Vec<TransactionRecord>,
    pub receipts: Vec<SearchReceipt>,
    #[serde(default)]
    pub first_page: bool,
    #[serde(default)]
    pub last_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub number: U64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: U64,
    pub miner: Address,
    pub gas_used: U64,
    pub gas_limit: U64,
    #[serde(default)]
    pub base_fee_per_gas: Option<U256>,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub transaction_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockIssuance {
    pub block_reward: U256,
    pub uncle_reward: U256,
    pub issuance: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDetails {
    pub block: BlockSummary,
    #[serde(default)]
    pub issuance: Option<BlockIssuance>,
    pub total_fees: U256,
}

/// Balance container returned per token by a balance lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenBalanceValue {
    Slots(BTreeMap<U256, U256>),
    Error(String),
}

impl TokenBalanceValue {
    pub fn erc20(balance: U256) -> Self {
        TokenBalanceValue::Slots(BTreeMap::from([(ERC20_BALANCE_SLOT, balance)]))
    }

    /// Balance stored under the ERC-20 slot, if this is a slot container holding one.
    pub fn erc20_balance(&self) -> Option<U256> {
        match self {
            TokenBalanceValue::Slots(slots) => slots.get(&ERC20_BALANCE_SLOT).copied(),
            TokenBalanceValue::Error(_) => None,
        }
    }
}

/// Token balances in the order the provider (or caller) listed the tokens.
pub type TokenBalances = Vec<(Address, TokenBalanceValue)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Erc20TokenInfo {
    pub contract: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Erc20TokenInfo {
    const MAX_DECIMALS: u8 = 36;

    /// Accepts metadata only when it describes a usable ERC-20 token.
    pub fn from_metadata(contract: Address, metadata: TokenMetadata) -> Option<Self> {
        let TokenMetadata {
            name,
            symbol,
            decimals,
        } = metadata;
        let symbol = symbol.filter(|s| !s.trim().is_empty())?;
        let decimals = decimals.filter(|d| *d <= Self::MAX_DECIMALS)?;
        Some(Erc20TokenInfo {
            contract,
            name: name?,
            symbol,
            decimals,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBalanceEntry {
    pub token: Address,
    pub balance: Option<U256>,
    pub info: Option<Erc20TokenInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenTransfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Token transfers emitted by one transaction, as returned by a transfer-log lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxTransfers {
    pub hash: B256,
    pub block_number: u64,
    pub token_transfers: Vec<TokenTransfer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Sent,
    Received,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Sent => f.write_str("sent"),
            TransferDirection::Received => f.write_str("received"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetTransferLeg {
    pub address: Address,
    pub direction: TransferDirection,
    pub transfer: TokenTransfer,
}

/// Accepts a quantity either as a JSON number or as a (hex or decimal) string.
fn deserialize_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Number(u64),
        Text(String),
    }

    match Quantity::deserialize(deserializer)? {
        Quantity::Number(n) => Ok(n),
        Quantity::Text(s) => parse_quantity(&s).map_err(serde::de::Error::custom),
    }
}

fn deserialize_optional_quantity<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_quantity")] u64);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(n)| n))
}

pub fn parse_quantity(s: &str) -> Result<u64, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}
