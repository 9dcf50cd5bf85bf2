use crate::models::{
    BlockDetails, BlockInfo, ExtendedTransaction, NetTransferLeg, TokenBalanceEntry,
    TransferDirection,
};
use crate::query::cache::MainPageCache;
use alloy_primitives::U256;
use alloy_primitives::utils::format_units;
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde::Serialize;
use serde_json::json;

const ETHER_DECIMALS: u8 = 18;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

fn finish_csv(wtr: Writer<Vec<u8>>) -> String {
    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

fn format_ether(value: U256) -> String {
    format_units(value, ETHER_DECIMALS).unwrap_or_else(|_| value.to_string())
}

pub fn wei_to_gwei(wei: u128) -> String {
    format_units(U256::from(wei), "gwei").unwrap_or_else(|_| wei.to_string())
}

pub fn format_transactions(txns: &[ExtendedTransaction], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_transactions_table(txns),
        OutputFormat::Json => to_json(txns),
        OutputFormat::Csv => format_transactions_csv(txns),
    }
}

fn format_transactions_table(txns: &[ExtendedTransaction]) -> String {
    if txns.is_empty() {
        return "No transactions found.".to_string();
    }

    let mut table = new_table(vec!["Timestamp", "Block", "Tx Hash", "From", "To", "Value (ETH)"]);
    for ext in txns {
        let txn = &ext.txn;
        table.add_row(vec![
            Cell::new(ext.block_data.timestamp),
            Cell::new(
                txn.block_number
                    .map_or("pending".to_string(), |b| b.to_string()),
            ),
            Cell::new(format_tx_hash(&format!("{:?}", txn.hash))),
            Cell::new(format!("{:#}", txn.from)),
            Cell::new(txn.to.map_or("contract creation".to_string(), |to| format!("{to:#}"))),
            Cell::new(format_ether(txn.value)),
        ]);
    }

    table.to_string()
}

fn format_transactions_csv(txns: &[ExtendedTransaction]) -> String {
    let mut wtr = Writer::from_writer(vec![]);
    let _ = wtr.write_record([
        "timestamp",
        "block_number",
        "transaction_hash",
        "from",
        "to",
        "value_wei",
    ]);

    for ext in txns {
        let txn = &ext.txn;
        let _ = wtr.write_record([
            &ext.block_data.timestamp.to_string(),
            &txn.block_number.map(|b| b.to_string()).unwrap_or_default(),
            &format!("{:?}", txn.hash),
            &format!("{:?}", txn.from),
            &txn.to.map(|to| format!("{to:?}")).unwrap_or_default(),
            &txn.value.to_string(),
        ]);
    }

    finish_csv(wtr)
}

pub fn format_blocks(blocks: &[BlockInfo], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            if blocks.is_empty() {
                return "No blocks found.".to_string();
            }
            let mut table = new_table(vec!["Block", "Timestamp", "Transactions"]);
            for block in blocks {
                table.add_row(vec![
                    Cell::new(block.number),
                    Cell::new(block.timestamp),
                    Cell::new(block.transactions.len()),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => to_json(blocks),
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["block_number", "timestamp", "transaction_count"]);
            for block in blocks {
                let _ = wtr.write_record([
                    block.number.to_string(),
                    block.timestamp.to_string(),
                    block.transactions.len().to_string(),
                ]);
            }
            finish_csv(wtr)
        }
    }
}

/// Balance scaled by the token's decimals, or the raw value when metadata is missing.
fn token_amount(entry: &TokenBalanceEntry) -> String {
    match (entry.balance, &entry.info) {
        (Some(balance), Some(info)) => {
            format_units(balance, info.decimals).unwrap_or_else(|_| balance.to_string())
        }
        (Some(balance), None) => balance.to_string(),
        (None, _) => "-".to_string(),
    }
}

pub fn format_token_balances(entries: &[TokenBalanceEntry], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            if entries.is_empty() {
                return "No token balances found.".to_string();
            }
            let mut table = new_table(vec!["Token", "Symbol", "Name", "Balance", "Balance (Raw)"]);
            for entry in entries {
                let (symbol, name) = entry
                    .info
                    .as_ref()
                    .map_or(("?", "unknown"), |i| (i.symbol.as_str(), i.name.as_str()));
                table.add_row(vec![
                    Cell::new(format!("{:#}", entry.token)),
                    Cell::new(symbol),
                    Cell::new(name),
                    Cell::new(token_amount(entry)),
                    Cell::new(entry.balance.map_or("-".to_string(), |b| b.to_string())),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => to_json(entries),
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["token", "symbol", "decimals", "balance", "balance_raw"]);
            for entry in entries {
                let _ = wtr.write_record([
                    format!("{:?}", entry.token),
                    entry.info.as_ref().map(|i| i.symbol.clone()).unwrap_or_default(),
                    entry
                        .info
                        .as_ref()
                        .map(|i| i.decimals.to_string())
                        .unwrap_or_default(),
                    token_amount(entry),
                    entry.balance.map(|b| b.to_string()).unwrap_or_default(),
                ]);
            }
            finish_csv(wtr)
        }
    }
}

pub fn format_net_transfers(legs: &[NetTransferLeg], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            if legs.is_empty() {
                return "No token transfers found.".to_string();
            }
            let mut table = new_table(vec!["Address", "Direction", "Token", "Counterparty", "Value"]);
            for leg in legs {
                let counterparty = match leg.direction {
                    TransferDirection::Sent => leg.transfer.to,
                    TransferDirection::Received => leg.transfer.from,
                };
                table.add_row(vec![
                    Cell::new(format!("{:#}", leg.address)),
                    Cell::new(leg.direction),
                    Cell::new(format!("{:#}", leg.transfer.token)),
                    Cell::new(format!("{counterparty:#}")),
                    Cell::new(leg.transfer.value.to_string()),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => to_json(legs),
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["address", "direction", "token", "from", "to", "value"]);
            for leg in legs {
                let _ = wtr.write_record([
                    format!("{:?}", leg.address),
                    leg.direction.to_string(),
                    format!("{:?}", leg.transfer.token),
                    format!("{:?}", leg.transfer.from),
                    format!("{:?}", leg.transfer.to),
                    leg.transfer.value.to_string(),
                ]);
            }
            finish_csv(wtr)
        }
    }
}

pub fn format_block_details(details: &BlockDetails, format: &OutputFormat) -> String {
    let block = &details.block;
    let rows = [
        ("Block", block.number.to_string()),
        ("Hash", format!("{:?}", block.hash)),
        ("Parent Hash", format!("{:?}", block.parent_hash)),
        ("Timestamp", block.timestamp.to_string()),
        ("Miner", format!("{:?}", block.miner)),
        ("Transactions", block.transaction_count.to_string()),
        ("Gas Used", block.gas_used.to_string()),
        ("Gas Limit", block.gas_limit.to_string()),
        (
            "Base Fee (Gwei)",
            block
                .base_fee_per_gas
                .map_or("N/A".to_string(), |fee| {
                    format_units(fee, "gwei").unwrap_or_else(|_| fee.to_string())
                }),
        ),
        ("Total Fees (ETH)", format_ether(details.total_fees)),
        (
            "Block Reward (ETH)",
            details
                .issuance
                .as_ref()
                .map_or("N/A".to_string(), |i| format_ether(i.block_reward)),
        ),
    ];

    match format {
        OutputFormat::Table => {
            let mut table = new_table(vec!["Field", "Value"]);
            for (field, value) in rows {
                table.add_row(vec![Cell::new(field), Cell::new(value)]);
            }
            table.to_string()
        }
        OutputFormat::Json => to_json(details),
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["field", "value"]);
            for (field, value) in rows {
                let _ = wtr.write_record([field, value.as_str()]);
            }
            finish_csv(wtr)
        }
    }
}

pub fn format_gas(gas_price_wei: u128, priority_fee_wei: u128, format: &OutputFormat) -> String {
    let gas_price = wei_to_gwei(gas_price_wei);
    let priority_fee = wei_to_gwei(priority_fee_wei);

    match format {
        OutputFormat::Table => {
            let mut table = new_table(vec!["Metric", "Gwei", "Wei"]);
            table.add_row(vec![
                Cell::new("Gas Price"),
                Cell::new(&gas_price),
                Cell::new(gas_price_wei),
            ]);
            table.add_row(vec![
                Cell::new("Max Priority Fee"),
                Cell::new(&priority_fee),
                Cell::new(priority_fee_wei),
            ]);
            table.to_string()
        }
        OutputFormat::Json => json!({
            "gas_price_gwei": gas_price,
            "gas_price_wei": gas_price_wei.to_string(),
            "max_priority_fee_gwei": priority_fee,
            "max_priority_fee_wei": priority_fee_wei.to_string(),
        })
        .to_string(),
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["metric", "gwei", "wei"]);
            let _ = wtr.write_record([
                "gas_price".to_string(),
                gas_price,
                gas_price_wei.to_string(),
            ]);
            let _ = wtr.write_record([
                "max_priority_fee".to_string(),
                priority_fee,
                priority_fee_wei.to_string(),
            ]);
            finish_csv(wtr)
        }
    }
}

pub fn format_overview(cache: &MainPageCache, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "gas_price_gwei": cache.gas_price_gwei(),
            "max_priority_fee_gwei": cache.max_priority_fee_gwei(),
            "last_update": cache.last_update_timestamp(),
            "last_blocks": cache.last_blocks(),
            "last_txns": cache.last_txns(),
            "favorite_addresses": cache.favorite_addresses(),
            "favorite_txns": cache.favorite_txns(),
        }))
        .unwrap_or_else(|_| "{}".to_string()),
        _ => {
            let mut sections = vec![
                format!(
                    "Gas price: {} gwei | Max priority fee: {} gwei | Updated at: {}",
                    cache.gas_price_gwei(),
                    cache.max_priority_fee_gwei(),
                    cache.last_update_timestamp()
                ),
                format_blocks(cache.last_blocks(), format),
                format_transactions(cache.last_txns(), format),
            ];
            if !cache.favorite_addresses().is_empty() {
                sections.push(format_transactions(cache.favorite_txns(), format));
            }
            sections.join("\n\n")
        }
    }
}

fn format_tx_hash(hash: &str) -> String {
    if hash.len() <= 10 {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..6], &hash[hash.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockContext, BlockTimestamp, Erc20TokenInfo};
    use crate::test_utils::{addr, txn};

    #[test]
    fn unknown_timestamp_is_rendered_as_sentinel_in_csv() {
        let txns = vec![ExtendedTransaction {
            txn: txn(1),
            block_data: BlockContext {
                timestamp: BlockTimestamp::Unknown,
            },
        }];
        let csv = format_transactions(&txns, &OutputFormat::Csv);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("-,"));
    }

    #[test]
    fn token_amount_uses_decimals_only_with_metadata() {
        let mut entry = TokenBalanceEntry {
            token: addr(1),
            balance: Some(U256::from(1_500_000u64)),
            info: None,
        };
        assert_eq!(token_amount(&entry), "1500000");

        entry.info = Some(Erc20TokenInfo {
            contract: addr(1),
            name: "USD Coin".into(),
            symbol: "USDC".into(),
            decimals: 6,
        });
        assert_eq!(token_amount(&entry), "1.500000");

        entry.balance = None;
        assert_eq!(token_amount(&entry), "-");
    }

    #[test]
    fn gas_is_reported_in_gwei() {
        assert_eq!(wei_to_gwei(1_500_000_000), "1.500000000");
        let json = format_gas(2_000_000_000, 1, &OutputFormat::Json);
        assert!(json.contains("\"gas_price_gwei\":\"2.000000000\""));
    }

    #[test]
    fn output_format_defaults_to_table() {
        assert!(matches!(OutputFormat::from("JSON"), OutputFormat::Json));
        assert!(matches!(OutputFormat::from("csv"), OutputFormat::Csv));
        assert!(matches!(OutputFormat::from("anything"), OutputFormat::Table));
    }
}
