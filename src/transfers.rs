use crate::models::{NetTransferLeg, TransferDirection, TxTransfers};
use crate::provider::ExplorerProvider;
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use tracing::debug;

/// Splits the token transfers of transaction `txn_hash` into per-address legs.
///
/// Every address that is a source or destination of a transfer gets one
/// `Sent` leg per transfer it sent, followed by one `Received` leg per transfer
/// it received. The queried `address` is listed first when it took part.
pub fn compute_net_transfers(
    all_transfers: &[TxTransfers],
    txn_hash: B256,
    address: Address,
) -> Vec<NetTransferLeg> {
    let Some(entry) = all_transfers.iter().find(|t| t.hash == txn_hash) else {
        return Vec::new();
    };
    let transfers = &entry.token_transfers;
    if transfers.is_empty() {
        return Vec::new();
    }

    let mut addresses: Vec<Address> = Vec::new();
    if transfers.iter().any(|t| t.from == address || t.to == address) {
        addresses.push(address);
    }
    for transfer in transfers {
        for endpoint in [transfer.from, transfer.to] {
            if !addresses.contains(&endpoint) {
                addresses.push(endpoint);
            }
        }
    }

    let mut legs = Vec::new();
    for addr in addresses {
        legs.extend(
            transfers
                .iter()
                .filter(|t| t.from == addr)
                .map(|t| NetTransferLeg {
                    address: addr,
                    direction: TransferDirection::Sent,
                    transfer: t.clone(),
                }),
        );
        legs.extend(
            transfers
                .iter()
                .filter(|t| t.to == addr)
                .map(|t| NetTransferLeg {
                    address: addr,
                    direction: TransferDirection::Received,
                    transfer: t.clone(),
                }),
        );
    }
    legs
}

/// Net token transfers of one transaction, seen from `address`.
pub async fn token_transfers_for_txn<P>(
    provider: &P,
    txn_hash: B256,
    address: Address,
    block: u64,
) -> Result<Vec<NetTransferLeg>>
where
    P: ExplorerProvider + ?Sized,
{
    let log = provider
        .transfer_log(address, block..=block)
        .await
        .with_context(|| format!("Failed to fetch transfers for {address} in block {block}"))?;
    let legs = compute_net_transfers(&log, txn_hash, address);
    debug!("{} transfer legs in transaction {}", legs.len(), txn_hash);
    Ok(legs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenTransfer;
    use crate::test_utils::{MockProvider, addr, hash};
    use alloy_primitives::U256;

    fn transfer(from: Address, to: Address, value: u64) -> TokenTransfer {
        TokenTransfer {
            token: addr(0xee),
            from,
            to,
            value: U256::from(value),
        }
    }

    fn leg(address: Address, direction: TransferDirection, t: &TokenTransfer) -> NetTransferLeg {
        NetTransferLeg {
            address,
            direction,
            transfer: t.clone(),
        }
    }

    #[test]
    fn chained_transfers_produce_one_leg_per_endpoint() {
        let (x, y, z) = (addr(1), addr(2), addr(3));
        let xy = transfer(x, y, 10);
        let yz = transfer(y, z, 10);
        let log = vec![TxTransfers {
            hash: hash(1),
            block_number: 5,
            token_transfers: vec![xy.clone(), yz.clone()],
        }];

        let legs = compute_net_transfers(&log, hash(1), x);

        assert_eq!(
            legs,
            vec![
                leg(x, TransferDirection::Sent, &xy),
                leg(y, TransferDirection::Sent, &yz),
                leg(y, TransferDirection::Received, &xy),
                leg(z, TransferDirection::Received, &yz),
            ]
        );
        assert_eq!(legs.iter().filter(|l| l.address == y).count(), 2);
    }

    #[test]
    fn queried_address_comes_first_without_duplicates() {
        let (a, b, me) = (addr(1), addr(2), addr(9));
        let to_me = transfer(a, me, 1);
        let from_me = transfer(me, b, 1);
        let log = vec![TxTransfers {
            hash: hash(4),
            block_number: 1,
            token_transfers: vec![to_me.clone(), from_me.clone()],
        }];

        let legs = compute_net_transfers(&log, hash(4), me);
        let order: Vec<Address> = legs.iter().map(|l| l.address).collect();
        assert_eq!(order, vec![me, me, a, b]);
        assert_eq!(legs[0], leg(me, TransferDirection::Sent, &from_me));
        assert_eq!(legs[1], leg(me, TransferDirection::Received, &to_me));
    }

    #[test]
    fn other_transactions_and_empty_lists_yield_nothing() {
        let log = vec![
            TxTransfers {
                hash: hash(1),
                block_number: 1,
                token_transfers: vec![transfer(addr(1), addr(2), 3)],
            },
            TxTransfers {
                hash: hash(2),
                block_number: 1,
                token_transfers: vec![],
            },
        ];
        assert!(compute_net_transfers(&log, hash(3), addr(1)).is_empty());
        assert!(compute_net_transfers(&log, hash(2), addr(1)).is_empty());
        assert!(compute_net_transfers(&[], hash(1), addr(1)).is_empty());
    }

    #[tokio::test]
    async fn transfers_are_looked_up_for_the_single_block() {
        let me = addr(5);
        let mut provider = MockProvider::default();
        provider.transfers.insert(
            me,
            vec![
                TxTransfers {
                    hash: hash(1),
                    block_number: 41,
                    token_transfers: vec![transfer(me, addr(6), 1)],
                },
                TxTransfers {
                    hash: hash(1),
                    block_number: 42,
                    token_transfers: vec![transfer(addr(6), me, 2)],
                },
            ],
        );

        let legs = token_transfers_for_txn(&provider, hash(1), me, 42)
            .await
            .unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].direction, TransferDirection::Received);
        assert_eq!(legs[0].transfer.value, U256::from(2));
        assert!(provider.calls().contains(&format!("transfers {me} 42..=42")));
    }
}
