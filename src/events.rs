use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);

    function name() external view returns (string);
    function symbol() external view returns (string);
    function decimals() external view returns (uint8);
    function balanceOf(address owner) external view returns (uint256);
}

/// Decodes an ERC-20 `Transfer` log. ERC-721 transfers share the signature but
/// index the token id, so they fail to decode here.
pub fn decode_transfer_event(log: &Log) -> anyhow::Result<Transfer> {
    let log_data = log.data();
    let decoded = Transfer::decode_raw_log(log.topics(), &log_data.data)?;
    Ok(decoded)
}

pub fn is_transfer_log(log: &Log) -> bool {
    log.topic0() == Some(&Transfer::SIGNATURE_HASH)
}
