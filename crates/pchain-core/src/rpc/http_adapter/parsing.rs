use crate::error::{CoreError, RpcError};
use crate::ids::{decode_hex_checksummed, Id};
use crate::rpc::types::{Container, TxFees, UtxoCursor, UtxoPage};

fn invalid(message: String) -> CoreError {
    CoreError::Rpc(RpcError::InvalidResponse(message))
}

/// Avalanche renders 64-bit integers as JSON strings; plain numbers are
/// accepted too.
pub(super) fn parse_u64(value: Option<&serde_json::Value>, field: &str) -> Result<u64, CoreError> {
    match value {
        Some(serde_json::Value::String(s)) => s
            .parse()
            .map_err(|e| invalid(format!("{field} is not an integer: {e}"))),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| invalid(format!("{field} out of range: {n}"))),
        Some(other) => Err(invalid(format!("{field} has unexpected type: {other}"))),
        None => Err(invalid(format!("missing {field}"))),
    }
}

pub(super) fn parse_str<'a>(
    value: Option<&'a serde_json::Value>,
    field: &str,
) -> Result<&'a str, CoreError> {
    value
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| invalid(format!("missing {field}")))
}

pub(super) fn parse_id(value: Option<&serde_json::Value>, field: &str) -> Result<Id, CoreError> {
    parse_str(value, field)?
        .parse()
        .map_err(|e| invalid(format!("invalid {field}: {e}")))
}

pub(super) fn parse_hex_payload(
    value: Option<&serde_json::Value>,
    field: &str,
) -> Result<Vec<u8>, CoreError> {
    decode_hex_checksummed(parse_str(value, field)?)
        .map_err(|e| invalid(format!("invalid {field}: {e}")))
}

pub(super) fn parse_container(raw: &serde_json::Value) -> Result<Container, CoreError> {
    Ok(Container {
        id: parse_id(raw.get("id"), "container id")?,
        bytes: parse_hex_payload(raw.get("bytes"), "container bytes")?,
        index: parse_u64(raw.get("index"), "container index")?,
    })
}

pub(super) fn parse_utxo_page(raw: &serde_json::Value) -> Result<UtxoPage, CoreError> {
    let utxos = raw
        .get("utxos")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| invalid("missing utxos array".to_owned()))?
        .iter()
        .map(|utxo| parse_hex_payload(Some(utxo), "utxo"))
        .collect::<Result<Vec<_>, _>>()?;

    let end_index = match raw.get("endIndex") {
        Some(end) => UtxoCursor {
            address: parse_str(end.get("address"), "endIndex.address")?.to_owned(),
            utxo: parse_str(end.get("utxo"), "endIndex.utxo")?.to_owned(),
        },
        None => UtxoCursor::default(),
    };

    let num_fetched = parse_u64(raw.get("numFetched"), "numFetched")?;
    Ok(UtxoPage {
        utxos,
        end_index,
        num_fetched: u32::try_from(num_fetched)
            .map_err(|_| invalid(format!("numFetched out of range: {num_fetched}")))?,
    })
}

pub(super) fn parse_tx_fees(raw: &serde_json::Value) -> Result<TxFees, CoreError> {
    // Newer nodes drop the staking fees; they default to zero.
    let optional = |field: &str| match raw.get(field) {
        None | Some(serde_json::Value::Null) => Ok(0),
        value => parse_u64(value, field),
    };
    Ok(TxFees {
        tx_fee: parse_u64(raw.get("txFee"), "txFee")?,
        create_subnet_tx_fee: optional("createSubnetTxFee")?,
        create_blockchain_tx_fee: optional("createBlockchainTxFee")?,
        add_primary_network_validator_fee: optional("addPrimaryNetworkValidatorFee")?,
        add_primary_network_delegator_fee: optional("addPrimaryNetworkDelegatorFee")?,
    })
}
