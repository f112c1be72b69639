//! Identifier newtypes and their textual encodings.
//!
//! Avalanche renders 32-byte ids as cb58 (base58 over the bytes followed by a
//! 4-byte sha256 checksum), 20-byte node ids as `NodeID-<cb58>`, and owner
//! addresses as `<chain alias>-<bech32>`. Raw payloads exchanged with the
//! node use `0x`-prefixed hex with the same 4-byte checksum appended.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use bitcoin::hashes::{hash160, sha256, Hash};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

pub const ID_LEN: usize = 32;
pub const SHORT_ID_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;
const NODE_ID_PREFIX: &str = "NodeID-";

// ==============================================================================
// Hashing
// ==============================================================================

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(bytes).to_byte_array()
}

/// ripemd160(sha256(bytes)), the digest behind addresses and node ids.
pub fn hash160(bytes: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(bytes).to_byte_array()
}

fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = sha256(bytes);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[ID_LEN - CHECKSUM_LEN..]);
    out
}

fn split_checksum(raw: &[u8], context: &str) -> Result<Vec<u8>, CoreError> {
    if raw.len() < CHECKSUM_LEN {
        return Err(CoreError::InvalidId(format!(
            "{context}: payload shorter than checksum"
        )));
    }
    let (payload, sum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if checksum(payload) != sum {
        return Err(CoreError::InvalidId(format!("{context}: checksum mismatch")));
    }
    Ok(payload.to_vec())
}

// ==============================================================================
// Checksummed Encodings
// ==============================================================================

pub fn encode_cb58(bytes: &[u8]) -> String {
    let mut buf = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    buf.extend_from_slice(bytes);
    buf.extend_from_slice(&checksum(bytes));
    bs58::encode(buf).into_string()
}

pub fn decode_cb58(s: &str) -> Result<Vec<u8>, CoreError> {
    let raw = bs58::decode(s)
        .into_vec()
        .map_err(|e| CoreError::InvalidId(format!("invalid base58 `{s}`: {e}")))?;
    split_checksum(&raw, s)
}

/// `0x` + hex(bytes ‖ checksum), the node's "hex" payload encoding.
pub fn encode_hex_checksummed(bytes: &[u8]) -> String {
    let mut buf = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    buf.extend_from_slice(bytes);
    buf.extend_from_slice(&checksum(bytes));
    format!("0x{}", hex::encode(buf))
}

pub fn decode_hex_checksummed(s: &str) -> Result<Vec<u8>, CoreError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let raw = hex::decode(stripped)
        .map_err(|e| CoreError::InvalidId(format!("invalid hex payload: {e}")))?;
    split_checksum(&raw, "hex payload")
}

// ==============================================================================
// Id
// ==============================================================================

/// 32-byte identifier of blocks, transactions, chains and assets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Id([u8; ID_LEN]);

impl Id {
    pub const EMPTY: Id = Id([0u8; ID_LEN]);

    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Content address: sha256 of the given bytes.
    pub fn from_content(bytes: &[u8]) -> Self {
        Self(sha256(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; ID_LEN]
    }
}

impl TryFrom<&[u8]> for Id {
    type Error = CoreError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; ID_LEN] = bytes.try_into().map_err(|_| {
            CoreError::InvalidId(format!("expected {ID_LEN} bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }
}

impl FromStr for Id {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(decode_cb58(s)?.as_slice())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_cb58(&self.0))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({self})")
    }
}

// ==============================================================================
// ShortId
// ==============================================================================

/// 20-byte address payload, hash160 of a compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ShortId([u8; SHORT_ID_LEN]);

impl ShortId {
    pub const fn new(bytes: [u8; SHORT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_public_key(compressed: &[u8]) -> Self {
        Self(hash160(compressed))
    }

    pub fn as_bytes(&self) -> &[u8; SHORT_ID_LEN] {
        &self.0
    }

    /// Format as `<alias>-<bech32(hrp, bytes)>`.
    pub fn to_address(&self, chain_alias: &str, hrp: &str) -> Result<String, CoreError> {
        let hrp = Hrp::parse(hrp)
            .map_err(|e| CoreError::InvalidId(format!("invalid address hrp `{hrp}`: {e}")))?;
        let encoded = bech32::encode::<Bech32>(hrp, &self.0)
            .map_err(|e| CoreError::InvalidId(format!("bech32 encoding failed: {e}")))?;
        Ok(format!("{chain_alias}-{encoded}"))
    }

    /// Parse `<alias>-<bech32>` into its parts.
    pub fn from_address(address: &str) -> Result<ParsedAddress, CoreError> {
        let (alias, encoded) = address
            .split_once('-')
            .ok_or_else(|| CoreError::InvalidId(format!("address `{address}` has no chain alias")))?;
        let (hrp, data) = bech32::decode(encoded)
            .map_err(|e| CoreError::InvalidId(format!("invalid bech32 address `{address}`: {e}")))?;
        Ok(ParsedAddress {
            chain_alias: alias.to_owned(),
            hrp: hrp.to_string(),
            short_id: Self::try_from(data.as_slice())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub chain_alias: String,
    pub hrp: String,
    pub short_id: ShortId,
}

impl TryFrom<&[u8]> for ShortId {
    type Error = CoreError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; SHORT_ID_LEN] = bytes.try_into().map_err(|_| {
            CoreError::InvalidId(format!(
                "expected {SHORT_ID_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_cb58(&self.0))
    }
}

impl fmt::Debug for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortId({self})")
    }
}

// ==============================================================================
// NodeId
// ==============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub ShortId);

impl NodeId {
    pub const fn new(bytes: [u8; SHORT_ID_LEN]) -> Self {
        Self(ShortId::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SHORT_ID_LEN] {
        self.0.as_bytes()
    }
}

impl FromStr for NodeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s
            .strip_prefix(NODE_ID_PREFIX)
            .ok_or_else(|| CoreError::InvalidId(format!("node id `{s}` lacks `{NODE_ID_PREFIX}`")))?;
        Ok(Self(ShortId::try_from(decode_cb58(encoded)?.as_slice())?))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NODE_ID_PREFIX}{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({self})")
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(Id);
string_serde!(NodeId);

// ==============================================================================
// Network Parameters
// ==============================================================================

pub const P_CHAIN_ALIAS: &str = "P";
pub const C_CHAIN_ALIAS: &str = "C";
pub const X_CHAIN_ALIAS: &str = "X";

/// Bech32 human-readable part for a network name.
pub fn hrp_for_network(network: &str) -> Result<&'static str, CoreError> {
    match network.to_ascii_lowercase().as_str() {
        "mainnet" => Ok("avax"),
        "fuji" => Ok("fuji"),
        "local" => Ok("local"),
        other => Err(CoreError::InvalidId(format!(
            "no address hrp for network `{other}`"
        ))),
    }
}

/// Maps blockchain ids to their short aliases.
///
/// The P-chain is always the empty id.
#[derive(Debug, Clone, Default)]
pub struct ChainAliases {
    by_id: HashMap<Id, String>,
}

impl ChainAliases {
    pub fn new(c_chain: Id, x_chain: Id) -> Self {
        let mut by_id = HashMap::with_capacity(3);
        by_id.insert(Id::EMPTY, P_CHAIN_ALIAS.to_owned());
        by_id.insert(c_chain, C_CHAIN_ALIAS.to_owned());
        by_id.insert(x_chain, X_CHAIN_ALIAS.to_owned());
        Self { by_id }
    }

    pub fn alias(&self, chain: &Id) -> Option<&str> {
        self.by_id.get(chain).map(String::as_str)
    }

    /// Reverse lookup. Accepts either an alias or a cb58 chain id.
    pub fn chain_id(&self, alias_or_id: &str) -> Result<Id, CoreError> {
        if let Some((id, _)) = self.by_id.iter().find(|(_, alias)| *alias == alias_or_id) {
            return Ok(*id);
        }
        alias_or_id
            .parse()
            .map_err(|_| CoreError::InvalidId(format!("unknown chain `{alias_or_id}`")))
    }

    /// Alias if known, cb58 otherwise.
    pub fn describe(&self, chain: &Id) -> String {
        self.alias(chain)
            .map(str::to_owned)
            .unwrap_or_else(|| chain.to_string())
    }
}
