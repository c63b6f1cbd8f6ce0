//! Transaction assembly and signing.
//!
//! The header references the current head block (TaPoS) and expires 60
//! seconds past the node's head time. The digest is
//! SHA-256(chain_id ‖ serialized transaction); signatures must be canonical
//! per chain rules, so signing retries with an extra nonce until both halves
//! pass the high-bit checks.

use crate::chains::ChainSpec;
use crate::error::{OperationError, OperationResult};
use crate::operations::ChainOp;
use crate::serializer::{serialize_transaction, TxHeader};
use chrono::NaiveDateTime;
use secp256k1::{Message, Secp256k1, SecretKey};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Seconds a transaction stays valid past the head-block time.
const EXPIRATION_WINDOW_SECS: i64 = 60;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Derive the TaPoS header from a `get_dynamic_global_properties` result.
pub fn header_from_props(props: &Value) -> OperationResult<TxHeader> {
    let head_block_number = props["head_block_number"]
        .as_u64()
        .ok_or(OperationError::ServerError)?;
    let head_block_id = props["head_block_id"]
        .as_str()
        .ok_or(OperationError::ServerError)?;
    let time = props["time"].as_str().ok_or(OperationError::ServerError)?;

    let id_bytes = hex::decode(head_block_id).map_err(|_| OperationError::ServerError)?;
    if id_bytes.len() < 8 {
        return Err(OperationError::ServerError);
    }
    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&id_bytes[4..8]);

    let head_time = NaiveDateTime::parse_from_str(time, TIME_FORMAT)
        .map_err(|_| OperationError::ServerError)?;
    let expiration = head_time.and_utc().timestamp() + EXPIRATION_WINDOW_SECS;

    Ok(TxHeader {
        ref_block_num: (head_block_number & 0xffff) as u16,
        ref_block_prefix: u32::from_le_bytes(prefix),
        expiration: expiration as u32,
    })
}

/// Both signature halves must stay below the high bit, with no ambiguous
/// leading zero byte.
fn is_canonical(compact: &[u8; 64]) -> bool {
    compact[0] & 0x80 == 0
        && !(compact[0] == 0 && compact[1] & 0x80 == 0)
        && compact[32] & 0x80 == 0
        && !(compact[32] == 0 && compact[33] & 0x80 == 0)
}

/// Produce one canonical 65-byte signature (recovery byte + r + s) over the
/// digest.
pub fn sign_canonical(digest: &[u8; 32], key: &[u8; 32]) -> OperationResult<[u8; 65]> {
    let secp = Secp256k1::signing_only();
    let secret = SecretKey::from_slice(key).map_err(|_| OperationError::WrongKey)?;
    let message = Message::from_digest(*digest);

    let mut extra = 0u32;
    loop {
        let sig = if extra == 0 {
            secp.sign_ecdsa_recoverable(&message, &secret)
        } else {
            let mut noncedata = [0u8; 32];
            noncedata[..4].copy_from_slice(&extra.to_le_bytes());
            secp.sign_ecdsa_recoverable_with_noncedata(&message, &secret, &noncedata)
        };
        let (rec_id, compact) = sig.serialize_compact();
        if is_canonical(&compact) {
            let mut out = [0u8; 65];
            out[0] = 27 + 4 + rec_id.to_i32() as u8; // compressed, recoverable
            out[1..].copy_from_slice(&compact);
            return Ok(out);
        }
        extra += 1;
    }
}

/// A signed transaction ready for broadcast or authority verification.
#[derive(Clone, Debug)]
pub struct SignedTransaction {
    pub header: TxHeader,
    pub ops: Vec<ChainOp>,
    pub signatures: Vec<String>,
}

impl SignedTransaction {
    /// The JSON form the node expects.
    pub fn to_json(&self) -> Value {
        let expiration = chrono::DateTime::from_timestamp(self.header.expiration as i64, 0)
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_default();
        json!({
            "ref_block_num": self.header.ref_block_num,
            "ref_block_prefix": self.header.ref_block_prefix,
            "expiration": expiration,
            "operations": self.ops.iter().map(ChainOp::to_json).collect::<Vec<_>>(),
            "extensions": [],
            "signatures": self.signatures,
        })
    }
}

/// Serialize, digest and sign a batch of operations as one transaction.
pub fn build_signed_transaction(
    spec: &ChainSpec,
    props: &Value,
    ops: Vec<ChainOp>,
    keys: &[[u8; 32]],
) -> OperationResult<SignedTransaction> {
    let header = header_from_props(props)?;
    let tx_bytes = serialize_transaction(&header, &ops, spec.address_prefix)?;

    let mut hasher = Sha256::new();
    hasher.update(spec.chain_id);
    hasher.update(&tx_bytes);
    let digest: [u8; 32] = hasher.finalize().into();

    let mut signatures = Vec::with_capacity(keys.len());
    for key in keys {
        signatures.push(hex::encode(sign_canonical(&digest, key)?));
    }

    Ok(SignedTransaction {
        header,
        ops,
        signatures,
    })
}
