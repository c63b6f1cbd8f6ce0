//! Graphene binary serialization for the supported operation set.
//!
//! This is the byte stream the transaction signature covers: little-endian
//! integers, LEB128 varints for counts and op ids, length-prefixed strings
//! and 7-byte zero-padded asset symbols.

use crate::error::{OperationError, OperationResult};
use crate::keys;
use crate::operations::{Asset, ChainOp};

/// Transaction header fields, TaPoS reference plus expiration.
#[derive(Clone, Copy, Debug)]
pub struct TxHeader {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    /// Unix seconds.
    pub expiration: u32,
}

#[derive(Default)]
struct BinWriter {
    buf: Vec<u8>,
}

impl BinWriter {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn varint(&mut self, mut v: u64) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if v == 0 {
                break;
            }
        }
    }

    fn string(&mut self, s: &str) {
        self.varint(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    fn asset(&mut self, a: &Asset) {
        self.i64(a.amount);
        self.u8(a.precision);
        let mut symbol = [0u8; 7];
        let bytes = a.symbol.as_bytes();
        symbol[..bytes.len().min(7)].copy_from_slice(&bytes[..bytes.len().min(7)]);
        self.buf.extend_from_slice(&symbol);
    }
}

fn write_op(w: &mut BinWriter, op: &ChainOp, address_prefix: &str) -> OperationResult<()> {
    w.varint(op.op_id() as u64);
    match op {
        ChainOp::Vote {
            voter,
            author,
            permlink,
            weight,
        } => {
            w.string(voter);
            w.string(author);
            w.string(permlink);
            w.i16(*weight);
        }
        ChainOp::Comment {
            parent_author,
            parent_permlink,
            author,
            permlink,
            title,
            body,
            json_metadata,
        } => {
            w.string(parent_author);
            w.string(parent_permlink);
            w.string(author);
            w.string(permlink);
            w.string(title);
            w.string(body);
            w.string(json_metadata);
        }
        ChainOp::CommentOptions {
            author,
            permlink,
            max_accepted_payout,
            percent_steem_dollars,
            allow_votes,
            allow_curation_rewards,
            beneficiaries,
        } => {
            w.string(author);
            w.string(permlink);
            w.asset(max_accepted_payout);
            w.u16(*percent_steem_dollars);
            w.bool(*allow_votes);
            w.bool(*allow_curation_rewards);
            if beneficiaries.is_empty() {
                w.varint(0);
            } else {
                w.varint(1);
                w.varint(0); // static_variant: comment_payout_beneficiaries
                w.varint(beneficiaries.len() as u64);
                for b in beneficiaries {
                    w.string(&b.account);
                    w.u16(b.weight);
                }
            }
        }
        ChainOp::Follow { .. } | ChainOp::Unfollow { .. } => {
            // custom_json envelope; the plugin payload rides the json string
            let wire = op.to_json();
            let params = &wire[1];
            w.varint(0); // required_auths
            w.varint(1); // required_posting_auths
            w.string(params["required_posting_auths"][0].as_str().unwrap_or_default());
            w.string(params["id"].as_str().unwrap_or_default());
            w.string(params["json"].as_str().unwrap_or_default());
        }
        ChainOp::DeleteComment { author, permlink } => {
            w.string(author);
            w.string(permlink);
        }
        ChainOp::Transfer {
            from,
            to,
            amount,
            memo,
        } => {
            w.string(from);
            w.string(to);
            w.asset(amount);
            w.string(memo);
        }
        ChainOp::AccountUpdate {
            account,
            memo_key,
            json_metadata,
        } => {
            w.string(account);
            // owner / active / posting authorities stay untouched
            w.u8(0);
            w.u8(0);
            w.u8(0);
            let key = keys::decode_public_key(memo_key, address_prefix)
                .ok_or(OperationError::UnexpectedAccountData)?;
            w.buf.extend_from_slice(&key);
            w.string(json_metadata);
        }
    }
    Ok(())
}

/// Serialize the signable part of a transaction (header, operations, empty
/// extensions, no signatures).
pub fn serialize_transaction(
    header: &TxHeader,
    ops: &[ChainOp],
    address_prefix: &str,
) -> OperationResult<Vec<u8>> {
    let mut w = BinWriter::default();
    w.u16(header.ref_block_num);
    w.u32(header.ref_block_prefix);
    w.u32(header.expiration);
    w.varint(ops.len() as u64);
    for op in ops {
        write_op(&mut w, op, address_prefix)?;
    }
    w.varint(0); // extensions
    Ok(w.buf)
}
