//! Private key material decoding.
//!
//! Posting and active keys arrive as WIF strings (base58check, version byte
//! 0x80). Decoding is total: anything malformed yields `None`, never a panic
//! or an error type. Callers translate `None` into the "wrong private key"
//! message for the user.

const WIF_VERSION: u8 = 0x80;
const KEY_LEN: usize = 32;

/// Decode one WIF private key into raw signing bytes.
///
/// Returns `None` on bad base58, bad checksum, wrong version byte or a
/// payload that is not exactly 32 bytes.
pub fn decode_wif(wif: &str) -> Option<[u8; 32]> {
    if wif.is_empty() {
        return None;
    }
    let payload = bs58::decode(wif)
        .with_check(Some(WIF_VERSION))
        .into_vec()
        .ok()?;
    // payload still carries the version byte up front
    if payload.len() != KEY_LEN + 1 {
        return None;
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&payload[1..]);
    Some(key)
}

/// Decode a chain public key (`STM...`/`GLS...`) into its 33 compressed
/// bytes. Public keys use a RIPEMD-160 checksum, not the double-SHA of WIF.
pub fn decode_public_key(key: &str, prefix: &str) -> Option<[u8; 33]> {
    use ripemd::{Digest, Ripemd160};

    let body = key.strip_prefix(prefix)?;
    let raw = bs58::decode(body).into_vec().ok()?;
    if raw.len() != 33 + 4 {
        return None;
    }
    let (payload, checksum) = raw.split_at(33);
    let digest = Ripemd160::digest(payload);
    if digest[..4] != *checksum {
        return None;
    }
    let mut out = [0u8; 33];
    out.copy_from_slice(payload);
    Some(out)
}

/// Decode a batch of keys for a multi-signature transaction.
///
/// Any invalid member rejects the whole batch, before any network call is
/// made on its behalf.
pub fn to_key_arr(wifs: &[&str]) -> Option<Vec<[u8; 32]>> {
    if wifs.is_empty() {
        return None;
    }
    wifs.iter().map(|w| decode_wif(w)).collect()
}
