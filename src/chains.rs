//! Chain identities and per-chain constants.
//!
//! Steem and Golos are sibling Graphene chains: same transaction container,
//! different chain ids, asset symbols and API surfaces. Everything that
//! differs between them lives in [`ChainSpec`] so the rest of the crate can
//! stay chain-agnostic.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownChains {
    Steem,
    Golos,
}

impl std::str::FromStr for KnownChains {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "steem" => Ok(KnownChains::Steem),
            "golos" => Ok(KnownChains::Golos),
            _ => Err(anyhow!("Invalid chain '{s}'. Valid options: steem, golos")),
        }
    }
}

impl std::fmt::Display for KnownChains {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KnownChains::Steem => write!(f, "steem"),
            KnownChains::Golos => write!(f, "golos"),
        }
    }
}

/// Steem mainnet signs against the zero chain id.
const STEEM_CHAIN_ID: &str = "0000000000000000000000000000000000000000000000000000000000000000";
const GOLOS_CHAIN_ID: &str = "782a3039b478c839e4cb0c941ff4eaeb7df40bdd68bd441afd444b9da763ac12";

/// Constants that distinguish one chain backend from the other.
#[derive(Clone, Debug)]
pub struct ChainSpec {
    pub chain: KnownChains,
    pub chain_id: [u8; 32],
    pub address_prefix: &'static str,
    /// Liquid token: STEEM / GOLOS.
    pub core_symbol: &'static str,
    /// Debt token: SBD / GBG. Also the payout asset for beneficiary splits.
    pub debt_symbol: &'static str,
}

impl ChainSpec {
    pub fn for_chain(chain: KnownChains) -> Self {
        match chain {
            KnownChains::Steem => ChainSpec {
                chain,
                chain_id: decode_chain_id(STEEM_CHAIN_ID),
                address_prefix: "STM",
                core_symbol: "STEEM",
                debt_symbol: "SBD",
            },
            KnownChains::Golos => ChainSpec {
                chain,
                chain_id: decode_chain_id(GOLOS_CHAIN_ID),
                address_prefix: "GLS",
                core_symbol: "GOLOS",
                debt_symbol: "GBG",
            },
        }
    }
}

fn decode_chain_id(hex_id: &str) -> [u8; 32] {
    let bytes = hex::decode(hex_id).expect("chain id literal");
    let mut id = [0u8; 32];
    id.copy_from_slice(&bytes);
    id
}

/// Steepshot media backend for a chain/environment pair.
pub fn backend_url(chain: KnownChains, is_dev: bool) -> &'static str {
    match (chain, is_dev) {
        (KnownChains::Steem, false) => "https://steepshot.org/api/v1",
        (KnownChains::Steem, true) => "https://qa.steepshot.org/api/v1",
        (KnownChains::Golos, false) => "https://golos.steepshot.org/api/v1",
        (KnownChains::Golos, true) => "https://qa.golos.steepshot.org/api/v1",
    }
}
