use std::path::PathBuf;
use std::time::Duration;

use cosmrs::tendermint::chain::Id;
use cosmrs::Denom;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::dec_coin::DecCoin;

#[derive(Deserialize, Serialize, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// gRPC endpoint of the node, used for queries and broadcasts
    pub grpc: Url,
    #[serde(with = "humantime_serde")]
    pub grpc_timeout: Duration,
    pub chain_id: Id,
    /// bech32 prefix of account addresses
    pub address_prefix: String,
    pub keyring_dir: PathBuf,
    /// default gas limit of keyed transactions
    pub gas_limit: u64,
    pub gas_price: DecCoin,
    /// fee denomination of `tx raw --generate-only`, which does not query the node
    pub offline_evm_denom: Option<Denom>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grpc: "http://localhost:9090".parse().expect("default url must be valid"),
            grpc_timeout: Duration::from_secs(5),
            chain_id: "Oraichain".parse().expect("default chain id must be valid"),
            address_prefix: "orai".to_string(),
            keyring_dir: PathBuf::from("~/.evmctl/keys"),
            gas_limit: 200_000,
            gas_price: DecCoin::new(0.0025, "orai").expect("default gas price must be valid"),
            offline_evm_denom: None,
        }
    }
}
