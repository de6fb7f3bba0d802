//! Messages of the evm module and their canonical JSON form.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cosmrs::{AccountId, Any};
use error_stack::{report, Report, Result, ResultExt};
use ethers_core::types::Address;
use ethers_core::utils::public_key_to_address;
use k256::ecdsa::VerifyingKey;
use serde_json::{json, Value};

use crate::envelope::HostMsg;
use crate::ethereum::{self, DecodedTx, ValidatedTx};
use crate::Error;

pub mod proto {
    tonic::include_proto!("ethermint.evm.v1");
}

pub use proto::{MsgDeleteMappingEvmAddress, MsgEthereumTx, MsgSetMappingEvmAddress};

const COMPRESSED_PUBKEY_LEN: usize = 33;

impl MsgEthereumTx {
    pub fn new(tx: &ValidatedTx) -> Self {
        Self {
            data: Some(tx.tx.to_any()),
            size: 0.0,
            hash: format!("0x{}", hex::encode(tx.hash)),
            from: String::new(),
        }
    }

    /// The wrapped ethereum transaction.
    pub fn ethereum_tx(&self) -> Result<DecodedTx, ethereum::Error> {
        self.data
            .as_ref()
            .ok_or(report!(ethereum::Error::TxData))
            .and_then(DecodedTx::from_any)
    }
}

impl HostMsg for MsgEthereumTx {
    const TYPE_URL: &'static str = "/ethermint.evm.v1.MsgEthereumTx";

    fn to_json(&self) -> Result<Value, Error> {
        let data = self.ethereum_tx().change_context(Error::TxBuilding)?;

        Ok(json!({
            "@type": Self::TYPE_URL,
            "data": data.to_json(),
            "hash": self.hash,
            "from": self.from,
        }))
    }

    fn extension_options(&self) -> Vec<Any> {
        vec![Any {
            type_url: "/ethermint.evm.v1.ExtensionOptionsEthereumTx".to_string(),
            value: vec![],
        }]
    }
}

impl MsgSetMappingEvmAddress {
    pub fn new(signer: &AccountId, evm_pubkey: &EvmPubKey) -> Self {
        Self {
            signer: signer.to_string(),
            evm_pubkey: evm_pubkey.to_string(),
        }
    }
}

impl HostMsg for MsgSetMappingEvmAddress {
    const TYPE_URL: &'static str = "/ethermint.evm.v1.MsgSetMappingEvmAddress";

    fn to_json(&self) -> Result<Value, Error> {
        Ok(json!({
            "@type": Self::TYPE_URL,
            "signer": self.signer,
            "evm_pubkey": self.evm_pubkey,
        }))
    }
}

impl MsgDeleteMappingEvmAddress {
    pub fn new(signer: &AccountId) -> Self {
        Self {
            signer: signer.to_string(),
        }
    }
}

impl HostMsg for MsgDeleteMappingEvmAddress {
    const TYPE_URL: &'static str = "/ethermint.evm.v1.MsgDeleteMappingEvmAddress";

    fn to_json(&self) -> Result<Value, Error> {
        Ok(json!({
            "@type": Self::TYPE_URL,
            "signer": self.signer,
        }))
    }
}

/// Base64 encoded, compressed secp256k1 public key of an evm account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmPubKey(VerifyingKey);

impl EvmPubKey {
    pub fn address(&self) -> Address {
        public_key_to_address(&self.0)
    }
}

impl FromStr for EvmPubKey {
    type Err = Report<Error>;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = STANDARD
            .decode(s.trim())
            .change_context(Error::InvalidInput)
            .attach_printable_lazy(|| format!("{s} is not valid base64"))?;

        if bytes.len() != COMPRESSED_PUBKEY_LEN {
            return Err(report!(Error::InvalidInput)).attach_printable(format!(
                "expected a {COMPRESSED_PUBKEY_LEN} byte compressed public key, found {} bytes",
                bytes.len()
            ));
        }

        VerifyingKey::from_sec1_bytes(&bytes)
            .change_context(Error::InvalidInput)
            .attach_printable("not a secp256k1 public key")
            .map(Self)
    }
}

impl Display for EvmPubKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            STANDARD.encode(self.0.to_encoded_point(true).as_bytes())
        )
    }
}
