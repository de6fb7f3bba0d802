//! Conversion between decoded ethereum transactions and the evm module's `TxData` protobuf
//! messages, which is how the transaction travels inside a `MsgEthereumTx`.

use std::str::FromStr;

use cosmrs::Any;
use error_stack::{bail, ensure, report, Result};
use ethers_core::types::transaction::eip2930::{AccessList, AccessListItem};
use ethers_core::types::{Address, Signature, H256, U256};
use ethers_core::utils::to_checksum;
use prost::Message;
use serde_json::{json, Value};

use super::{DecodedTx, Error, TxKind, ADDRESS_LEN};
use crate::evm::proto::{AccessListTx, AccessTuple, DynamicFeeTx, LegacyTx};

pub const LEGACY_TX_TYPE_URL: &str = "/ethermint.evm.v1.LegacyTx";
pub const ACCESS_LIST_TX_TYPE_URL: &str = "/ethermint.evm.v1.AccessListTx";
pub const DYNAMIC_FEE_TX_TYPE_URL: &str = "/ethermint.evm.v1.DynamicFeeTx";

impl DecodedTx {
    pub fn to_any(&self) -> Any {
        match &self.kind {
            TxKind::Legacy { gas_price } => Any {
                type_url: LEGACY_TX_TYPE_URL.to_string(),
                value: LegacyTx {
                    nonce: self.nonce,
                    gas_price: gas_price.to_string(),
                    gas: self.gas,
                    to: self.to_hex(),
                    value: self.value.to_string(),
                    data: self.data.clone(),
                    v: minimal_bytes(U256::from(self.signature.v)),
                    r: minimal_bytes(self.signature.r),
                    s: minimal_bytes(self.signature.s),
                }
                .encode_to_vec(),
            },
            TxKind::AccessList {
                chain_id,
                gas_price,
                access_list,
            } => Any {
                type_url: ACCESS_LIST_TX_TYPE_URL.to_string(),
                value: AccessListTx {
                    chain_id: chain_id.to_string(),
                    nonce: self.nonce,
                    gas_price: gas_price.to_string(),
                    gas: self.gas,
                    to: self.to_hex(),
                    value: self.value.to_string(),
                    data: self.data.clone(),
                    accesses: to_access_tuples(access_list),
                    v: minimal_bytes(U256::from(self.signature.v)),
                    r: minimal_bytes(self.signature.r),
                    s: minimal_bytes(self.signature.s),
                }
                .encode_to_vec(),
            },
            TxKind::DynamicFee {
                chain_id,
                gas_tip_cap,
                gas_fee_cap,
                access_list,
            } => Any {
                type_url: DYNAMIC_FEE_TX_TYPE_URL.to_string(),
                value: DynamicFeeTx {
                    chain_id: chain_id.to_string(),
                    nonce: self.nonce,
                    gas_tip_cap: gas_tip_cap.to_string(),
                    gas_fee_cap: gas_fee_cap.to_string(),
                    gas: self.gas,
                    to: self.to_hex(),
                    value: self.value.to_string(),
                    data: self.data.clone(),
                    accesses: to_access_tuples(access_list),
                    v: minimal_bytes(U256::from(self.signature.v)),
                    r: minimal_bytes(self.signature.r),
                    s: minimal_bytes(self.signature.s),
                }
                .encode_to_vec(),
            },
        }
    }

    pub fn from_any(any: &Any) -> Result<Self, Error> {
        match any.type_url.as_str() {
            LEGACY_TX_TYPE_URL => {
                let tx = LegacyTx::decode(any.value.as_slice()).map_err(|_| report!(Error::TxData))?;

                Ok(DecodedTx {
                    kind: TxKind::Legacy {
                        gas_price: parse_int(&tx.gas_price)?,
                    },
                    nonce: tx.nonce,
                    gas: tx.gas,
                    to: parse_recipient(&tx.to)?,
                    value: parse_int(&tx.value)?,
                    data: tx.data,
                    signature: parse_signature(&tx.v, &tx.r, &tx.s)?,
                })
            }
            ACCESS_LIST_TX_TYPE_URL => {
                let tx =
                    AccessListTx::decode(any.value.as_slice()).map_err(|_| report!(Error::TxData))?;

                Ok(DecodedTx {
                    kind: TxKind::AccessList {
                        chain_id: parse_u64(&tx.chain_id)?,
                        gas_price: parse_int(&tx.gas_price)?,
                        access_list: parse_access_tuples(&tx.accesses)?,
                    },
                    nonce: tx.nonce,
                    gas: tx.gas,
                    to: parse_recipient(&tx.to)?,
                    value: parse_int(&tx.value)?,
                    data: tx.data,
                    signature: parse_signature(&tx.v, &tx.r, &tx.s)?,
                })
            }
            DYNAMIC_FEE_TX_TYPE_URL => {
                let tx =
                    DynamicFeeTx::decode(any.value.as_slice()).map_err(|_| report!(Error::TxData))?;

                Ok(DecodedTx {
                    kind: TxKind::DynamicFee {
                        chain_id: parse_u64(&tx.chain_id)?,
                        gas_tip_cap: parse_int(&tx.gas_tip_cap)?,
                        gas_fee_cap: parse_int(&tx.gas_fee_cap)?,
                        access_list: parse_access_tuples(&tx.accesses)?,
                    },
                    nonce: tx.nonce,
                    gas: tx.gas,
                    to: parse_recipient(&tx.to)?,
                    value: parse_int(&tx.value)?,
                    data: tx.data,
                    signature: parse_signature(&tx.v, &tx.r, &tx.s)?,
                })
            }
            _ => bail!(Error::TxData),
        }
    }

    /// The protobuf JSON form of the tx data, as it is shown inside a `MsgEthereumTx`.
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "nonce": self.nonce.to_string(),
            "gas": self.gas.to_string(),
            "to": self.to_hex(),
            "value": self.value.to_string(),
            "data": base64_json(&self.data),
            "v": base64_json(&minimal_bytes(U256::from(self.signature.v))),
            "r": base64_json(&minimal_bytes(self.signature.r)),
            "s": base64_json(&minimal_bytes(self.signature.s)),
        });

        let (type_url, fields) = match &self.kind {
            TxKind::Legacy { gas_price } => {
                (LEGACY_TX_TYPE_URL, json!({ "gas_price": gas_price.to_string() }))
            }
            TxKind::AccessList {
                chain_id,
                gas_price,
                access_list,
            } => (
                ACCESS_LIST_TX_TYPE_URL,
                json!({
                    "chain_id": chain_id.to_string(),
                    "gas_price": gas_price.to_string(),
                    "accesses": access_tuples_json(access_list),
                }),
            ),
            TxKind::DynamicFee {
                chain_id,
                gas_tip_cap,
                gas_fee_cap,
                access_list,
            } => (
                DYNAMIC_FEE_TX_TYPE_URL,
                json!({
                    "chain_id": chain_id.to_string(),
                    "gas_tip_cap": gas_tip_cap.to_string(),
                    "gas_fee_cap": gas_fee_cap.to_string(),
                    "accesses": access_tuples_json(access_list),
                }),
            ),
        };

        if let (Value::Object(map), Value::Object(fields)) = (&mut value, fields) {
            map.insert("@type".to_string(), Value::String(type_url.to_string()));
            map.extend(fields);
        }

        value
    }

    fn to_hex(&self) -> String {
        match self.to.len() {
            0 => String::new(),
            ADDRESS_LEN => to_checksum(&Address::from_slice(&self.to), None),
            _ => format!("0x{}", hex::encode(&self.to)),
        }
    }
}

fn base64_json(bytes: &[u8]) -> Value {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    Value::String(STANDARD.encode(bytes))
}

fn minimal_bytes(value: U256) -> Vec<u8> {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);

    bytes.into_iter().skip_while(|byte| *byte == 0).collect()
}

fn to_access_tuples(access_list: &AccessList) -> Vec<AccessTuple> {
    access_list
        .0
        .iter()
        .map(|item| AccessTuple {
            address: to_checksum(&item.address, None),
            storage_keys: item
                .storage_keys
                .iter()
                .map(|key| format!("0x{}", hex::encode(key)))
                .collect(),
        })
        .collect()
}

fn access_tuples_json(access_list: &AccessList) -> Value {
    to_access_tuples(access_list)
        .into_iter()
        .map(|tuple| json!({ "address": tuple.address, "storage_keys": tuple.storage_keys }))
        .collect()
}

fn parse_access_tuples(tuples: &[AccessTuple]) -> Result<AccessList, Error> {
    tuples
        .iter()
        .map(|tuple| -> Result<AccessListItem, Error> {
            let storage_keys = tuple
                .storage_keys
                .iter()
                .map(|key| H256::from_str(key).map_err(|_| report!(Error::TxData)))
                .collect::<Result<Vec<_>, Error>>()?;

            Ok(AccessListItem {
                address: Address::from_str(&tuple.address).map_err(|_| report!(Error::TxData))?,
                storage_keys,
            })
        })
        .collect::<Result<Vec<_>, Error>>()
        .map(AccessList)
}

fn parse_int(value: &str) -> Result<U256, Error> {
    if value.is_empty() {
        return Ok(U256::zero());
    }

    U256::from_dec_str(value).map_err(|_| report!(Error::TxData))
}

fn parse_u64(value: &str) -> Result<u64, Error> {
    let value = parse_int(value)?;
    ensure!(value.bits() <= 64, Error::TxData);

    Ok(value.as_u64())
}

fn parse_recipient(to: &str) -> Result<Vec<u8>, Error> {
    if to.is_empty() {
        return Ok(vec![]);
    }

    Address::from_str(to)
        .map(|address| address.as_bytes().to_vec())
        .map_err(|_| report!(Error::TxData))
}

fn parse_signature(v: &[u8], r: &[u8], s: &[u8]) -> Result<Signature, Error> {
    ensure!(v.len() <= 8 && r.len() <= 32 && s.len() <= 32, Error::TxData);

    Ok(Signature {
        v: U256::from_big_endian(v).as_u64(),
        r: U256::from_big_endian(r),
        s: U256::from_big_endian(s),
    })
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use cosmrs::Any;
    use ethers_core::types::U256;

    use super::{minimal_bytes, DYNAMIC_FEE_TX_TYPE_URL, LEGACY_TX_TYPE_URL};
    use crate::ethereum::test_utils;
    use crate::ethereum::{DecodedTx, Error};

    #[test]
    fn any_round_trip_preserves_every_tx_type() {
        for tx in [
            test_utils::legacy_tx(),
            test_utils::access_list_tx(),
            test_utils::dynamic_fee_tx(),
        ] {
            let any = tx.to_any();

            assert_eq!(DecodedTx::from_any(&any).unwrap(), tx);
        }
    }

    #[test]
    fn to_any_uses_tx_data_type_urls() {
        assert_eq!(test_utils::legacy_tx().to_any().type_url, LEGACY_TX_TYPE_URL);
        assert_eq!(
            test_utils::dynamic_fee_tx().to_any().type_url,
            DYNAMIC_FEE_TX_TYPE_URL
        );
    }

    #[test]
    fn from_any_rejects_unknown_messages() {
        let any = Any {
            type_url: "/cosmos.bank.v1beta1.MsgSend".to_string(),
            value: vec![],
        };

        assert_eq!(
            DecodedTx::from_any(&any).unwrap_err().current_context(),
            &Error::TxData
        );
    }

    #[test]
    fn minimal_bytes_strips_leading_zeros() {
        assert_eq!(minimal_bytes(U256::zero()), Vec::<u8>::new());
        assert_eq!(minimal_bytes(U256::from(37)), vec![37]);
        assert_eq!(minimal_bytes(U256::from(0x0100)), vec![1, 0]);
    }

    #[test]
    fn to_json_shows_legacy_tx_fields() {
        let tx = test_utils::legacy_tx();

        let json = tx.to_json();

        assert_eq!(json["@type"], LEGACY_TX_TYPE_URL);
        assert_eq!(json["nonce"], "9");
        assert_eq!(json["gas_price"], "20000000000");
        assert_eq!(json["gas"], "21000");
        assert_eq!(json["to"], "0x3535353535353535353535353535353535353535");
        assert_eq!(json["value"], "1000000000000000000");
        assert_eq!(json["data"], "");
        let v = STANDARD.decode(json["v"].as_str().unwrap()).unwrap();
        assert_eq!(v, minimal_bytes(U256::from(tx.signature.v)));
        assert_eq!(U256::from_big_endian(&v).as_u64(), tx.signature.v);
        assert!(json.get("chain_id").is_none());
    }

    #[test]
    fn to_json_shows_access_lists() {
        let tx = test_utils::access_list_tx();

        let json = tx.to_json();

        assert_eq!(json["chain_id"], "1");
        assert_eq!(
            json["accesses"][0]["address"],
            "0x0000000000000000000000000000000000000001"
        );
        assert_eq!(
            json["accesses"][0]["storage_keys"][0],
            format!("0x{}01", "00".repeat(31))
        );
    }
}
