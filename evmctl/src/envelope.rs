//! The cosmos transaction that carries exactly one module message to the chain.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::crypto::PublicKey;
use cosmrs::proto::cosmos::tx::v1beta1::{TxBody, TxRaw};
use cosmrs::tendermint::chain::Id;
use cosmrs::tx::{AuthInfo, Body, BodyBuilder, Fee, SignDoc, SignerInfo};
use cosmrs::{Any, Coin, Denom};
use error_stack::{ensure, report, Result, ResultExt};
use prost::Message;
use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::ethereum::{DecodedTx, ValidatedTx};
use crate::evm::MsgEthereumTx;
use crate::report::ResultCompatExt;
use crate::Error;

/// A message the host chain accepts as the single message of a transaction.
pub trait HostMsg: Message + Sized {
    const TYPE_URL: &'static str;

    fn to_any(&self) -> Any {
        Any {
            type_url: Self::TYPE_URL.to_string(),
            value: self.encode_to_vec(),
        }
    }

    /// The protobuf JSON form of the message, including its `@type`.
    fn to_json(&self) -> Result<Value, Error>;

    fn extension_options(&self) -> Vec<Any> {
        vec![]
    }
}

#[derive(Debug, Clone)]
struct Signer {
    pub_key: PublicKey,
    sequence: u64,
}

#[derive(Debug, Clone)]
pub struct Envelope<M> {
    msg: M,
    fee: Fee,
    signer: Option<Signer>,
}

impl<M> Envelope<M>
where
    M: HostMsg,
{
    pub fn new(msg: M, fee: Fee) -> Self {
        Self {
            msg,
            fee,
            signer: None,
        }
    }

    pub fn with_signer(self, pub_key: PublicKey, sequence: u64) -> Self {
        Self {
            signer: Some(Signer { pub_key, sequence }),
            ..self
        }
    }

    pub fn msg(&self) -> &M {
        &self.msg
    }

    pub fn fee(&self) -> &Fee {
        &self.fee
    }

    /// Protobuf encoded `TxRaw` without signatures.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(TxRaw {
            body_bytes: self.body().into_bytes().change_context(Error::TxBuilding)?,
            auth_info_bytes: self
                .auth_info()
                .into_bytes()
                .change_context(Error::TxBuilding)?,
            signatures: vec![],
        }
        .encode_to_vec())
    }

    /// Signs the envelope in `SIGN_MODE_DIRECT` and returns the protobuf encoded `TxRaw`.
    pub fn sign(
        &self,
        chain_id: &Id,
        account_number: u64,
        signing_key: &SigningKey,
    ) -> Result<Vec<u8>, Error> {
        ensure!(self.signer.is_some(), Error::TxBuilding);

        SignDoc::new(&self.body(), &self.auth_info(), chain_id, account_number)
            .change_context(Error::TxBuilding)?
            .sign(signing_key)
            .change_context(Error::TxBuilding)?
            .to_bytes()
            .change_context(Error::TxBuilding)
    }

    pub fn to_json(&self) -> Result<Value, Error> {
        Ok(json!({
            "body": {
                "messages": [self.msg.to_json()?],
                "memo": "",
                "timeout_height": "0",
                "extension_options": self
                    .msg
                    .extension_options()
                    .iter()
                    .map(|option| json!({ "@type": option.type_url }))
                    .collect::<Vec<_>>(),
                "non_critical_extension_options": [],
            },
            "auth_info": {
                "signer_infos": self
                    .signer
                    .iter()
                    .map(signer_info_json)
                    .collect::<Vec<_>>(),
                "fee": {
                    "amount": self
                        .fee
                        .amount
                        .iter()
                        .map(|coin| {
                            json!({
                                "denom": coin.denom.to_string(),
                                "amount": coin.amount.to_string(),
                            })
                        })
                        .collect::<Vec<_>>(),
                    "gas_limit": self.fee.gas_limit.to_string(),
                    "payer": "",
                    "granter": "",
                },
            },
            "signatures": [],
        }))
    }

    fn body(&self) -> Body {
        let mut body = BodyBuilder::new().msg(self.msg.to_any()).finish();
        body.extension_options = self.msg.extension_options();

        body
    }

    fn auth_info(&self) -> AuthInfo {
        match &self.signer {
            Some(Signer { pub_key, sequence }) => {
                SignerInfo::single_direct(Some(pub_key.clone()), *sequence).auth_info(self.fee.clone())
            }
            None => AuthInfo {
                signer_infos: vec![],
                fee: self.fee.clone(),
            },
        }
    }
}

impl Envelope<MsgEthereumTx> {
    /// Wraps a validated ethereum transaction. The fee is the transaction's own fee in
    /// `denom` and the gas limit is the transaction's gas limit.
    pub fn ethereum(tx: &ValidatedTx, denom: Denom) -> Self {
        let amount = match tx.fee {
            0 => vec![],
            fee => vec![Coin { denom, amount: fee }],
        };

        Self::new(
            MsgEthereumTx::new(tx),
            Fee {
                amount,
                gas_limit: tx.tx.gas,
                payer: None,
                granter: None,
            },
        )
    }

    /// Extracts the wrapped ethereum transaction back out of the encoded envelope.
    pub fn ethereum_tx(&self) -> Result<DecodedTx, Error> {
        let raw = TxRaw::decode(self.to_bytes()?.as_slice()).change_context(Error::TxBuilding)?;
        let body = TxBody::decode(raw.body_bytes.as_slice()).change_context(Error::TxBuilding)?;

        let [msg] = body.messages.as_slice() else {
            return Err(report!(Error::TxBuilding))
                .attach_printable(format!("expected one message, found {}", body.messages.len()));
        };
        ensure!(
            msg.type_url == <MsgEthereumTx as HostMsg>::TYPE_URL,
            Error::TxBuilding
        );

        MsgEthereumTx::decode(msg.value.as_slice())
            .change_context(Error::TxBuilding)?
            .ethereum_tx()
            .change_context(Error::TxBuilding)
    }
}

impl<M> Serialize for Envelope<M>
where
    M: HostMsg,
{
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

fn signer_info_json(signer: &Signer) -> Value {
    json!({
        "public_key": {
            "@type": signer.pub_key.type_url(),
            "key": STANDARD.encode(signer.pub_key.to_bytes()),
        },
        "mode_info": { "single": { "mode": "SIGN_MODE_DIRECT" } },
        "sequence": signer.sequence.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use cosmrs::crypto::secp256k1::SigningKey;
    use cosmrs::proto::cosmos::tx::v1beta1::{AuthInfo, SignDoc, TxRaw};
    use cosmrs::tx::Fee;
    use cosmrs::{AccountId, Coin, Denom};
    use k256::ecdsa::signature::Verifier;
    use prost::Message;

    use super::{Envelope, HostMsg};
    use crate::ethereum::{test_utils, ValidatedTx};
    use crate::evm::{EvmPubKey, MsgSetMappingEvmAddress};

    fn denom() -> Denom {
        "aorai".parse().unwrap()
    }

    fn mapping_envelope(key: &SigningKey) -> Envelope<MsgSetMappingEvmAddress> {
        let signer = key.public_key().account_id("orai").unwrap();
        let msg = MsgSetMappingEvmAddress::new(
            &signer,
            &EvmPubKey::from_str("AvSl0d9JrHCW4mdEyHvZu076WxLgH0bBVLigUcFm4UjV").unwrap(),
        );

        Envelope::new(
            msg,
            Fee::from_amount_and_gas(
                Coin {
                    denom: denom(),
                    amount: 500,
                },
                200_000u64,
            ),
        )
    }

    #[test]
    fn ethereum_envelope_round_trips_every_tx_type() {
        for tx in [
            test_utils::legacy_tx(),
            test_utils::access_list_tx(),
            test_utils::dynamic_fee_tx(),
        ] {
            let raw = test_utils::raw(&tx);
            let validated = raw.decode().unwrap().validate().unwrap();

            let envelope = Envelope::ethereum(&validated, denom());
            let extracted = envelope.ethereum_tx().unwrap();

            assert_eq!(extracted.encode(), raw.as_bytes());
        }
    }

    #[test]
    fn ethereum_envelope_charges_the_tx_fee() {
        let validated = test_utils::legacy_tx().validate().unwrap();

        let envelope = Envelope::ethereum(&validated, denom());

        assert_eq!(
            envelope.fee().amount,
            vec![Coin {
                denom: denom(),
                amount: 21_000 * 20_000_000_000
            }]
        );
        assert_eq!(envelope.fee().gas_limit, 21_000);
        assert!(envelope.fee().payer.is_none());
    }

    #[test]
    fn ethereum_envelope_omits_zero_fee() {
        let validated = test_utils::legacy_tx().validate().unwrap();
        let free = ValidatedTx { fee: 0, ..validated };

        let envelope = Envelope::ethereum(&free, denom());

        assert!(envelope.fee().amount.is_empty());
        assert_eq!(envelope.fee().gas_limit, 21_000);
    }

    #[test]
    fn ethereum_envelope_is_unsigned() {
        let validated = test_utils::access_list_tx().validate().unwrap();

        let bytes = Envelope::ethereum(&validated, denom()).to_bytes().unwrap();
        let raw = TxRaw::decode(bytes.as_slice()).unwrap();
        let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();

        assert!(raw.signatures.is_empty());
        assert!(auth_info.signer_infos.is_empty());
        assert_eq!(auth_info.fee.unwrap().gas_limit, 50_000);
    }

    #[test]
    fn ethereum_envelope_json_has_the_canonical_shape() {
        let validated = test_utils::legacy_tx().validate().unwrap();

        let json = serde_json::to_value(Envelope::ethereum(&validated, denom())).unwrap();

        assert_eq!(
            json["body"]["messages"][0]["@type"],
            "/ethermint.evm.v1.MsgEthereumTx"
        );
        assert_eq!(
            json["body"]["messages"][0]["hash"],
            format!("0x{}", hex::encode(validated.hash))
        );
        assert_eq!(
            json["body"]["extension_options"][0]["@type"],
            "/ethermint.evm.v1.ExtensionOptionsEthereumTx"
        );
        assert_eq!(json["body"]["memo"], "");
        assert_eq!(json["auth_info"]["fee"]["gas_limit"], "21000");
        assert_eq!(json["auth_info"]["fee"]["amount"][0]["denom"], "aorai");
        assert_eq!(
            json["auth_info"]["fee"]["amount"][0]["amount"],
            "420000000000000"
        );
        assert_eq!(json["auth_info"]["signer_infos"], serde_json::json!([]));
        assert_eq!(json["signatures"], serde_json::json!([]));
    }

    #[test]
    fn signed_envelope_verifies_against_the_signer() {
        let key = SigningKey::from_slice(&[7; 32]).unwrap();
        let chain_id = "Oraichain".parse().unwrap();
        let envelope = mapping_envelope(&key).with_signer(key.public_key(), 3);

        let bytes = envelope.sign(&chain_id, 11, &key).unwrap();

        let raw = TxRaw::decode(bytes.as_slice()).unwrap();
        let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
        assert_eq!(raw.signatures.len(), 1);
        assert_eq!(auth_info.signer_infos[0].sequence, 3);

        let sign_doc = SignDoc {
            body_bytes: raw.body_bytes.clone(),
            auth_info_bytes: raw.auth_info_bytes.clone(),
            chain_id: "Oraichain".to_string(),
            account_number: 11,
        }
        .encode_to_vec();
        let verifying_key =
            k256::ecdsa::VerifyingKey::from_sec1_bytes(&key.public_key().to_bytes()).unwrap();
        let signature = k256::ecdsa::Signature::from_slice(&raw.signatures[0]).unwrap();

        assert!(verifying_key.verify(&sign_doc, &signature).is_ok());
    }

    #[test]
    fn sign_requires_a_signer() {
        let key = SigningKey::from_slice(&[7; 32]).unwrap();

        assert!(mapping_envelope(&key)
            .sign(&"Oraichain".parse().unwrap(), 0, &key)
            .is_err());
    }

    #[test]
    fn mapping_envelope_json_shows_the_signer_info() {
        let key = SigningKey::from_slice(&[7; 32]).unwrap();
        let signer = key.public_key().account_id("orai").unwrap();

        let json = mapping_envelope(&key)
            .with_signer(key.public_key(), 3)
            .to_json()
            .unwrap();

        assert_eq!(json["body"]["messages"][0]["signer"], signer.to_string());
        assert_eq!(
            json["body"]["messages"][0]["@type"],
            MsgSetMappingEvmAddress::TYPE_URL
        );
        assert_eq!(json["body"]["extension_options"], serde_json::json!([]));
        assert_eq!(
            json["auth_info"]["signer_infos"][0]["public_key"]["@type"],
            "/cosmos.crypto.secp256k1.PubKey"
        );
        assert_eq!(json["auth_info"]["signer_infos"][0]["sequence"], "3");
        assert_eq!(json["auth_info"]["fee"]["amount"][0]["amount"], "500");
        assert!(AccountId::from_str(&signer.to_string()).is_ok());
    }
}
