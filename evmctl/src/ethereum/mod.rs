//! Decoding and local validation of externally signed ethereum transactions.
//!
//! Legacy (EIP-155), access list (EIP-2930) and dynamic fee (EIP-1559) transactions are
//! supported. A blob only decodes if re-encoding the decoded transaction reproduces it byte
//! for byte, so wrapping a decoded transaction never changes what was signed.

use std::fmt::{Display, Formatter};

use error_stack::{bail, ensure, report, Result, ResultExt};
use ethers_core::types::transaction::eip2930::AccessList;
use ethers_core::types::{Address, Signature, H256, U256};
use ethers_core::utils::keccak256;
use ethers_core::utils::rlp::{DecoderError, Rlp, RlpStream};
use thiserror::Error;
use tracing::debug;

pub mod tx_data;

#[cfg(test)]
pub mod test_utils;

const ACCESS_LIST_TX_TYPE: u8 = 0x01;
const DYNAMIC_FEE_TX_TYPE: u8 = 0x02;
const LEGACY_FIELD_COUNT: usize = 9;
const ACCESS_LIST_FIELD_COUNT: usize = 11;
const DYNAMIC_FEE_FIELD_COUNT: usize = 12;
const EIP155_V_OFFSET: u64 = 35;
const UNPROTECTED_V: [u64; 2] = [27, 28];
const ADDRESS_LEN: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid hex encoding")]
    Hex,
    #[error("empty transaction")]
    Empty,
    #[error("unsupported transaction type {0:#04x}")]
    UnsupportedType(u8),
    #[error("malformed rlp encoding")]
    Rlp,
    #[error("expected {expected} rlp fields, found {actual}")]
    FieldCount { expected: usize, actual: usize },
    #[error("transaction is not canonically encoded")]
    NonCanonical,
    #[error("transaction is not signed")]
    EmptySignature,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("gas limit must not be zero")]
    ZeroGas,
    #[error("gas limit {0} exceeds the maximum of {max}", max = i64::MAX)]
    GasTooHigh(u64),
    #[error("recipient must be empty or 20 bytes, found {0} bytes")]
    InvalidRecipient(usize),
    #[error("max priority fee per gas {tip} is higher than max fee per gas {cap}")]
    TipAboveFeeCap { tip: U256, cap: U256 },
    #[error("transaction fee is out of range")]
    FeeOutOfRange,
    #[error("invalid tx data")]
    TxData,
}

/// Hex decoded bytes of a signed ethereum transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTx(Vec<u8>);

impl RawTx {
    pub fn from_hex(input: &str) -> Result<Self, Error> {
        let input = input.trim();
        let digits = input.strip_prefix("0x").unwrap_or(input);

        hex::decode(digits).change_context(Error::Hex).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn decode(&self) -> Result<DecodedTx, Error> {
        let (tx_type, _) = self.0.split_first().ok_or(report!(Error::Empty))?;

        let tx = match *tx_type {
            ACCESS_LIST_TX_TYPE => {
                decode_access_list(&rlp_fields(&self.0[1..], ACCESS_LIST_FIELD_COUNT)?)
            }
            DYNAMIC_FEE_TX_TYPE => {
                decode_dynamic_fee(&rlp_fields(&self.0[1..], DYNAMIC_FEE_FIELD_COUNT)?)
            }
            prefix if prefix >= 0xc0 => decode_legacy(&rlp_fields(&self.0, LEGACY_FIELD_COUNT)?),
            unknown => bail!(Error::UnsupportedType(unknown)),
        }
        .change_context(Error::Rlp)?;

        ensure!(tx.encode() == self.0, Error::NonCanonical);

        Ok(tx)
    }
}

impl From<Vec<u8>> for RawTx {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxKind {
    Legacy {
        gas_price: U256,
    },
    AccessList {
        chain_id: u64,
        gas_price: U256,
        access_list: AccessList,
    },
    DynamicFee {
        chain_id: u64,
        gas_tip_cap: U256,
        gas_fee_cap: U256,
        access_list: AccessList,
    },
}

impl Display for TxKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TxKind::Legacy { .. } => write!(f, "legacy"),
            TxKind::AccessList { .. } => write!(f, "access_list"),
            TxKind::DynamicFee { .. } => write!(f, "dynamic_fee"),
        }
    }
}

/// A structurally valid ethereum transaction. Nothing about it has been checked beyond
/// its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTx {
    pub kind: TxKind,
    pub nonce: u64,
    pub gas: u64,
    /// Empty for contract creation.
    pub to: Vec<u8>,
    pub value: U256,
    pub data: Vec<u8>,
    /// For typed transactions `v` is the y parity of the signature.
    pub signature: Signature,
}

impl DecodedTx {
    /// The signed encoding of the transaction, the type byte included for typed transactions.
    pub fn encode(&self) -> Vec<u8> {
        self.rlp_encode(true)
    }

    pub fn hash(&self) -> H256 {
        keccak256(self.encode()).into()
    }

    /// The hash the sender signed.
    pub fn sighash(&self) -> H256 {
        keccak256(self.rlp_encode(false)).into()
    }

    /// `None` for legacy transactions signed without replay protection (`v` of 27 or 28).
    pub fn chain_id(&self) -> Option<u64> {
        match self.kind {
            TxKind::Legacy { .. } => self
                .signature
                .v
                .checked_sub(EIP155_V_OFFSET)
                .map(|v| v / 2),
            TxKind::AccessList { chain_id, .. } | TxKind::DynamicFee { chain_id, .. } => {
                Some(chain_id)
            }
        }
    }

    /// The highest price per gas the sender agreed to pay.
    pub fn fee_per_gas(&self) -> U256 {
        match self.kind {
            TxKind::Legacy { gas_price } | TxKind::AccessList { gas_price, .. } => gas_price,
            TxKind::DynamicFee { gas_fee_cap, .. } => gas_fee_cap,
        }
    }

    /// Runs every check that does not need chain state and recovers the sender.
    pub fn validate(self) -> Result<ValidatedTx, Error> {
        ensure!(
            !self.signature.r.is_zero() || !self.signature.s.is_zero(),
            Error::EmptySignature
        );
        ensure!(self.gas != 0, Error::ZeroGas);
        ensure!(i64::try_from(self.gas).is_ok(), Error::GasTooHigh(self.gas));
        ensure!(
            self.to.is_empty() || self.to.len() == ADDRESS_LEN,
            Error::InvalidRecipient(self.to.len())
        );

        if let TxKind::DynamicFee {
            gas_tip_cap,
            gas_fee_cap,
            ..
        } = self.kind
        {
            ensure!(
                gas_tip_cap <= gas_fee_cap,
                Error::TipAboveFeeCap {
                    tip: gas_tip_cap,
                    cap: gas_fee_cap
                }
            );
        }

        let fee = U256::from(self.gas)
            .checked_mul(self.fee_per_gas())
            .filter(|fee| fee.bits() <= 128)
            .map(|fee| fee.as_u128())
            .ok_or(report!(Error::FeeOutOfRange))?;

        ensure!(self.has_valid_v(), Error::InvalidSignature);
        let sender = self
            .signature
            .recover(self.sighash())
            .change_context(Error::InvalidSignature)?;
        let hash = self.hash();

        debug!(tx_hash = ?hash, sender = ?sender, kind = %self.kind, "validated ethereum tx");

        Ok(ValidatedTx {
            tx: self,
            sender,
            hash,
            fee,
        })
    }

    fn has_valid_v(&self) -> bool {
        match self.kind {
            TxKind::Legacy { .. } => {
                UNPROTECTED_V.contains(&self.signature.v) || self.signature.v >= EIP155_V_OFFSET
            }
            TxKind::AccessList { .. } | TxKind::DynamicFee { .. } => self.signature.v <= 1,
        }
    }

    fn rlp_encode(&self, signed: bool) -> Vec<u8> {
        let mut stream = RlpStream::new();
        stream.begin_unbounded_list();

        match &self.kind {
            TxKind::Legacy { gas_price } => {
                stream.append(&self.nonce).append(gas_price).append(&self.gas);
            }
            TxKind::AccessList {
                chain_id,
                gas_price,
                ..
            } => {
                stream
                    .append(chain_id)
                    .append(&self.nonce)
                    .append(gas_price)
                    .append(&self.gas);
            }
            TxKind::DynamicFee {
                chain_id,
                gas_tip_cap,
                gas_fee_cap,
                ..
            } => {
                stream
                    .append(chain_id)
                    .append(&self.nonce)
                    .append(gas_tip_cap)
                    .append(gas_fee_cap)
                    .append(&self.gas);
            }
        }

        stream.append(&self.to).append(&self.value).append(&self.data);

        match &self.kind {
            TxKind::AccessList { access_list, .. } | TxKind::DynamicFee { access_list, .. } => {
                stream.append(access_list);
            }
            TxKind::Legacy { .. } => {}
        }

        match (&self.kind, signed) {
            (_, true) => {
                stream
                    .append(&self.signature.v)
                    .append(&self.signature.r)
                    .append(&self.signature.s);
            }
            (TxKind::Legacy { .. }, false) => {
                if let Some(chain_id) = self.chain_id() {
                    stream.append(&chain_id).append(&0u8).append(&0u8);
                }
            }
            (_, false) => {}
        }

        stream.finalize_unbounded_list();
        let list = stream.out().to_vec();

        match self.kind {
            TxKind::Legacy { .. } => list,
            TxKind::AccessList { .. } => [vec![ACCESS_LIST_TX_TYPE], list].concat(),
            TxKind::DynamicFee { .. } => [vec![DYNAMIC_FEE_TX_TYPE], list].concat(),
        }
    }
}

/// A transaction that passed local validation, together with what validation learned about
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTx {
    pub tx: DecodedTx,
    pub sender: Address,
    pub hash: H256,
    /// `gas × fee per gas` in the smallest unit of the evm denomination
    pub fee: u128,
}

fn rlp_fields(bytes: &[u8], expected: usize) -> Result<Rlp<'_>, Error> {
    let rlp = Rlp::new(bytes);

    ensure!(rlp.is_list(), Error::Rlp);
    let payload = rlp.payload_info().change_context(Error::Rlp)?;
    ensure!(payload.total() == bytes.len(), Error::Rlp);

    let actual = rlp.item_count().change_context(Error::Rlp)?;
    ensure!(actual == expected, Error::FieldCount { expected, actual });

    Ok(rlp)
}

fn decode_legacy(rlp: &Rlp) -> std::result::Result<DecodedTx, DecoderError> {
    Ok(DecodedTx {
        kind: TxKind::Legacy {
            gas_price: rlp.val_at(1)?,
        },
        nonce: rlp.val_at(0)?,
        gas: rlp.val_at(2)?,
        to: rlp.val_at(3)?,
        value: rlp.val_at(4)?,
        data: rlp.val_at(5)?,
        signature: Signature {
            v: rlp.val_at(6)?,
            r: rlp.val_at(7)?,
            s: rlp.val_at(8)?,
        },
    })
}

fn decode_access_list(rlp: &Rlp) -> std::result::Result<DecodedTx, DecoderError> {
    Ok(DecodedTx {
        kind: TxKind::AccessList {
            chain_id: rlp.val_at(0)?,
            gas_price: rlp.val_at(2)?,
            access_list: rlp.val_at(7)?,
        },
        nonce: rlp.val_at(1)?,
        gas: rlp.val_at(3)?,
        to: rlp.val_at(4)?,
        value: rlp.val_at(5)?,
        data: rlp.val_at(6)?,
        signature: Signature {
            v: rlp.val_at(8)?,
            r: rlp.val_at(9)?,
            s: rlp.val_at(10)?,
        },
    })
}

fn decode_dynamic_fee(rlp: &Rlp) -> std::result::Result<DecodedTx, DecoderError> {
    Ok(DecodedTx {
        kind: TxKind::DynamicFee {
            chain_id: rlp.val_at(0)?,
            gas_tip_cap: rlp.val_at(2)?,
            gas_fee_cap: rlp.val_at(3)?,
            access_list: rlp.val_at(8)?,
        },
        nonce: rlp.val_at(1)?,
        gas: rlp.val_at(4)?,
        to: rlp.val_at(5)?,
        value: rlp.val_at(6)?,
        data: rlp.val_at(7)?,
        signature: Signature {
            v: rlp.val_at(9)?,
            r: rlp.val_at(10)?,
            s: rlp.val_at(11)?,
        },
    })
}
