use ethers_core::types::transaction::eip2930::{AccessList, AccessListItem};
use ethers_core::types::{Address, Signature, H256, U256};
use ethers_core::utils::secret_key_to_address;
use k256::ecdsa::SigningKey;

use super::{DecodedTx, RawTx, TxKind};

pub const CHAIN_ID: u64 = 1;

/// The signed example transaction from EIP-155, signed with [`eip155_signing_key`].
pub const EIP155_TX: &str = "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83";

pub fn eip155_signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x46; 32]).unwrap()
}

pub fn signing_key() -> SigningKey {
    SigningKey::from_slice(&[7; 32]).unwrap()
}

pub fn signer() -> Address {
    secret_key_to_address(&signing_key())
}

pub fn raw(tx: &DecodedTx) -> RawTx {
    RawTx::from(tx.encode())
}

pub fn sign(mut tx: DecodedTx, key: &SigningKey) -> DecodedTx {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(tx.sighash().as_bytes())
        .unwrap();
    let bytes = signature.to_bytes();
    let parity = u64::from(recovery_id.to_byte());

    tx.signature = Signature {
        r: U256::from_big_endian(&bytes[..32]),
        s: U256::from_big_endian(&bytes[32..]),
        v: match tx.kind {
            TxKind::Legacy { .. } => tx.signature.v + parity,
            _ => parity,
        },
    };

    tx
}

fn unsigned(v: u64) -> Signature {
    Signature {
        r: U256::zero(),
        s: U256::zero(),
        v,
    }
}

pub fn access_list() -> AccessList {
    AccessList(vec![AccessListItem {
        address: Address::from_low_u64_be(1),
        storage_keys: vec![H256::from_low_u64_be(1)],
    }])
}

/// Same payload as [`EIP155_TX`], signed with [`signing_key`].
pub fn legacy_tx() -> DecodedTx {
    sign(
        DecodedTx {
            kind: TxKind::Legacy {
                gas_price: U256::from(20_000_000_000u64),
            },
            nonce: 9,
            gas: 21_000,
            to: vec![0x35; 20],
            value: U256::exp10(18),
            data: vec![],
            signature: unsigned(CHAIN_ID * 2 + 35),
        },
        &signing_key(),
    )
}

pub fn access_list_tx() -> DecodedTx {
    sign(
        DecodedTx {
            kind: TxKind::AccessList {
                chain_id: CHAIN_ID,
                gas_price: U256::from(1_000_000_000u64),
                access_list: access_list(),
            },
            nonce: 1,
            gas: 50_000,
            to: Address::from_low_u64_be(1).as_bytes().to_vec(),
            value: U256::zero(),
            data: vec![0xde, 0xad, 0xbe, 0xef],
            signature: unsigned(0),
        },
        &signing_key(),
    )
}

/// A contract creation.
pub fn dynamic_fee_tx() -> DecodedTx {
    sign(
        DecodedTx {
            kind: TxKind::DynamicFee {
                chain_id: CHAIN_ID,
                gas_tip_cap: U256::from(1_000_000_000u64),
                gas_fee_cap: U256::from(30_000_000_000u64),
                access_list: AccessList::default(),
            },
            nonce: 0,
            gas: 100_000,
            to: vec![],
            value: U256::from(5),
            data: vec![0x60, 0x80, 0x60, 0x40, 0x52],
            signature: unsigned(0),
        },
        &signing_key(),
    )
}

/// A pre-EIP-155 contract creation, signed without a chain id.
pub fn unprotected_legacy_tx() -> DecodedTx {
    sign(
        DecodedTx {
            kind: TxKind::Legacy {
                gas_price: U256::from(100_000_000_000u64),
            },
            nonce: 0,
            gas: 100_000,
            to: vec![],
            value: U256::zero(),
            data: vec![0x60, 0x80, 0x60, 0x40, 0x52],
            signature: unsigned(27),
        },
        &signing_key(),
    )
}
