//! Turns free-form command line strings into the exact forms the evm query and message
//! types expect.

use std::str::FromStr;

use cosmrs::AccountId;
use error_stack::{ensure, report, Result, ResultExt};
use ethers_core::types::{Address, H256};
use ethers_core::utils::to_checksum;

use crate::Error;

const ADDRESS_LEN: usize = 20;
const STORAGE_KEY_LEN: usize = 32;

/// Returns the EIP-55 checksummed hex form of an address given either as 20 hex encoded
/// bytes (with or without `0x`) or as a bech32 account address.
///
/// Mixed-case hex input is treated as checksummed and rejected when the checksum does not
/// match.
pub fn account_to_hex(input: &str) -> Result<String, Error> {
    let input = input.trim();

    let address = match strip_hex_prefix(input) {
        digits if is_hex_address(digits) => {
            let address = Address::from_str(digits)
                .map_err(|_| report!(Error::InvalidAddress(input.to_string())))?;
            ensure!(
                has_valid_checksum(digits, &address),
                Error::InvalidAddress(input.to_string())
            );

            address
        }
        _ => bech32_to_address(input)?,
    };

    Ok(to_checksum(&address, None))
}

/// Left-pads a hex storage key with zero bytes to the 32 byte width of a storage slot.
pub fn format_key_to_hash(input: &str) -> Result<H256, Error> {
    let input = input.trim();
    let digits = strip_hex_prefix(input);

    let bytes = if digits.len() % 2 == 1 {
        hex::decode(format!("0{digits}"))
    } else {
        hex::decode(digits)
    }
    .change_context_lazy(|| Error::InvalidKey(input.to_string()))?;

    ensure!(
        bytes.len() <= STORAGE_KEY_LEN,
        Error::InvalidKey(input.to_string())
    );

    let mut key = H256::zero();
    key.as_bytes_mut()[STORAGE_KEY_LEN.saturating_sub(bytes.len())..].copy_from_slice(&bytes);

    Ok(key)
}

fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

fn is_hex_address(digits: &str) -> bool {
    digits.len() == ADDRESS_LEN.saturating_mul(2) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

fn has_valid_checksum(digits: &str, address: &Address) -> bool {
    let is_mixed_case = digits.chars().any(|c| c.is_ascii_uppercase())
        && digits.chars().any(|c| c.is_ascii_lowercase());

    !is_mixed_case || strip_hex_prefix(&to_checksum(address, None)) == digits
}

fn bech32_to_address(input: &str) -> Result<Address, Error> {
    AccountId::from_str(input)
        .ok()
        .map(|account_id| account_id.to_bytes())
        .filter(|bytes| bytes.len() == ADDRESS_LEN)
        .map(|bytes| Address::from_slice(&bytes))
        .ok_or_else(|| report!(Error::InvalidAddress(input.to_string())))
}
