//! Address format rules per chain family.

use crate::{chains::ChainFamily, error::AddressError};
use alloy_primitives::Address;
use std::str::FromStr;

/// Version byte of a TRON mainnet address.
pub const TRON_ADDRESS_VERSION: u8 = 0x41;

/// Leading character of every base58check encoded TRON address.
pub const TRON_ADDRESS_PREFIX: &str = "T";

const TRON_ADDRESS_LEN: usize = 21;

/// Checks that `address` is well formed for `family`.
pub fn validate(family: ChainFamily, address: &str) -> Result<(), AddressError> {
    match family {
        ChainFamily::Tron => validate_tron(address),
        ChainFamily::Evm => validate_evm(address).map(drop),
    }
}

/// Validates a base58check TRON address such as `TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t`.
pub fn validate_tron(address: &str) -> Result<(), AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    if !address.starts_with(TRON_ADDRESS_PREFIX) {
        return Err(AddressError::WrongPrefix {
            address: address.to_string(),
            expected: TRON_ADDRESS_PREFIX,
        });
    }

    let bytes = bs58::decode(address)
        .with_check(Some(TRON_ADDRESS_VERSION))
        .into_vec()
        .map_err(|err| invalid(address, err))?;
    if bytes.len() != TRON_ADDRESS_LEN {
        return Err(invalid(
            address,
            format!("expected {TRON_ADDRESS_LEN} bytes, got {}", bytes.len()),
        ));
    }
    Ok(())
}

/// Validates a `0x` prefixed 20 byte hex address and returns it parsed.
pub fn validate_evm(address: &str) -> Result<Address, AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    if !address.starts_with("0x") {
        return Err(AddressError::WrongPrefix { address: address.to_string(), expected: "0x" });
    }
    Address::from_str(address).map_err(|err| invalid(address, err))
}

fn invalid(address: &str, reason: impl ToString) -> AddressError {
    AddressError::Invalid { address: address.to_string(), reason: reason.to_string() }
}
