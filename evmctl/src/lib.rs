use thiserror::Error;

mod bridge;
mod broadcaster;
pub mod commands;
pub mod config;
mod confirm;
mod cosmos;
mod dec_coin;
mod envelope;
mod ethereum;
mod evm;
mod keyring;
mod normalize;
mod printer;
mod query;
mod report;

/// How a command ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The user declined to confirm the transaction, nothing was broadcast.
    Canceled,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is not a valid ethereum or cosmos address")]
    InvalidAddress(String),
    #[error("{0} is not a valid storage key")]
    InvalidKey(String),
    #[error("failed to decode ethereum tx hex bytes")]
    HexDecode,
    #[error("failed to deserialize ethereum tx")]
    Deserialization,
    #[error("ethereum tx failed basic validation")]
    Validation,
    #[error("remote query failed")]
    RemoteQuery,
    #[error("broadcast failed")]
    Broadcast,
    #[error("failed to load config")]
    LoadConfig,
    #[error("connection failed")]
    Connection,
    #[error("keyring failed")]
    Keyring,
    #[error("invalid input")]
    InvalidInput,
    #[error("failed building tx")]
    TxBuilding,
    #[error("failed to write output")]
    Output,
}
