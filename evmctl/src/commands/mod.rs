use std::io::{self, StdoutLock};

use clap::Subcommand;
use cosmrs::tx::Fee;
use error_stack::{Result, ResultExt};
use tonic::transport::Channel;

use crate::bridge::{Bridge, Signer};
use crate::config::Config;
use crate::confirm::{Mode, TerminalPrompt};
use crate::cosmos::{self, CosmosGrpcClient};
use crate::keyring::Keyring;
use crate::query::EvmGrpcClient;
use crate::Error;

pub mod code;
pub mod delete_mapping_evm;
pub mod mapped_evm;
pub mod params;
pub mod raw;
pub mod set_mapping_evm;
pub mod storage;

#[derive(Debug, Subcommand)]
pub enum SubCommand {
    /// Querying commands for the evm module
    #[command(subcommand)]
    Query(QueryCommand),
    /// Transaction commands for the evm module
    #[command(subcommand)]
    Tx(TxCommand),
}

#[derive(Debug, Subcommand)]
pub enum QueryCommand {
    /// Get the storage value of an account at a 32 byte key
    Storage(storage::Args),
    /// Get the code of a contract account
    Code(code::Args),
    /// Get the evm module parameters
    Params(params::Args),
    /// Get the evm address mapped to a cosmos address
    MappedEvm(mapped_evm::Args),
}

#[derive(Debug, Subcommand)]
pub enum TxCommand {
    /// Wrap a signed raw ethereum transaction and broadcast it
    Raw(raw::Args),
    /// Map the signer's cosmos address to an evm public key
    SetMappingEvm(set_mapping_evm::Args),
    /// Remove the evm mapping of the signer's cosmos address
    DeleteMappingEvm(delete_mapping_evm::Args),
}

#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct HeightArgs {
    /// Query the state at this block height instead of the latest one
    #[arg(long)]
    pub height: Option<u64>,
}

#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct BroadcastArgs {
    /// Print the unsigned transaction instead of broadcasting it
    #[arg(long)]
    pub generate_only: bool,
    /// Broadcast without asking for confirmation
    #[arg(short = 'y', long = "yes")]
    pub skip_confirmation: bool,
}

impl BroadcastArgs {
    pub fn mode(&self) -> Mode {
        Mode::new(self.generate_only, self.skip_confirmation)
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct SignerArgs {
    /// Name of the keyring key that signs the transaction
    #[arg(long)]
    pub from: String,
    /// Gas limit of the transaction, defaults to the configured one
    #[arg(long)]
    pub gas: Option<u64>,
    #[command(flatten)]
    pub broadcast: BroadcastArgs,
}

type StdioBridge = Bridge<
    EvmGrpcClient,
    CosmosGrpcClient,
    TerminalPrompt<io::StdinLock<'static>, io::StderrLock<'static>>,
    StdoutLock<'static>,
>;

fn channel(config: &Config) -> Result<Channel, Error> {
    cosmos::connect_lazy(&config.grpc, config.grpc_timeout).change_context(Error::Connection)
}

fn stdio_bridge(config: &Config) -> Result<StdioBridge, Error> {
    let channel = channel(config)?;

    Ok(Bridge::builder()
        .query(EvmGrpcClient::new(channel.clone()))
        .cosmos(CosmosGrpcClient::new(channel))
        .prompt(TerminalPrompt::stdio())
        .out(io::stdout().lock())
        .build())
}

fn signer(config: &Config, args: &SignerArgs) -> Result<Signer, Error> {
    let key = Keyring::new(&config.keyring_dir)
        .signing_key(&args.from)
        .change_context(Error::Keyring)?;

    Signer::new(key, &config.address_prefix, config.chain_id.clone())
}

fn fee(config: &Config, args: &SignerArgs) -> Result<Fee, Error> {
    let gas = args.gas.unwrap_or(config.gas_limit);
    let amount = config
        .gas_price
        .fee(gas)
        .change_context(Error::TxBuilding)
        .attach_printable_lazy(|| format!("gas price {}, gas {gas}", config.gas_price))?;

    Ok(Fee::from_amount_and_gas(amount, gas))
}
