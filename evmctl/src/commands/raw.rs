use cosmrs::Denom;
use error_stack::Result;

use crate::commands::{stdio_bridge, BroadcastArgs};
use crate::config::Config;
use crate::report::ResultCompatExt;
use crate::{Error, Outcome};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Signed ethereum transaction, hex encoded RLP with or without 0x
    pub tx_hex: String,
    #[command(flatten)]
    pub broadcast: BroadcastArgs,
    /// Fee denomination of a generated transaction, defaults to the configured one
    #[arg(long, requires = "generate_only")]
    pub fee_denom: Option<String>,
}

pub async fn run(config: &Config, args: Args) -> Result<Outcome, Error> {
    let offline_denom = match args.fee_denom {
        Some(denom) => Some(denom.parse::<Denom>().change_context(Error::InvalidInput)?),
        None => config.offline_evm_denom.clone(),
    };

    stdio_bridge(config)?
        .submit_raw_tx(&args.tx_hex, args.broadcast.mode(), offline_denom)
        .await
}
