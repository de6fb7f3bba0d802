use error_stack::Result;
use tracing::info;

use crate::commands::{fee, signer, stdio_bridge, SignerArgs};
use crate::config::Config;
use crate::evm::MsgDeleteMappingEvmAddress;
use crate::{Error, Outcome};

#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    pub signer: SignerArgs,
}

pub async fn run(config: &Config, args: Args) -> Result<Outcome, Error> {
    let signer = signer(config, &args.signer)?;
    let fee = fee(config, &args.signer)?;

    info!(cosmos_address = %signer.address(), "deleting evm address mapping");

    stdio_bridge(config)?
        .submit_signed(
            MsgDeleteMappingEvmAddress::new(signer.address()),
            fee,
            &signer,
            args.signer.broadcast.mode(),
        )
        .await
}
