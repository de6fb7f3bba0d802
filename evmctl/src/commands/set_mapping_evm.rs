use error_stack::Result;
use tracing::info;

use crate::commands::{fee, signer, stdio_bridge, SignerArgs};
use crate::config::Config;
use crate::evm::{EvmPubKey, MsgSetMappingEvmAddress};
use crate::{Error, Outcome};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Base64 encoded compressed secp256k1 public key of the evm account
    pub evm_pubkey: String,
    #[command(flatten)]
    pub signer: SignerArgs,
}

pub async fn run(config: &Config, args: Args) -> Result<Outcome, Error> {
    let pubkey: EvmPubKey = args.evm_pubkey.parse()?;
    let signer = signer(config, &args.signer)?;
    let fee = fee(config, &args.signer)?;

    info!(
        cosmos_address = %signer.address(),
        evm_address = ?pubkey.address(),
        "mapping evm address"
    );

    stdio_bridge(config)?
        .submit_signed(
            MsgSetMappingEvmAddress::new(signer.address(), &pubkey),
            fee,
            &signer,
            args.signer.broadcast.mode(),
        )
        .await
}
