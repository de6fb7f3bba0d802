use std::io::{self, Write};

use error_stack::{Result, ResultExt};
use tracing::debug;

use crate::commands::{channel, HeightArgs};
use crate::config::Config;
use crate::evm::proto::QueryStorageRequest;
use crate::normalize::{account_to_hex, format_key_to_hash};
use crate::query::{EvmGrpcClient, EvmQueryClient};
use crate::{printer, Error, Outcome};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Account address, hex or bech32
    pub address: String,
    /// Storage key, hex encoded and at most 32 bytes
    pub key: String,
    #[command(flatten)]
    pub height: HeightArgs,
}

pub async fn run(config: &Config, args: Args) -> Result<Outcome, Error> {
    let mut client = EvmGrpcClient::new(channel(config)?);

    query(&mut client, args, &mut io::stdout().lock()).await
}

async fn query<Q, W>(client: &mut Q, args: Args, out: &mut W) -> Result<Outcome, Error>
where
    Q: EvmQueryClient,
    W: Write,
{
    let request = QueryStorageRequest {
        address: account_to_hex(&args.address)?,
        key: format!("{:#x}", format_key_to_hash(&args.key)?),
    };
    debug!(address = %request.address, key = %request.key, "querying storage");

    let response = client
        .storage(request, args.height.height.into())
        .await
        .change_context(Error::RemoteQuery)?;
    printer::print(out, &response)?;

    Ok(Outcome::Completed)
}
