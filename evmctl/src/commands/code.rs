use std::io::{self, Write};

use error_stack::{Result, ResultExt};
use tracing::debug;

use crate::commands::{channel, HeightArgs};
use crate::config::Config;
use crate::evm::proto::QueryCodeRequest;
use crate::normalize::account_to_hex;
use crate::query::{EvmGrpcClient, EvmQueryClient};
use crate::{printer, Error, Outcome};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Contract address, hex or bech32
    pub address: String,
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
    let request = QueryCodeRequest {
        address: account_to_hex(&args.address)?,
    };
    debug!(address = %request.address, "querying code");

    let response = client
        .code(request, args.height.height.into())
        .await
        .change_context(Error::RemoteQuery)?;
    printer::print(out, &response)?;

    Ok(Outcome::Completed)
}
