use std::io::{self, Write};

use error_stack::{Result, ResultExt};

use crate::commands::{channel, HeightArgs};
use crate::config::Config;
use crate::query::{EvmGrpcClient, EvmQueryClient};
use crate::{printer, Error, Outcome};

#[derive(clap::Args, Debug)]
pub struct Args {
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
    let response = client
        .params(args.height.height.into())
        .await
        .change_context(Error::RemoteQuery)?;
    printer::print(out, &response)?;

    Ok(Outcome::Completed)
}
