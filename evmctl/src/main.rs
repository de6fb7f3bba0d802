use std::fs::canonicalize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ::config::{Config as cfg, Environment, File, FileFormat, FileSourceFile};
use clap::{Parser, ValueEnum};
use config::ConfigError;
use cosmrs::tendermint::chain::Id;
use error_stack::{Report, ResultExt};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

use evmctl::commands::{
    code, delete_mapping_evm, mapped_evm, params, raw, set_mapping_evm, storage, QueryCommand,
    SubCommand, TxCommand,
};
use evmctl::config::Config;
use evmctl::{Error, Outcome};

const EXIT_CANCELED: u8 = 2;

#[derive(Debug, Parser)]
#[command(version, about = "Query and transact with the evm module of an ethermint chain")]
struct Args {
    /// Set the paths for config file lookup. Can be defined multiple times (configs get merged)
    #[arg(short, long, default_values_os_t = vec![std::path::PathBuf::from("~/.evmctl/config.toml"), std::path::PathBuf::from("config.toml")])]
    pub config: Vec<PathBuf>,

    /// Set the output style of the logs
    #[arg(short, long, value_enum, default_value_t = Output::Text)]
    pub output: Output,

    /// gRPC endpoint of the node, overrides the config
    #[arg(long)]
    pub node: Option<Url>,

    /// Chain id used for signing, overrides the config
    #[arg(long, value_parser = parse_chain_id)]
    pub chain_id: Option<Id>,

    #[clap(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, Clone, Parser, ValueEnum)]
enum Output {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Args = Args::parse();
    set_up_logger(&args.output);

    let mut cfg = init_config(&args.config);
    cfg.keyring_dir = expand_home_dir(&cfg.keyring_dir);
    if let Some(node) = args.node {
        cfg.grpc = node;
    }
    if let Some(chain_id) = args.chain_id {
        cfg.chain_id = chain_id;
    }

    let result = match args.cmd {
        SubCommand::Query(QueryCommand::Storage(args)) => storage::run(&cfg, args).await,
        SubCommand::Query(QueryCommand::Code(args)) => code::run(&cfg, args).await,
        SubCommand::Query(QueryCommand::Params(args)) => params::run(&cfg, args).await,
        SubCommand::Query(QueryCommand::MappedEvm(args)) => mapped_evm::run(&cfg, args).await,
        SubCommand::Tx(TxCommand::Raw(args)) => raw::run(&cfg, args).await,
        SubCommand::Tx(TxCommand::SetMappingEvm(args)) => set_mapping_evm::run(&cfg, args).await,
        SubCommand::Tx(TxCommand::DeleteMappingEvm(args)) => {
            delete_mapping_evm::run(&cfg, args).await
        }
    };

    match result {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::Canceled) => {
            eprintln!("canceled transaction");
            ExitCode::from(EXIT_CANCELED)
        }
        Err(report) => {
            error!(err = ?report.current_context(), "{report:#}");

            // print detailed error report as the last output if in text mode
            if matches!(args.output, Output::Text) {
                eprintln!("{report:?}");
            }

            ExitCode::FAILURE
        }
    }
}

fn parse_chain_id(s: &str) -> Result<Id, String> {
    s.parse().map_err(|_| format!("{s} is not a valid chain id"))
}

fn set_up_logger(output: &Output) {
    // stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match output {
        Output::Json => {
            tracing_subscriber::fmt()
                .json()
                .flatten_event(true)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        Output::Text => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    };
}

fn init_config(config_paths: &[PathBuf]) -> Config {
    let files = find_config_files(config_paths);

    parse_config(files)
        .change_context(Error::LoadConfig)
        .inspect_err(|report| error!(err = ?report.current_context(), "{report}"))
        .unwrap_or_default()
}

fn find_config_files(config: &[PathBuf]) -> Vec<File<FileSourceFile, FileFormat>> {
    let files = config
        .iter()
        .map(expand_home_dir)
        .map(canonicalize)
        .filter_map(Result::ok)
        .inspect(|path| info!("found config file {}", path.to_string_lossy()))
        .map(File::from)
        .collect::<Vec<_>>();

    if files.is_empty() {
        info!("found no config files to load");
    }

    files
}

fn parse_config(
    files: Vec<File<FileSourceFile, FileFormat>>,
) -> error_stack::Result<Config, ConfigError> {
    cfg::builder()
        .add_source(files)
        .add_source(Environment::with_prefix(clap::crate_name!()))
        .build()?
        .try_deserialize::<Config>()
        .map_err(Report::from)
}

fn expand_home_dir(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Ok(home_subfolder) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    dirs::home_dir().map_or(path.to_path_buf(), |home| home.join(home_subfolder))
}
