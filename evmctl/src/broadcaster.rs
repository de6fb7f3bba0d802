use cosmrs::proto::cosmos::base::abci::v1beta1::TxResponse;
use cosmrs::proto::cosmos::tx::v1beta1::{BroadcastMode, BroadcastTxRequest};
use error_stack::{ensure, report, FutureExt, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::cosmos::CosmosClient;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("failed to broadcast tx")]
    Broadcast,
    #[error("broadcast response is missing")]
    ResponseMissing,
    #[error("tx was rejected with code {code} ({codespace}): {log}")]
    TxNotAccepted {
        code: u32,
        codespace: String,
        log: String,
    },
}

/// What the node reported after accepting a tx into its mempool.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub height: i64,
    pub txhash: String,
    pub code: u32,
    pub codespace: String,
    pub raw_log: String,
    pub gas_wanted: i64,
    pub gas_used: i64,
}

impl From<TxResponse> for Receipt {
    fn from(response: TxResponse) -> Self {
        Self {
            height: response.height,
            txhash: response.txhash,
            code: response.code,
            codespace: response.codespace,
            raw_log: response.raw_log,
            gas_wanted: response.gas_wanted,
            gas_used: response.gas_used,
        }
    }
}

/// Submits the encoded tx once in sync mode, so the result reflects the mempool check only.
pub async fn broadcast<T>(client: &mut T, tx_bytes: Vec<u8>) -> Result<Receipt, Error>
where
    T: CosmosClient,
{
    let request = BroadcastTxRequest {
        tx_bytes,
        mode: BroadcastMode::Sync as i32,
    };

    let response = client
        .broadcast_tx(request)
        .change_context(Error::Broadcast)
        .await?
        .tx_response
        .ok_or(report!(Error::ResponseMissing))?;

    info!(
        tx_hash = response.txhash,
        code = response.code,
        height = response.height,
        "transaction was broadcast"
    );

    ensure!(
        response.code == 0,
        Error::TxNotAccepted {
            code: response.code,
            codespace: response.codespace,
            log: response.raw_log,
        }
    );

    Ok(response.into())
}
