use std::time::Duration;

use async_trait::async_trait;
use cosmrs::proto::cosmos::auth::v1beta1::query_client::QueryClient as AuthQueryClient;
use cosmrs::proto::cosmos::auth::v1beta1::{
    BaseAccount, QueryAccountRequest, QueryAccountResponse,
};
use cosmrs::proto::cosmos::tx::v1beta1::service_client::ServiceClient;
use cosmrs::proto::cosmos::tx::v1beta1::{BroadcastTxRequest, BroadcastTxResponse};
use cosmrs::{AccountId, Any};
use error_stack::{report, ResultExt};
use mockall::automock;
use prost::Message;
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tonic::Response;
use url::Url;

use crate::report::ErrorExt;

type Result<T> = error_stack::Result<T, Error>;

const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";
const ETH_ACCOUNT_TYPE_URL: &str = "/ethermint.types.v1.EthAccount";

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to connect to the grpc endpoint")]
    GrpcConnection(#[from] tonic::transport::Error),
    #[error("failed to make the grpc request")]
    GrpcRequest(#[from] tonic::Status),
    #[error("account is missing in the query response")]
    AccountMissing,
    #[error("failed to decode the query response")]
    MalformedResponse,
}

#[automock]
#[async_trait]
pub trait CosmosClient {
    async fn broadcast_tx(&mut self, req: BroadcastTxRequest) -> Result<BroadcastTxResponse>;

    async fn account(&mut self, req: QueryAccountRequest) -> Result<QueryAccountResponse>;
}

#[derive(Clone)]
pub struct CosmosGrpcClient {
    auth: AuthQueryClient<Channel>,
    service: ServiceClient<Channel>,
}

impl CosmosGrpcClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            auth: AuthQueryClient::new(channel.clone()),
            service: ServiceClient::new(channel),
        }
    }
}

#[async_trait]
impl CosmosClient for CosmosGrpcClient {
    async fn broadcast_tx(&mut self, request: BroadcastTxRequest) -> Result<BroadcastTxResponse> {
        self.service
            .broadcast_tx(request)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn account(&mut self, request: QueryAccountRequest) -> Result<QueryAccountResponse> {
        self.auth
            .account(request)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }
}

/// Opens a channel that only connects once the first request is made, so commands that
/// never talk to the node never dial it.
pub fn connect_lazy(url: &Url, timeout: Duration) -> Result<Channel> {
    let endpoint = Endpoint::from_shared(url.to_string()).map_err(ErrorExt::into_report)?;

    Ok(endpoint
        .timeout(timeout)
        .connect_timeout(timeout)
        .connect_lazy())
}

/// Ethermint wraps the base account of evm compatible accounts.
#[derive(Clone, PartialEq, Message)]
struct EthAccount {
    #[prost(message, optional, tag = "1")]
    base_account: Option<BaseAccount>,
    #[prost(string, tag = "2")]
    code_hash: String,
}

pub async fn account<T>(client: &mut T, address: &AccountId) -> Result<BaseAccount>
where
    T: CosmosClient,
{
    client
        .account(QueryAccountRequest {
            address: address.to_string(),
        })
        .await
        .and_then(|res| res.account.ok_or(report!(Error::AccountMissing)))
        .and_then(decode_base_account)
}

fn decode_base_account(account: Any) -> Result<BaseAccount> {
    match account.type_url.as_str() {
        BASE_ACCOUNT_TYPE_URL => {
            BaseAccount::decode(&account.value[..]).change_context(Error::MalformedResponse)
        }
        ETH_ACCOUNT_TYPE_URL => EthAccount::decode(&account.value[..])
            .change_context(Error::MalformedResponse)?
            .base_account
            .ok_or(report!(Error::MalformedResponse)),
        _ => Err(report!(Error::MalformedResponse))
            .attach_printable(format!("unsupported account type {}", account.type_url)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cosmrs::proto::cosmos::auth::v1beta1::{
        BaseAccount, QueryAccountRequest, QueryAccountResponse,
    };
    use cosmrs::{AccountId, Any};
    use mockall::predicate;
    use prost::Message;
    use url::Url;

    use super::{account, connect_lazy, Error, EthAccount, MockCosmosClient};

    fn address() -> AccountId {
        AccountId::new("orai", &[3; 20]).unwrap()
    }

    fn base_account() -> BaseAccount {
        BaseAccount {
            address: address().to_string(),
            pub_key: None,
            account_number: 42,
            sequence: 10,
        }
    }

    fn client_returning(account: Option<Any>) -> MockCosmosClient {
        let mut client = MockCosmosClient::new();
        client
            .expect_account()
            .with(predicate::eq(QueryAccountRequest {
                address: address().to_string(),
            }))
            .return_once(move |_| Ok(QueryAccountResponse { account }));

        client
    }

    #[tokio::test]
    async fn account_decodes_base_accounts() {
        let mut client = client_returning(Some(Any {
            type_url: "/cosmos.auth.v1beta1.BaseAccount".to_string(),
            value: base_account().encode_to_vec(),
        }));

        let actual = account(&mut client, &address()).await;

        assert_eq!(actual.unwrap(), base_account());
    }

    #[tokio::test]
    async fn account_unwraps_eth_accounts() {
        let eth_account = EthAccount {
            base_account: Some(base_account()),
            code_hash: "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
                .to_string(),
        };
        let mut client = client_returning(Some(Any {
            type_url: "/ethermint.types.v1.EthAccount".to_string(),
            value: eth_account.encode_to_vec(),
        }));

        let actual = account(&mut client, &address()).await;

        assert_eq!(actual.unwrap(), base_account());
    }

    #[tokio::test]
    async fn account_account_missing() {
        let mut client = client_returning(None);

        let report = account(&mut client, &address()).await.unwrap_err();

        assert!(matches!(report.current_context(), Error::AccountMissing));
    }

    #[tokio::test]
    async fn account_malformed_response() {
        let mut client = client_returning(Some(Any {
            type_url: "/cosmos.bank.v1beta1.MsgSend".to_string(),
            value: vec![1, 2, 3],
        }));

        let report = account(&mut client, &address()).await.unwrap_err();

        assert!(matches!(report.current_context(), Error::MalformedResponse));
    }

    #[tokio::test]
    async fn connect_lazy_does_not_dial() {
        let url = Url::parse("http://127.0.0.1:1").unwrap();

        assert!(connect_lazy(&url, Duration::from_secs(1)).is_ok());
    }
}
