use async_trait::async_trait;
use cosmrs::Denom;
use error_stack::report;
use mockall::automock;
use thiserror::Error;
use tonic::metadata::MetadataValue;
use tonic::transport::Channel;
use tonic::{Request, Response};
use tracing::debug;

use crate::evm::proto::query_client::QueryClient;
use crate::evm::proto::{
    QueryCodeRequest, QueryCodeResponse, QueryMappedEvmAddressRequest,
    QueryMappedEvmAddressResponse, QueryParamsRequest, QueryParamsResponse, QueryStorageRequest,
    QueryStorageResponse,
};
use crate::report::{ErrorExt, ResultCompatExt};

type Result<T> = error_stack::Result<T, Error>;

const BLOCK_HEIGHT_METADATA: &str = "x-cosmos-block-height";

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to make the grpc request")]
    GrpcRequest(#[from] tonic::Status),
    #[error("params are missing in the query response")]
    ParamsMissing,
    #[error("evm denomination {0} is invalid")]
    InvalidDenom(String),
}

/// The state a query reads. Nodes may serve `At` heights from pruned state or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockHeight {
    #[default]
    Latest,
    At(u64),
}

impl From<Option<u64>> for BlockHeight {
    fn from(height: Option<u64>) -> Self {
        height.map_or(BlockHeight::Latest, BlockHeight::At)
    }
}

#[automock]
#[async_trait]
pub trait EvmQueryClient {
    async fn storage(
        &mut self,
        request: QueryStorageRequest,
        height: BlockHeight,
    ) -> Result<QueryStorageResponse>;

    async fn code(
        &mut self,
        request: QueryCodeRequest,
        height: BlockHeight,
    ) -> Result<QueryCodeResponse>;

    async fn params(&mut self, height: BlockHeight) -> Result<QueryParamsResponse>;

    /// Mappings are always read from the latest state.
    async fn mapped_evm_address(
        &mut self,
        request: QueryMappedEvmAddressRequest,
    ) -> Result<QueryMappedEvmAddressResponse>;
}

#[derive(Clone)]
pub struct EvmGrpcClient {
    client: QueryClient<Channel>,
}

impl EvmGrpcClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: QueryClient::new(channel),
        }
    }
}

#[async_trait]
impl EvmQueryClient for EvmGrpcClient {
    async fn storage(
        &mut self,
        request: QueryStorageRequest,
        height: BlockHeight,
    ) -> Result<QueryStorageResponse> {
        self.client
            .storage(at_height(request, height))
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn code(
        &mut self,
        request: QueryCodeRequest,
        height: BlockHeight,
    ) -> Result<QueryCodeResponse> {
        self.client
            .code(at_height(request, height))
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn params(&mut self, height: BlockHeight) -> Result<QueryParamsResponse> {
        self.client
            .params(at_height(QueryParamsRequest {}, height))
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }

    async fn mapped_evm_address(
        &mut self,
        request: QueryMappedEvmAddressRequest,
    ) -> Result<QueryMappedEvmAddressResponse> {
        self.client
            .mapped_evm_address(request)
            .await
            .map(Response::into_inner)
            .map_err(ErrorExt::into_report)
    }
}

fn at_height<T>(message: T, height: BlockHeight) -> Request<T> {
    let mut request = Request::new(message);

    if let BlockHeight::At(height) = height {
        request
            .metadata_mut()
            .insert(BLOCK_HEIGHT_METADATA, MetadataValue::from(height));
    }

    request
}

/// The denomination the evm module charges fees in, read from the latest params.
pub async fn evm_denom<T>(client: &mut T) -> Result<Denom>
where
    T: EvmQueryClient,
{
    let denom = client
        .params(BlockHeight::Latest)
        .await?
        .params
        .ok_or(report!(Error::ParamsMissing))?
        .evm_denom;

    debug!(%denom, "fetched evm denomination");

    denom
        .parse::<Denom>()
        .change_context(Error::InvalidDenom(denom.clone()))
}
