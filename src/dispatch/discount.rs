//! Client side of the coupon/discount gRPC contract (`DiscountProtoService`).
//!
//! Messages are declared with `prost` derives instead of generated code; the
//! field numbers mirror `discount.proto`:
//!
//! ```text
//! service DiscountProtoService {
//!   rpc GetDiscount (GetDiscountRequest) returns (CouponModel);
//!   rpc CreateDiscount (CreateDiscountRequest) returns (CouponModel);
//!   rpc UpdateDiscount (UpdateDiscountRequest) returns (CouponModel);
//!   rpc DeleteDiscount (DeleteDiscountRequest) returns (DeleteDiscountResponse);
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

use crate::routing::DownstreamTarget;

const GET_DISCOUNT: &str = "/DiscountProtoService/GetDiscount";
const CREATE_DISCOUNT: &str = "/DiscountProtoService/CreateDiscount";
const UPDATE_DISCOUNT: &str = "/DiscountProtoService/UpdateDiscount";
const DELETE_DISCOUNT: &str = "/DiscountProtoService/DeleteDiscount";

/// A coupon as exchanged with the discount service. Also the JSON shape
/// returned to gateway clients.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CouponModel {
    #[prost(int32, tag = "1")]
    #[serde(alias = "Id")]
    pub id: i32,
    #[prost(string, tag = "2")]
    #[serde(alias = "ProductName")]
    pub product_name: String,
    #[prost(string, tag = "3")]
    #[serde(alias = "Description")]
    pub description: String,
    #[prost(int32, tag = "4")]
    #[serde(alias = "Amount")]
    pub amount: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDiscountRequest {
    #[prost(string, tag = "1")]
    pub product_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateDiscountRequest {
    #[prost(message, optional, tag = "1")]
    pub coupon: Option<CouponModel>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateDiscountRequest {
    #[prost(message, optional, tag = "1")]
    pub coupon: Option<CouponModel>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteDiscountRequest {
    #[prost(string, tag = "1")]
    pub product_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct DeleteDiscountResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}

/// Per-call parameters.
#[derive(Debug, Clone)]
pub struct RpcCall {
    pub target: DownstreamTarget,
    /// Sent to the server as the gRPC deadline.
    pub deadline: Duration,
    /// Propagated as `x-request-id` metadata.
    pub request_id: Option<String>,
}

/// The four discount operations.
#[async_trait]
pub trait DiscountApi: Send + Sync {
    async fn get_discount(&self, call: &RpcCall, request: GetDiscountRequest) -> Result<CouponModel, Status>;

    async fn create_discount(&self, call: &RpcCall, request: CreateDiscountRequest) -> Result<CouponModel, Status>;

    async fn update_discount(&self, call: &RpcCall, request: UpdateDiscountRequest) -> Result<CouponModel, Status>;

    async fn delete_discount(
        &self,
        call: &RpcCall,
        request: DeleteDiscountRequest,
    ) -> Result<DeleteDiscountResponse, Status>;
}

/// tonic-backed discount client. Keeps one lazily-connected channel per
/// downstream target.
pub struct GrpcDiscountClient {
    channels: DashMap<String, Channel>,
    connect_timeout: Duration,
}

impl GrpcDiscountClient {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            channels: DashMap::new(),
            connect_timeout,
        }
    }

    fn channel(&self, target: &DownstreamTarget) -> Result<Channel, Status> {
        let uri = target.base_uri();
        if let Some(channel) = self.channels.get(&uri) {
            return Ok(channel.clone());
        }

        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| Status::internal(format!("invalid rpc endpoint '{}': {}", uri, e)))?
            .connect_timeout(self.connect_timeout);
        let channel = endpoint.connect_lazy();

        tracing::debug!(endpoint = %uri, "Created gRPC channel");
        self.channels.insert(uri, channel.clone());
        Ok(channel)
    }

    async fn unary<Req, Resp>(&self, call: &RpcCall, path: &'static str, message: Req) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let channel = self.channel(&call.target)?;
        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("service was not ready: {}", e)))?;

        let mut request = tonic::Request::new(message);
        request.set_timeout(call.deadline);
        if let Some(id) = call.request_id.as_deref() {
            if let Ok(value) = id.parse::<MetadataValue<Ascii>>() {
                request.metadata_mut().insert("x-request-id", value);
            }
        }

        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = grpc
            .unary(request, PathAndQuery::from_static(path), codec)
            .await
            .map_err(local_transport_status)?;
        Ok(response.into_inner())
    }
}

/// Statuses produced by the local transport stack (connection refused,
/// reset, DNS) carry a source error and may surface as `Unknown`; those
/// are connectivity problems. Statuses sent by the server never have one.
fn local_transport_status(status: Status) -> Status {
    let local = std::error::Error::source(&status).is_some();
    if local && status.code() == Code::Unknown {
        Status::unavailable(status.message().to_string())
    } else {
        status
    }
}

#[async_trait]
impl DiscountApi for GrpcDiscountClient {
    async fn get_discount(&self, call: &RpcCall, request: GetDiscountRequest) -> Result<CouponModel, Status> {
        self.unary(call, GET_DISCOUNT, request).await
    }

    async fn create_discount(&self, call: &RpcCall, request: CreateDiscountRequest) -> Result<CouponModel, Status> {
        self.unary(call, CREATE_DISCOUNT, request).await
    }

    async fn update_discount(&self, call: &RpcCall, request: UpdateDiscountRequest) -> Result<CouponModel, Status> {
        self.unary(call, UPDATE_DISCOUNT, request).await
    }

    async fn delete_discount(
        &self,
        call: &RpcCall,
        request: DeleteDiscountRequest,
    ) -> Result<DeleteDiscountResponse, Status> {
        self.unary(call, DELETE_DISCOUNT, request).await
    }
}
