//! HTTP-shaped requests translated into discount gRPC calls.
//!
//! # Responsibilities
//! - Map the inbound method onto one of the four discount operations
//! - Pull `productName` from the path, falling back to the query string
//! - Render results as JSON and classify RPC statuses as faults

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde::Serialize;
use tonic::{Code, Status};

use crate::dispatch::discount::{
    CouponModel, CreateDiscountRequest, DeleteDiscountRequest, DiscountApi, GetDiscountRequest, RpcCall,
    UpdateDiscountRequest,
};
use crate::dispatch::envelope::{DownstreamRequest, DownstreamResponse};
use crate::dispatch::fault::{Fault, FaultKind};
use crate::dispatch::Transport;
use crate::routing::{RouteDefinition, RpcService};

const PRODUCT_NAME: &str = "productName";

/// Classify an RPC status.
pub fn fault_from_status(status: &Status) -> Fault {
    let kind = match status.code() {
        Code::NotFound => FaultKind::NotFound,
        Code::InvalidArgument => FaultKind::InvalidArgument,
        Code::Unavailable => FaultKind::Unavailable,
        Code::DeadlineExceeded => FaultKind::Timeout,
        _ => FaultKind::Internal,
    };
    Fault::new(kind).with_message(format!("rpc status {:?}: {}", status.code(), status.message()))
}

/// Transport for `grpc` routes.
#[derive(Clone)]
pub struct RpcTranslator {
    discount: Arc<dyn DiscountApi>,
}

impl RpcTranslator {
    pub fn new(discount: Arc<dyn DiscountApi>) -> Self {
        Self { discount }
    }

    async fn discount_call(&self, call: &RpcCall, request: &DownstreamRequest) -> Result<Vec<u8>, Fault> {
        let method = request.method.clone();
        if method == Method::GET {
            let product_name = product_name(request)?;
            let coupon = self
                .discount
                .get_discount(call, GetDiscountRequest { product_name })
                .await
                .map_err(|s| fault_from_status(&s))?;
            to_json(&coupon)
        } else if method == Method::POST {
            let coupon = coupon_from_body(request)?;
            let coupon = self
                .discount
                .create_discount(call, CreateDiscountRequest { coupon: Some(coupon) })
                .await
                .map_err(|s| fault_from_status(&s))?;
            to_json(&coupon)
        } else if method == Method::PUT {
            let coupon = coupon_from_body(request)?;
            let coupon = self
                .discount
                .update_discount(call, UpdateDiscountRequest { coupon: Some(coupon) })
                .await
                .map_err(|s| fault_from_status(&s))?;
            to_json(&coupon)
        } else if method == Method::DELETE {
            let product_name = product_name(request)?;
            let response = self
                .discount
                .delete_discount(call, DeleteDiscountRequest { product_name })
                .await
                .map_err(|s| fault_from_status(&s))?;
            to_json(&response)
        } else {
            Err(Fault::invalid_argument(format!("method {} has no discount operation", method)))
        }
    }
}

#[async_trait]
impl Transport for RpcTranslator {
    async fn call(
        &self,
        route: &RouteDefinition,
        request: DownstreamRequest,
        timeout: Duration,
    ) -> Result<DownstreamResponse, Fault> {
        let call = RpcCall {
            target: route.target.clone(),
            deadline: timeout,
            request_id: request
                .headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };

        tracing::debug!(
            route = %route.name,
            target = %route.target,
            method = %request.method,
            "Translating to gRPC"
        );

        let body = match route.rpc_service {
            Some(RpcService::Discount) => self.discount_call(&call, &request).await?,
            None => return Err(Fault::internal("route has no rpc service")),
        };

        Ok(DownstreamResponse::json(StatusCode::OK, body))
    }
}

fn product_name(request: &DownstreamRequest) -> Result<String, Fault> {
    request
        .params
        .get_ignore_case(PRODUCT_NAME)
        .map(str::to_string)
        .or_else(|| request.query_param(PRODUCT_NAME))
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| Fault::invalid_argument("productName is required"))
}

/// Parse the coupon body. A missing product name is filled from the path
/// or query when one is present.
fn coupon_from_body(request: &DownstreamRequest) -> Result<CouponModel, Fault> {
    let mut coupon: CouponModel = serde_json::from_slice(&request.body)
        .map_err(|e| Fault::invalid_argument(format!("malformed coupon body: {}", e)))?;
    if coupon.product_name.is_empty() {
        if let Ok(name) = product_name(request) {
            coupon.product_name = name;
        }
    }
    Ok(coupon)
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, Fault> {
    serde_json::to_vec(value).map_err(|e| Fault::internal(format!("failed to encode rpc result: {}", e)))
}
