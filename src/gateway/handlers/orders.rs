//! Order service handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use super::super::state::OrderState;
use super::super::types::{ApiError, ApiResult, OrderRequest};
use crate::core_types::{OrderId, UserId};
use crate::order::{Order, PlaceOrder};

/// Place an order
///
/// Runs the full saga: balance check, admission, PENDING record, debit,
/// status flip. Echoes the request with the generated order id.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = OrderRequest,
    responses(
        (status = 201, description = "Order placed and paid", body = OrderRequest),
        (status = 400, description = "Invalid request", body = super::super::types::ErrorBody),
        (status = 404, description = "Unknown user", body = super::super::types::ErrorBody),
        (status = 409, description = "Balance kept changing", body = super::super::types::ErrorBody),
        (status = 422, description = "Insufficient balance", body = super::super::types::ErrorBody),
        (status = 500, description = "Order could not be confirmed", body = super::super::types::ErrorBody),
        (status = 503, description = "Users service unavailable", body = super::super::types::ErrorBody)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<Arc<OrderState>>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderRequest>)> {
    let Json(req) = payload?;
    let order = state
        .workflow
        .place_order(PlaceOrder {
            user_id: UserId::from(req.user_id.clone()),
            product_name: req.product_name.clone(),
            price: req.price,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderRequest {
            id: order.order_id.to_string(),
            ..req
        }),
    ))
}

/// Persisted order with its saga status
#[utoipa::path(
    get,
    path = "/orders/{order_id}",
    params(("order_id" = String, Path, description = "Order ID (uuid)")),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 400, description = "Malformed order id", body = super::super::types::ErrorBody),
        (status = 404, description = "Unknown order", body = super::super::types::ErrorBody)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<Arc<OrderState>>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<Order>> {
    let order_id: OrderId = order_id
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid order id: {}", order_id)))?;
    let order = state.workflow.get_order(order_id).await?;
    Ok(Json(order))
}
