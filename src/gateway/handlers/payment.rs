//! Payment service handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::info;

use super::super::state::PaymentState;
use super::super::types::{ApiError, ApiResult, PaymentRequest};
use crate::core_types::UserId;

/// Top up a user's balance
///
/// Forwards a credit to the Users service and echoes the request.
#[utoipa::path(
    put,
    path = "/payments/transfer/id/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Balance credited", body = PaymentRequest),
        (status = 400, description = "Amount not positive", body = super::super::types::ErrorBody),
        (status = 404, description = "Unknown user", body = super::super::types::ErrorBody),
        (status = 502, description = "Users service error", body = super::super::types::ErrorBody),
        (status = 503, description = "Users service unreachable", body = super::super::types::ErrorBody)
    ),
    tag = "Payments"
)]
pub async fn transfer(
    State(state): State<Arc<PaymentState>>,
    Path(user_id): Path<String>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> ApiResult<Json<PaymentRequest>> {
    let Json(req) = payload?;
    if req.amount <= 0 {
        return ApiError::bad_request("amount must be positive").into_err();
    }

    let user_id = UserId::from(user_id);
    state
        .users
        .adjust_balance(&user_id, req.amount, None, None)
        .await
        .map_err(ApiError::from_upstream)?;

    info!(user_id = %user_id, amount = req.amount, "Payment credited");
    Ok(Json(req))
}
