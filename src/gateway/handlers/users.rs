//! Users service handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use super::super::state::UsersState;
use super::super::types::{
    AdjustBalanceRequest, ApiError, ApiResult, CreateUserRequest, OperationStatusResponse,
};
use crate::account::Account;
use crate::core_types::{OpId, UserId};

/// Register a user with a zero balance
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = Account),
        (status = 400, description = "Missing username or account", body = super::super::types::ErrorBody)
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<Arc<UsersState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let Json(req) = payload?;
    let account = state
        .balances
        .create_account(&req.username, &req.account)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Full user record including balance
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = Account),
        (status = 404, description = "Unknown user", body = super::super::types::ErrorBody)
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<Arc<UsersState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Account>> {
    let account = state.balances.get_balance(&UserId::from(user_id)).await?;
    Ok(Json(account))
}

/// Apply `balance += amount`
///
/// With `expected_balance` this is a single compare-and-swap; with `op_id`
/// it is idempotent.
#[utoipa::path(
    put,
    path = "/users/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    request_body = AdjustBalanceRequest,
    responses(
        (status = 200, description = "Balance adjusted"),
        (status = 400, description = "Zero or malformed amount", body = super::super::types::ErrorBody),
        (status = 404, description = "Unknown user", body = super::super::types::ErrorBody),
        (status = 409, description = "Balance changed since expected_balance was read", body = super::super::types::ErrorBody),
        (status = 410, description = "op_id was voided", body = super::super::types::ErrorBody),
        (status = 422, description = "Insufficient balance", body = super::super::types::ErrorBody)
    ),
    tag = "Users"
)]
pub async fn adjust_balance(
    State(state): State<Arc<UsersState>>,
    Path(user_id): Path<String>,
    payload: Result<Json<AdjustBalanceRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = payload?;
    let op_id = req.op_id.map(OpId::from);
    state
        .balances
        .adjust_balance(
            &UserId::from(user_id),
            req.amount,
            req.expected_balance,
            op_id.as_ref(),
        )
        .await?;
    Ok(StatusCode::OK)
}

/// Recorded outcome of a keyed adjustment
#[utoipa::path(
    get,
    path = "/users/{user_id}/operations/{op_id}",
    params(
        ("user_id" = String, Path, description = "User ID"),
        ("op_id" = String, Path, description = "Operation idempotency key")
    ),
    responses(
        (status = 200, description = "Operation recorded", body = OperationStatusResponse),
        (status = 404, description = "Unknown user or operation", body = super::super::types::ErrorBody)
    ),
    tag = "Users"
)]
pub async fn get_operation(
    State(state): State<Arc<UsersState>>,
    Path((user_id, op_id)): Path<(String, String)>,
) -> ApiResult<Json<OperationStatusResponse>> {
    let op = OpId::from(op_id);
    match state
        .balances
        .operation_status(&UserId::from(user_id), &op)
        .await?
    {
        Some(status) => Ok(Json(OperationStatusResponse {
            op_id: op.to_string(),
            status,
        })),
        None => ApiError::not_found(format!("operation not found: {}", op)).into_err(),
    }
}

/// Fence an op id so a late adjustment carrying it is refused
#[utoipa::path(
    post,
    path = "/users/{user_id}/operations/{op_id}/void",
    params(
        ("user_id" = String, Path, description = "User ID"),
        ("op_id" = String, Path, description = "Operation idempotency key")
    ),
    responses(
        (status = 200, description = "Final status: VOIDED, or APPLIED if the adjustment won", body = OperationStatusResponse),
        (status = 404, description = "Unknown user", body = super::super::types::ErrorBody)
    ),
    tag = "Users"
)]
pub async fn void_operation(
    State(state): State<Arc<UsersState>>,
    Path((user_id, op_id)): Path<(String, String)>,
) -> ApiResult<Json<OperationStatusResponse>> {
    let op = OpId::from(op_id);
    let status = state
        .balances
        .void_operation(&UserId::from(user_id), &op)
        .await?;
    Ok(Json(OperationStatusResponse {
        op_id: op.to_string(),
        status,
    }))
}
