//! HTTP surface of the three services
//!
//! Each service gets its own router; [`service_app`] adds what every service
//! carries (health, OpenAPI docs, request logging).

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod state;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use openapi::ApiDoc;
use state::{HealthProbe, OrderState, PaymentState, UsersState};

pub fn users_router(state: Arc<UsersState>) -> Router {
    Router::new()
        .route("/users", post(handlers::users::create_user))
        .route(
            "/users/{user_id}",
            get(handlers::users::get_user).put(handlers::users::adjust_balance),
        )
        .route(
            "/users/{user_id}/operations/{op_id}",
            get(handlers::users::get_operation),
        )
        .route(
            "/users/{user_id}/operations/{op_id}/void",
            post(handlers::users::void_operation),
        )
        .with_state(state)
}

pub fn payment_router(state: Arc<PaymentState>) -> Router {
    Router::new()
        .route(
            "/payments/transfer/id/{user_id}",
            put(handlers::payment::transfer),
        )
        .with_state(state)
}

pub fn order_router(state: Arc<OrderState>) -> Router {
    Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders/{order_id}", get(handlers::orders::get_order))
        .with_state(state)
}

/// Wrap a service router with `/health`, docs and request logging
pub fn service_app(routes: Router, probe: Arc<dyn HealthProbe>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(probe)
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(middleware::request_context))
}

pub fn users_app(state: Arc<UsersState>) -> Router {
    service_app(users_router(state.clone()), state)
}

pub fn payment_app(state: Arc<PaymentState>) -> Router {
    service_app(payment_router(state.clone()), state)
}

pub fn order_app(state: Arc<OrderState>) -> Router {
    service_app(order_router(state.clone()), state)
}

/// Bind and serve until the process exits
pub async fn serve(service: &'static str, addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(service, addr = %listener.local_addr()?, "Service listening");
    axum::serve(listener, app).await
}
