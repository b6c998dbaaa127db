//! OpenAPI / Swagger UI Documentation
//!
//! One document covers all three services; each service serves it.
//!
//! - Swagger UI: `http://localhost:{port}/docs`
//! - OpenAPI JSON: `http://localhost:{port}/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::account::{Account, OpStatus};
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    AdjustBalanceRequest, CreateUserRequest, ErrorBody, OperationStatusResponse, OrderRequest,
    PaymentRequest,
};
use crate::order::{Order, OrderStatus};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order Fulfillment API",
        version = "1.0.0",
        description = "Users, Payment and Order services. Orders are paid by a saga: PENDING record, guarded keyed debit, status flip.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Users (development)"),
        (url = "http://localhost:8081", description = "Payment (development)"),
        (url = "http://localhost:8082", description = "Order (development)"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::users::create_user,
        crate::gateway::handlers::users::get_user,
        crate::gateway::handlers::users::adjust_balance,
        crate::gateway::handlers::users::get_operation,
        crate::gateway::handlers::users::void_operation,
        crate::gateway::handlers::payment::transfer,
        crate::gateway::handlers::orders::create_order,
        crate::gateway::handlers::orders::get_order,
    ),
    components(
        schemas(
            HealthResponse,
            Account,
            OpStatus,
            CreateUserRequest,
            AdjustBalanceRequest,
            OperationStatusResponse,
            PaymentRequest,
            OrderRequest,
            Order,
            OrderStatus,
            ErrorBody,
        )
    ),
    tags(
        (name = "Users", description = "Accounts and balances (single writer)"),
        (name = "Payments", description = "Balance top-up"),
        (name = "Orders", description = "Order placement and lookup"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_doc_generates() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "Order Fulfillment API");
        assert_eq!(doc.info.version, "1.0.0");
    }

    #[test]
    fn test_endpoints_registered() {
        let doc = ApiDoc::openapi();
        let paths = doc.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/users"));
        assert!(paths.contains_key("/users/{user_id}"));
        assert!(paths.contains_key("/users/{user_id}/operations/{op_id}/void"));
        assert!(paths.contains_key("/payments/transfer/id/{user_id}"));
        assert!(paths.contains_key("/orders"));
        assert!(paths.contains_key("/orders/{order_id}"));
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("payment"));
    }
}
