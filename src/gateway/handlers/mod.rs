pub mod health;
pub mod orders;
pub mod payment;
pub mod users;

pub use health::{HealthResponse, health_check};
