//! Order placement
//!
//! The Order service side of the system: the saga that turns a purchase
//! request into a SUCCESS order backed by exactly one debit, and the
//! reconciler that settles orders a failed request left PENDING.

pub mod admission;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod reconciler;
pub mod state;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use admission::{AdmissionPolicy, Decision, SufficientFunds, decide};
pub use error::OrderError;
pub use memory::InMemoryOrderStore;
pub use models::{Order, OrderStatus, PlaceOrder};
pub use postgres::PgOrderStore;
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use state::WorkflowState;
pub use store::OrderStore;
pub use workflow::{OrderWorkflow, WorkflowConfig};
