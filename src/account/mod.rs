//! User accounts and balances
//!
//! Owned by the Users service. [`BalanceService`] is the single writer of
//! account balances; stores are injected behind [`AccountStore`].

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use error::AccountError;
pub use memory::InMemoryAccountStore;
pub use models::{Account, CasOutcome, OpStatus};
pub use postgres::PgAccountStore;
pub use service::BalanceService;
pub use store::AccountStore;
