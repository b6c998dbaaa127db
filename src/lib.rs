//! Order Fulfillment
//!
//! Users, Payment and Order services. The Order service pays for each order
//! with a saga across two stores that share no transaction: a PENDING order
//! record, a balance debit guarded by compare-and-swap and keyed by the
//! order id, then a status flip. A background reconciler settles orders a
//! failed request left PENDING.
//!
//! # Modules
//!
//! - [`core_types`] - Identifier newtypes (UserId, OrderId, OpId)
//! - [`account`] - Accounts, the Account Store and the Balance Service
//! - [`order`] - Orders, admission control, the saga and the reconciler
//! - [`upstream`] - How Order and Payment reach the Users service
//! - [`gateway`] - HTTP routers for the three services
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - PostgreSQL pool and schema

// Core types - must be first!
pub mod core_types;

pub mod account;
pub mod order;
pub mod upstream;

pub mod gateway;

pub mod config;
pub mod db;
pub mod logging;

// Convenient re-exports at crate root
pub use account::{Account, AccountError, BalanceService};
pub use core_types::{Amount, OpId, OrderId, UserId};
pub use order::{Order, OrderError, OrderStatus, OrderWorkflow};
