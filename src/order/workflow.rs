//! Order Workflow
//!
//! Saga coordinator for one order request:
//!
//! ```text
//! RECEIVED -> BALANCE_CHECKED -> ADMITTED -> ORDER_PERSISTED -> DEBITED -> COMPLETE
//!                  |                             |
//!                  v                             v (conflict: re-read, re-admit)
//!               REJECTED                    BALANCE_CHECKED
//! ```
//!
//! The order is written as PENDING before the debit and flipped to SUCCESS
//! or FAILED afterwards. The debit carries the admission balance as its CAS
//! guard and the order id as its op id, so it can be replayed after an
//! unknown outcome without being applied twice.
//!
//! # Failure after the order exists
//!
//! Once the PENDING record is written, no failure path marks it FAILED until
//! the op id has been voided at the Users service. The void answers the one
//! question that matters: did any of our debit attempts land?
//! - `VOIDED`: no, and none ever will. Order -> FAILED.
//! - `APPLIED`: yes. Order -> SUCCESS, the caller gets the order.
//! - void unreachable: order stays PENDING, caller gets `ConsistencyGap`,
//!   the [`Reconciler`](super::reconciler::Reconciler) settles it later.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::admission::{AdmissionPolicy, Decision, SufficientFunds};
use super::error::OrderError;
use super::models::{Order, OrderStatus, PlaceOrder};
use super::state::WorkflowState;
use super::store::OrderStore;
use crate::account::{Account, OpStatus};
use crate::core_types::{Amount, OrderId, UserId};
use crate::upstream::{Backoff, BalanceClient, UpstreamError, retry_idempotent};

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Debit attempts per order, conflicts and unknown outcomes combined
    pub debit_max_attempts: u32,
    /// Bound on each Order Store call
    pub store_timeout: Duration,
    /// Backoff for idempotent upstream calls (balance reads, voids) and
    /// between replays of a keyed debit
    pub backoff: Backoff,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            debit_max_attempts: 3,
            store_timeout: Duration::from_secs(5),
            backoff: Backoff::default(),
        }
    }
}

pub struct OrderWorkflow {
    balances: Arc<dyn BalanceClient>,
    orders: Arc<dyn OrderStore>,
    policy: Arc<dyn AdmissionPolicy>,
    config: WorkflowConfig,
}

/// Tracks the in-flight state of one request for logging
struct Progress {
    order_ref: String,
    state: WorkflowState,
}

impl Progress {
    fn new(user_id: &UserId) -> Self {
        Self {
            order_ref: format!("user:{}", user_id),
            state: WorkflowState::Received,
        }
    }

    fn advance(&mut self, next: WorkflowState) {
        if !self.state.can_transition_to(next) {
            warn!(
                order = %self.order_ref,
                from = %self.state,
                to = %next,
                "Unexpected workflow transition"
            );
        }
        debug!(order = %self.order_ref, from = %self.state, to = %next, "Workflow step");
        self.state = next;
    }
}

impl OrderWorkflow {
    pub fn new(
        balances: Arc<dyn BalanceClient>,
        orders: Arc<dyn OrderStore>,
        config: WorkflowConfig,
    ) -> Self {
        Self::with_policy(balances, orders, Arc::new(SufficientFunds), config)
    }

    pub fn with_policy(
        balances: Arc<dyn BalanceClient>,
        orders: Arc<dyn OrderStore>,
        policy: Arc<dyn AdmissionPolicy>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            balances,
            orders,
            policy,
            config: WorkflowConfig {
                debit_max_attempts: config.debit_max_attempts.max(1),
                ..config
            },
        }
    }

    /// Run one order request to a single terminal outcome.
    ///
    /// `Ok` means the order is SUCCESS and exactly one debit of its price
    /// was taken. Rejections happen before anything is written.
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order, OrderError> {
        let mut progress = Progress::new(&request.user_id);

        if let Err(e) = Self::validate(&request) {
            progress.advance(WorkflowState::Failed);
            return Err(e);
        }

        let account = match self.read_balance(&request.user_id).await {
            Ok(account) => account,
            Err(e) => {
                progress.advance(WorkflowState::Failed);
                warn!(user_id = %request.user_id, error = ?e, "Balance read failed");
                return Err(e);
            }
        };
        if account.user_id != request.user_id {
            progress.advance(WorkflowState::Failed);
            warn!(
                requested = %request.user_id,
                returned = %account.user_id,
                "Users service returned a different account"
            );
            return Err(OrderError::UserNotFound(request.user_id));
        }
        progress.advance(WorkflowState::BalanceChecked);

        if let Decision::Reject { shortfall } =
            self.policy.decide(request.price, account.balance)
        {
            progress.advance(WorkflowState::Rejected);
            info!(
                user_id = %request.user_id,
                price = request.price,
                balance = account.balance,
                shortfall,
                "Order rejected"
            );
            return Err(OrderError::InsufficientFunds { shortfall });
        }
        progress.advance(WorkflowState::Admitted);

        let order = Order::pending(
            account.user_id.clone(),
            account.account_tag.clone(),
            request.product_name.clone(),
            request.price,
        );
        if let Err(e) = self.bounded(self.orders.insert(&order)).await {
            progress.advance(WorkflowState::Failed);
            error!(order_id = %order.order_id, error = ?e, "Failed to persist order");
            return Err(e);
        }
        progress.order_ref = order.order_id.to_string();
        progress.advance(WorkflowState::OrderPersisted);
        info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            price = order.price,
            "Order persisted as PENDING"
        );

        let result = match self.debit(&order, account.balance, &mut progress).await {
            Ok(()) => {
                progress.advance(WorkflowState::Debited);
                self.commit(&order).await
            }
            Err(cause) => self.abandon(&order, cause).await,
        };

        match &result {
            Ok(_) => {
                if progress.state != WorkflowState::Debited {
                    progress.advance(WorkflowState::Debited);
                }
                progress.advance(WorkflowState::Complete);
            }
            Err(_) => progress.advance(WorkflowState::Failed),
        }
        result
    }

    /// Point lookup for callers observing saga outcomes
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.bounded(self.orders.get(order_id))
            .await?
            .ok_or(OrderError::NotFound(order_id))
    }

    /// Resolve a PENDING order left behind by a failed request.
    ///
    /// Voids the op id and flips the order to the status that answer
    /// implies. Returns the status the order ended in.
    pub async fn settle_pending(&self, order: &Order) -> Result<OrderStatus, OrderError> {
        let op_id = order.op_id();
        let status = match self.void_debit(order).await {
            Ok(status) => status,
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "Void failed while settling");
                return Err(OrderError::UpstreamUnavailable(e.public_detail()));
            }
        };

        let target = match status {
            OpStatus::Applied => OrderStatus::Success,
            OpStatus::Voided => OrderStatus::Failed,
        };
        let reason = (target == OrderStatus::Failed).then_some("debit never applied");
        let flipped = self
            .bounded(self.orders.update_status_if(
                order.order_id,
                OrderStatus::Pending,
                target,
                reason,
            ))
            .await?;

        if flipped {
            info!(order_id = %order.order_id, op_id = %op_id, status = %target, "Pending order settled");
            Ok(target)
        } else {
            // Someone else settled it first
            let current = self.get_order(order.order_id).await?;
            Ok(current.status)
        }
    }

    fn validate(request: &PlaceOrder) -> Result<(), OrderError> {
        if request.user_id.is_empty() {
            return Err(OrderError::Validation("userid is required".into()));
        }
        if request.product_name.trim().is_empty() {
            return Err(OrderError::Validation("product_name is required".into()));
        }
        if request.price <= 0 {
            return Err(OrderError::Validation("price must be positive".into()));
        }
        Ok(())
    }

    async fn read_balance(&self, user_id: &UserId) -> Result<Account, OrderError> {
        retry_idempotent(self.config.backoff, "get_balance", || {
            self.balances.get_balance(user_id)
        })
        .await
        .map_err(|e| match e {
            UpstreamError::NotFound(_) => OrderError::UserNotFound(user_id.clone()),
            other => {
                warn!(user_id = %user_id, error = %other, "Users service read failed");
                OrderError::UpstreamUnavailable(other.public_detail())
            }
        })
    }

    /// Debit the order's price, guarded by the balance admission saw.
    ///
    /// `Ok` only when the Users service confirmed the keyed debit. Every
    /// `Err` is a cause for [`abandon`](Self::abandon), which decides what
    /// actually happened.
    async fn debit(
        &self,
        order: &Order,
        admitted_balance: Amount,
        progress: &mut Progress,
    ) -> Result<(), OrderError> {
        let op_id = order.op_id();
        let max_attempts = self.config.debit_max_attempts;
        let mut observed = admitted_balance;
        let mut attempt = 1;

        loop {
            let outcome = self
                .balances
                .adjust_balance(&order.user_id, -order.price, Some(observed), Some(&op_id))
                .await;

            let err = match outcome {
                Ok(()) => {
                    info!(order_id = %order.order_id, attempt, "Debit confirmed");
                    return Ok(());
                }
                Err(e) => e,
            };

            match err {
                UpstreamError::Conflict(_) => {
                    if attempt >= max_attempts {
                        warn!(order_id = %order.order_id, attempt, "Debit conflicts exhausted");
                        return Err(OrderError::Conflict(format!(
                            "balance changed {} times during debit",
                            attempt
                        )));
                    }
                    let account = self.read_balance(&order.user_id).await?;
                    progress.advance(WorkflowState::BalanceChecked);
                    if let Decision::Reject { shortfall } =
                        self.policy.decide(order.price, account.balance)
                    {
                        info!(
                            order_id = %order.order_id,
                            balance = account.balance,
                            shortfall,
                            "Re-admission refused after conflict"
                        );
                        return Err(OrderError::InsufficientFunds { shortfall });
                    }
                    progress.advance(WorkflowState::Admitted);
                    progress.advance(WorkflowState::OrderPersisted);
                    debug!(
                        order_id = %order.order_id,
                        attempt,
                        expected = observed,
                        actual = account.balance,
                        "Balance moved, retrying debit"
                    );
                    observed = account.balance;
                }
                UpstreamError::InsufficientFunds(_) => {
                    return Err(OrderError::InsufficientFunds {
                        shortfall: (order.price - observed).max(1),
                    });
                }
                UpstreamError::NotFound(_) => {
                    return Err(OrderError::UserNotFound(order.user_id.clone()));
                }
                e if e.is_transient() => {
                    if attempt >= max_attempts {
                        warn!(
                            order_id = %order.order_id,
                            attempt,
                            error = %e,
                            "Debit outcome still unknown after retries"
                        );
                        return Err(OrderError::UpstreamUnavailable(e.public_detail()));
                    }
                    let delay = self.config.backoff.delay(attempt);
                    warn!(
                        order_id = %order.order_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Debit outcome unknown, replaying keyed debit"
                    );
                    tokio::time::sleep(delay).await;
                }
                e => {
                    // Voided or refused outright: this op id will never apply
                    warn!(order_id = %order.order_id, error = %e, "Debit refused");
                    return Err(OrderError::UpstreamUnavailable(e.public_detail()));
                }
            }
            attempt += 1;
        }
    }

    /// Flip PENDING -> SUCCESS after a confirmed debit
    async fn commit(&self, order: &Order) -> Result<Order, OrderError> {
        let flipped = self
            .bounded(self.orders.update_status_if(
                order.order_id,
                OrderStatus::Pending,
                OrderStatus::Success,
                None,
            ))
            .await;

        match flipped {
            Ok(true) => {
                info!(order_id = %order.order_id, "Order SUCCESS");
                Ok(Order {
                    status: OrderStatus::Success,
                    ..order.clone()
                })
            }
            Ok(false) => {
                let current = self.get_order(order.order_id).await.map_err(|e| {
                    OrderError::ConsistencyGap {
                        order_id: order.order_id,
                        detail: format!("{:?}", e),
                    }
                })?;
                if current.status == OrderStatus::Success {
                    Ok(current)
                } else {
                    error!(
                        order_id = %order.order_id,
                        status = %current.status,
                        "CRITICAL: debit applied but order is not SUCCESS"
                    );
                    Err(OrderError::ConsistencyGap {
                        order_id: order.order_id,
                        detail: format!("order is {} after debit", current.status),
                    })
                }
            }
            Err(e) => {
                error!(
                    order_id = %order.order_id,
                    error = ?e,
                    "Debit applied but SUCCESS flip failed, leaving for reconciler"
                );
                Err(OrderError::ConsistencyGap {
                    order_id: order.order_id,
                    detail: format!("{:?}", e),
                })
            }
        }
    }

    /// Resolve a failed debit phase into one terminal outcome
    async fn abandon(&self, order: &Order, cause: OrderError) -> Result<Order, OrderError> {
        match self.void_debit(order).await {
            Ok(OpStatus::Voided) => {
                let reason = cause.to_string();
                match self
                    .bounded(self.orders.update_status_if(
                        order.order_id,
                        OrderStatus::Pending,
                        OrderStatus::Failed,
                        Some(&reason),
                    ))
                    .await
                {
                    Ok(_) => {
                        info!(order_id = %order.order_id, code = cause.code(), "Order FAILED");
                    }
                    Err(e) => {
                        // Op is fenced, so the reconciler can only ever fail it
                        warn!(order_id = %order.order_id, error = ?e, "FAILED flip did not persist");
                    }
                }
                Err(cause)
            }
            Ok(OpStatus::Applied) => {
                info!(
                    order_id = %order.order_id,
                    cause = cause.code(),
                    "Debit landed despite error, completing order"
                );
                self.commit(order).await
            }
            Err(e) => {
                error!(
                    order_id = %order.order_id,
                    cause = ?cause,
                    error = %e,
                    "Could not void debit, order left PENDING"
                );
                Err(OrderError::ConsistencyGap {
                    order_id: order.order_id,
                    detail: format!("{}; void failed: {}", cause, e),
                })
            }
        }
    }

    /// Fence the order's op id. An unknown user cannot have been debited.
    async fn void_debit(&self, order: &Order) -> Result<OpStatus, UpstreamError> {
        let op_id = order.op_id();
        let result = retry_idempotent(self.config.backoff, "void_operation", || {
            self.balances.void_operation(&order.user_id, &op_id)
        })
        .await;

        match result {
            Err(UpstreamError::NotFound(_)) => Ok(OpStatus::Voided),
            other => other,
        }
    }

    /// Bound an Order Store call by the configured timeout
    async fn bounded<T, F>(&self, call: F) -> Result<T, OrderError>
    where
        F: Future<Output = Result<T, OrderError>>,
    {
        tokio::time::timeout(self.config.store_timeout, call)
            .await
            .map_err(|_| OrderError::Persistence("order store timed out".into()))?
    }
}
