//! In-memory Account Store
//!
//! Each account lives in one `DashMap` entry together with its op ledger, so
//! holding the entry guard makes the op check and the balance CAS atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::error::AccountError;
use super::models::{Account, CasOutcome, OpStatus};
use super::store::AccountStore;
use crate::core_types::{Amount, OpId, UserId};

struct AccountEntry {
    account: Account,
    /// Retained history, never pruned. A VOIDED entry is the only thing
    /// refusing a late debit, and the store cannot know when the last retry
    /// carrying that op id has given up.
    ops: HashMap<OpId, OpStatus>,
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<UserId, AccountEntry>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, account: &Account) -> Result<(), AccountError> {
        match self.accounts.entry(account.user_id.clone()) {
            Entry::Occupied(_) => Err(AccountError::Duplicate(account.user_id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(AccountEntry {
                    account: account.clone(),
                    ops: HashMap::new(),
                });
                Ok(())
            }
        }
    }

    async fn find(&self, user_id: &UserId) -> Result<Option<Account>, AccountError> {
        Ok(self.accounts.get(user_id).map(|e| e.account.clone()))
    }

    async fn conditional_update(
        &self,
        user_id: &UserId,
        expected_balance: Amount,
        new_balance: Amount,
        op_id: Option<&OpId>,
    ) -> Result<CasOutcome, AccountError> {
        let Some(mut entry) = self.accounts.get_mut(user_id) else {
            return Ok(CasOutcome::NotFound);
        };

        if let Some(op_id) = op_id {
            match entry.ops.get(op_id) {
                Some(OpStatus::Applied) => {
                    return Ok(CasOutcome::AlreadyApplied(entry.account.clone()));
                }
                Some(OpStatus::Voided) => return Ok(CasOutcome::Voided),
                None => {}
            }
        }

        if entry.account.balance != expected_balance {
            return Ok(CasOutcome::Conflict {
                current: entry.account.balance,
            });
        }

        entry.account.balance = new_balance;
        if let Some(op_id) = op_id {
            entry.ops.insert(op_id.clone(), OpStatus::Applied);
        }
        Ok(CasOutcome::Updated(entry.account.clone()))
    }

    async fn find_operation(
        &self,
        user_id: &UserId,
        op_id: &OpId,
    ) -> Result<Option<OpStatus>, AccountError> {
        let entry = self
            .accounts
            .get(user_id)
            .ok_or_else(|| AccountError::NotFound(user_id.clone()))?;
        Ok(entry.ops.get(op_id).copied())
    }

    async fn void_operation(
        &self,
        user_id: &UserId,
        op_id: &OpId,
    ) -> Result<OpStatus, AccountError> {
        let mut entry = self
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| AccountError::NotFound(user_id.clone()))?;
        Ok(*entry.ops.entry(op_id.clone()).or_insert(OpStatus::Voided))
    }

    async fn health_check(&self) -> Result<(), AccountError> {
        Ok(())
    }
}
