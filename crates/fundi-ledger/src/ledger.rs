//! # The Ledger
//!
//! Append-only store of every fund-movement attempt. `record()` inserts a
//! PENDING row; `mark_completed` / `mark_failed` / `mark_cancelled` are
//! the only later mutations, each applied at most once. Rows are never
//! deleted — the ledger outlives every triggering aggregate and is the
//! durable source of truth for money movement.
//!
//! Webhook and polling reconciliation both resolve rows here, so lookups
//! exist by id, by provider reference, and by the internal reference the
//! engine stashes in metadata when it initiates a transfer.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use fundi_core::{MoneyAmount, Timestamp, TransactionId, UserId};

use crate::transaction::{SignalOutcome, Transaction, TransactionStatus, TransactionType};

/// Metadata key carrying the engine-side reference for a transfer.
pub const INTERNAL_REFERENCE_KEY: &str = "internal_reference";

/// Errors from ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// No row with the given id.
    #[error("transaction {0} not found")]
    NotFound(TransactionId),

    /// Attempted to overwrite an existing provider reference.
    #[error("transaction {id} already has provider reference {existing:?}")]
    ProviderReferenceSet {
        /// The row in question.
        id: TransactionId,
        /// The reference already attached.
        existing: String,
    },

    /// A ledger lock was poisoned by a panicking writer.
    #[error("ledger store lock poisoned")]
    Poisoned,
}

/// Parameters for a new ledger row.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Paying party, if inside the platform.
    pub from_user: Option<UserId>,
    /// Receiving party, if inside the platform.
    pub to_user: Option<UserId>,
    /// Movement amount.
    pub amount: MoneyAmount,
    /// Movement kind.
    pub kind: TransactionType,
    /// Provider reference if already known at insert time.
    pub provider_reference: Option<String>,
    /// Free-form metadata.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Default)]
struct LedgerInner {
    /// Insertion order, for audit exports.
    order: Vec<TransactionId>,
    by_id: HashMap<TransactionId, Transaction>,
    by_provider_ref: HashMap<String, TransactionId>,
}

/// Thread-safe append-only transaction ledger.
#[derive(Default)]
pub struct Ledger {
    inner: RwLock<LedgerInner>,
}

impl Ledger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a PENDING row. Returns a snapshot of the inserted row.
    pub fn record(&self, new: NewTransaction) -> Result<Transaction, LedgerError> {
        let row = Transaction {
            id: TransactionId::new(),
            from_user: new.from_user,
            to_user: new.to_user,
            amount: new.amount,
            kind: new.kind,
            status: TransactionStatus::Pending,
            provider_reference: new.provider_reference.clone(),
            metadata: new.metadata,
            created_at: Timestamp::now(),
            completed_at: None,
            failed_at: None,
            failure_reason: None,
        };
        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;
        if let Some(provider_ref) = &row.provider_reference {
            inner.by_provider_ref.insert(provider_ref.clone(), row.id);
        }
        inner.order.push(row.id);
        inner.by_id.insert(row.id, row.clone());
        Ok(row)
    }

    /// Attach the provider reference once the gateway reports one.
    /// Set-once: a differing second reference is rejected.
    pub fn set_provider_reference(
        &self,
        id: TransactionId,
        provider_ref: &str,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;
        let row = inner.by_id.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        match &row.provider_reference {
            Some(existing) if existing == provider_ref => Ok(()),
            Some(existing) => Err(LedgerError::ProviderReferenceSet {
                id,
                existing: existing.clone(),
            }),
            None => {
                row.provider_reference = Some(provider_ref.to_string());
                inner
                    .by_provider_ref
                    .insert(provider_ref.to_string(), id);
                Ok(())
            }
        }
    }

    /// Apply a completion signal. Duplicate signals are no-ops.
    pub fn mark_completed(
        &self,
        id: TransactionId,
        now: Timestamp,
    ) -> Result<SignalOutcome, LedgerError> {
        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;
        let row = inner.by_id.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        Ok(row.complete(now))
    }

    /// Apply a failure signal. Duplicate signals are no-ops.
    pub fn mark_failed(
        &self,
        id: TransactionId,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<SignalOutcome, LedgerError> {
        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;
        let row = inner.by_id.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        Ok(row.fail(reason, now))
    }

    /// Apply a provider-side cancellation. Duplicate signals are no-ops.
    pub fn mark_cancelled(
        &self,
        id: TransactionId,
        now: Timestamp,
    ) -> Result<SignalOutcome, LedgerError> {
        let mut inner = self.inner.write().map_err(|_| LedgerError::Poisoned)?;
        let row = inner.by_id.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        Ok(row.cancel(now))
    }

    /// Snapshot of a row by id.
    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.inner.read().ok()?.by_id.get(&id).cloned()
    }

    /// Locate a row by the provider-side reference.
    pub fn find_by_provider_reference(&self, provider_ref: &str) -> Option<Transaction> {
        let inner = self.inner.read().ok()?;
        let id = inner.by_provider_ref.get(provider_ref)?;
        inner.by_id.get(id).cloned()
    }

    /// Locate a row by the internal reference stored in metadata.
    ///
    /// Fallback path for providers that echo our reference instead of
    /// their own in webhook payloads.
    pub fn find_by_internal_reference(&self, internal_ref: &str) -> Option<Transaction> {
        let inner = self.inner.read().ok()?;
        inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .find(|row| {
                row.metadata
                    .get(INTERNAL_REFERENCE_KEY)
                    .and_then(|v| v.as_str())
                    == Some(internal_ref)
            })
            .cloned()
    }

    /// PENDING rows created at or before `now - grace`, oldest first.
    /// These are the polling sweep's work list.
    pub fn pending_past_grace(&self, now: Timestamp, grace: chrono::Duration) -> Vec<Transaction> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .filter(|row| {
                row.status == TransactionStatus::Pending
                    && now.seconds_since(row.created_at) >= grace.num_seconds()
            })
            .cloned()
            .collect()
    }

    /// All rows in insertion order.
    pub fn entries(&self) -> Vec<Transaction> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .cloned()
            .collect()
    }

    /// Row count.
    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.order.len()).unwrap_or(0)
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
