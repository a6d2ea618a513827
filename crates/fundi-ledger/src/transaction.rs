//! # Ledger Transactions
//!
//! One row per fund-movement attempt. Amount, parties, and type are
//! immutable once inserted; only the status-bearing fields may change,
//! and each at most once. Duplicate settlement signals are no-ops so the
//! webhook and polling paths can race freely.

use serde::{Deserialize, Serialize};

use fundi_core::{MoneyAmount, Timestamp, TransactionId, UserId};

/// The kind of fund movement a ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Client funds blocked into the platform.
    Deposit,
    /// Funds leaving the platform outside escrow flows.
    Withdrawal,
    /// A tranche released from an escrow to a beneficiary.
    EscrowRelease,
    /// Funds returned to the client.
    Refund,
    /// A supplier payout against a material voucher.
    VoucherPurchase,
}

impl TransactionType {
    /// Canonical SCREAMING_SNAKE_CASE name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::EscrowRelease => "ESCROW_RELEASE",
            Self::Refund => "REFUND",
            Self::VoucherPurchase => "VOUCHER_PURCHASE",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Awaiting provider confirmation.
    Pending,
    /// Confirmed by the provider (terminal).
    Completed,
    /// Rejected or failed at the provider (terminal).
    Failed,
    /// Cancelled on the provider side before execution (terminal).
    Cancelled,
}

impl TransactionStatus {
    /// Whether the status accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Canonical SCREAMING_SNAKE_CASE name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying a settlement signal to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The signal transitioned the row.
    Applied,
    /// The row was already terminal; nothing changed.
    Duplicate,
}

impl SignalOutcome {
    /// Whether the signal changed the row.
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// An append-only fund-movement record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique ledger row identifier.
    pub id: TransactionId,
    /// Paying party, when the movement has one inside the platform.
    pub from_user: Option<UserId>,
    /// Receiving party, when the movement has one inside the platform.
    pub to_user: Option<UserId>,
    /// Movement amount in minor units. Immutable.
    pub amount: MoneyAmount,
    /// Movement kind. Immutable.
    pub kind: TransactionType,
    /// Settlement status. Transitions at most once, away from PENDING.
    pub status: TransactionStatus,
    /// Provider-side transaction reference, set once when known.
    pub provider_reference: Option<String>,
    /// Free-form metadata: internal references, commission derivation,
    /// provider payload fragments.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Insertion time.
    pub created_at: Timestamp,
    /// Set by the completion signal.
    pub completed_at: Option<Timestamp>,
    /// Set by the failure/cancellation signal.
    pub failed_at: Option<Timestamp>,
    /// Provider-supplied failure reason, if any.
    pub failure_reason: Option<String>,
}

impl Transaction {
    /// Apply a completion signal. At most once; duplicates are no-ops.
    pub(crate) fn complete(&mut self, now: Timestamp) -> SignalOutcome {
        if self.status.is_terminal() {
            return SignalOutcome::Duplicate;
        }
        self.status = TransactionStatus::Completed;
        self.completed_at = Some(now);
        SignalOutcome::Applied
    }

    /// Apply a failure signal. At most once; duplicates are no-ops.
    pub(crate) fn fail(&mut self, reason: Option<String>, now: Timestamp) -> SignalOutcome {
        if self.status.is_terminal() {
            return SignalOutcome::Duplicate;
        }
        self.status = TransactionStatus::Failed;
        self.failed_at = Some(now);
        self.failure_reason = reason;
        SignalOutcome::Applied
    }

    /// Apply a provider-side cancellation. At most once; duplicates are
    /// no-ops. Callers cannot cancel — only reconciliation reaches this.
    pub(crate) fn cancel(&mut self, now: Timestamp) -> SignalOutcome {
        if self.status.is_terminal() {
            return SignalOutcome::Duplicate;
        }
        self.status = TransactionStatus::Cancelled;
        self.failed_at = Some(now);
        SignalOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_row() -> Transaction {
        Transaction {
            id: TransactionId::new(),
            from_user: None,
            to_user: Some(UserId::new()),
            amount: MoneyAmount::from_minor(20_000),
            kind: TransactionType::EscrowRelease,
            status: TransactionStatus::Pending,
            provider_reference: None,
            metadata: serde_json::Map::new(),
            created_at: Timestamp::now(),
            completed_at: None,
            failed_at: None,
            failure_reason: None,
        }
    }

    #[test]
    fn test_complete_once() {
        let mut t = pending_row();
        assert_eq!(t.complete(Timestamp::now()), SignalOutcome::Applied);
        assert_eq!(t.status, TransactionStatus::Completed);
        assert!(t.completed_at.is_some());
    }

    #[test]
    fn test_complete_twice_is_noop() {
        let mut t = pending_row();
        t.complete(Timestamp::now());
        let first_completed_at = t.completed_at;
        assert_eq!(t.complete(Timestamp::now()), SignalOutcome::Duplicate);
        assert_eq!(t.completed_at, first_completed_at);
    }

    #[test]
    fn test_fail_after_complete_is_noop() {
        let mut t = pending_row();
        t.complete(Timestamp::now());
        assert_eq!(
            t.fail(Some("late failure".into()), Timestamp::now()),
            SignalOutcome::Duplicate
        );
        assert_eq!(t.status, TransactionStatus::Completed);
        assert!(t.failure_reason.is_none());
    }

    #[test]
    fn test_complete_after_fail_is_noop() {
        let mut t = pending_row();
        t.fail(Some("insufficient balance".into()), Timestamp::now());
        assert_eq!(t.complete(Timestamp::now()), SignalOutcome::Duplicate);
        assert_eq!(t.status, TransactionStatus::Failed);
        assert_eq!(t.failure_reason.as_deref(), Some("insufficient balance"));
    }

    #[test]
    fn test_cancel_once() {
        let mut t = pending_row();
        assert_eq!(t.cancel(Timestamp::now()), SignalOutcome::Applied);
        assert_eq!(t.status, TransactionStatus::Cancelled);
        assert_eq!(t.cancel(Timestamp::now()), SignalOutcome::Duplicate);
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionType::EscrowRelease).unwrap(),
            "\"ESCROW_RELEASE\""
        );
    }

    #[test]
    fn test_row_serde_roundtrip() {
        let t = pending_row();
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, t.id);
        assert_eq!(parsed.amount, t.amount);
        assert_eq!(parsed.status, t.status);
    }
}
