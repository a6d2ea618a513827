//! # Material Vouchers
//!
//! A voucher lets an artisan spend part of an escrow's materials
//! balance at an authorized supplier without ever touching the cash.
//! Its face value is reserved against the escrow at issuance and
//! redeemed in one or more partial uses until exhausted, expired, or
//! cancelled.
//!
//! ## States
//!
//! ```text
//! ACTIVE ──▶ PARTIALLY_USED ──▶ USED
//!    │             │
//!    │             ├─────────▶ EXPIRED     (remainder returns to escrow)
//!    │             │
//!    └─────────────┴─────────▶ CANCELLED   (remainder returns to escrow)
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fundi_core::{
    EscrowId, GeoPoint, MoneyAmount, Timestamp, UserId, ValidationId, VoucherId,
};

/// Characters used in voucher codes. No 0/O/1/I — codes are read out
/// loud over the counter.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of the random part of a voucher code.
const CODE_LEN: usize = 8;

/// Errors from voucher redemption and lifecycle operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VoucherError {
    /// The voucher has expired.
    #[error("voucher expired at {expired_at}")]
    Expired {
        /// When it expired.
        expired_at: Timestamp,
    },

    /// The voucher's face value is fully redeemed.
    #[error("voucher is exhausted")]
    Exhausted,

    /// The voucher was cancelled.
    #[error("voucher is cancelled")]
    Cancelled,

    /// The redeeming supplier is not on the voucher's authorized list.
    #[error("supplier {supplier} is not authorized for this voucher")]
    SupplierNotAuthorized {
        /// The rejected supplier.
        supplier: UserId,
    },

    /// The redemption asked for more than remains.
    #[error("redemption of {requested} exceeds remaining {remaining}")]
    AmountExceedsRemaining {
        /// Amount requested.
        requested: MoneyAmount,
        /// Face value still unredeemed.
        remaining: MoneyAmount,
    },

    /// Expiry attempted before the voucher's expiry time.
    #[error("voucher does not expire until {expires_at}")]
    NotYetExpired {
        /// When it expires.
        expires_at: Timestamp,
    },

    /// The voucher is already in a terminal state.
    #[error("voucher is already {status}")]
    AlreadyTerminal {
        /// Current status.
        status: VoucherStatus,
    },
}

/// Lifecycle state of a material voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherStatus {
    /// Issued, nothing redeemed yet.
    Active,
    /// Some face value redeemed, some remaining.
    PartiallyUsed,
    /// Fully redeemed (terminal).
    Used,
    /// Expired with unredeemed value returned to escrow (terminal).
    Expired,
    /// Cancelled with unredeemed value returned to escrow (terminal).
    Cancelled,
}

impl VoucherStatus {
    /// Whether no further redemption is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Used | Self::Expired | Self::Cancelled)
    }

    /// Canonical SCREAMING_SNAKE_CASE name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::PartiallyUsed => "PARTIALLY_USED",
            Self::Used => "USED",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict on a single redemption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// Redemption accepted and funds released.
    Approved,
    /// Redemption accepted but marked for review (e.g., distant supplier).
    Flagged,
    /// Redemption refused; nothing moved.
    Rejected,
}

/// Audit record of one voucher redemption attempt.
///
/// Every attempt is recorded, including rejections — the fraud review
/// trail needs the failures as much as the successes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherValidation {
    /// Unique identifier.
    pub id: ValidationId,
    /// The voucher being redeemed.
    pub voucher_id: VoucherId,
    /// The supplier attempting redemption.
    pub supplier_id: UserId,
    /// The artisan who holds the voucher.
    pub artisan_id: UserId,
    /// Amount requested.
    pub amount_used: MoneyAmount,
    /// Where the artisan's device reported them.
    pub artisan_location: Option<GeoPoint>,
    /// Where the supplier's device reported the redemption.
    pub supplier_location: Option<GeoPoint>,
    /// Haversine distance between the two, when both are known.
    pub distance_meters: Option<f64>,
    /// The verdict.
    pub validation_status: ValidationStatus,
    /// Why, for flagged and rejected attempts.
    pub notes: Option<String>,
    /// When the attempt was made.
    pub validated_at: Timestamp,
}

/// A voucher against an escrow's materials balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialVoucher {
    /// Unique identifier.
    pub id: VoucherId,
    /// The escrow whose materials balance backs this voucher.
    pub escrow_id: EscrowId,
    /// The artisan the voucher was issued to.
    pub artisan_id: UserId,
    /// Redemption code presented at the counter, `MV-XXXXXXXX`.
    pub code: String,
    /// Face value at issuance.
    pub total_amount: MoneyAmount,
    /// Face value redeemed so far. Never exceeds `total_amount`.
    pub used_amount: MoneyAmount,
    /// Suppliers allowed to redeem. Empty means any supplier.
    pub authorized_suppliers: Vec<UserId>,
    /// When the voucher was issued.
    pub created_at: Timestamp,
    /// When unredeemed value returns to the escrow.
    pub expires_at: Timestamp,
    /// Current lifecycle state.
    pub status: VoucherStatus,
}

impl MaterialVoucher {
    /// Issue a voucher with a fresh redemption code.
    ///
    /// The caller reserves `total_amount` against the escrow first.
    pub fn issue(
        escrow_id: EscrowId,
        artisan_id: UserId,
        total_amount: MoneyAmount,
        authorized_suppliers: Vec<UserId>,
        ttl: chrono::Duration,
        now: Timestamp,
    ) -> Self {
        Self {
            id: VoucherId::new(),
            escrow_id,
            artisan_id,
            code: generate_code(),
            total_amount,
            used_amount: MoneyAmount::ZERO,
            authorized_suppliers,
            created_at: now,
            expires_at: now.offset(ttl),
            status: VoucherStatus::Active,
        }
    }

    /// Face value not yet redeemed.
    pub fn remaining(&self) -> MoneyAmount {
        // used_amount <= total_amount always.
        MoneyAmount::from_minor(
            self.total_amount.minor_units() - self.used_amount.minor_units(),
        )
    }

    /// Check a redemption attempt without mutating anything.
    ///
    /// Checks run in a fixed order so the audit trail records the first
    /// failure consistently: lifecycle, expiry, supplier, amount.
    pub fn check_redemption(
        &self,
        supplier: UserId,
        amount: MoneyAmount,
        now: Timestamp,
    ) -> Result<(), VoucherError> {
        match self.status {
            VoucherStatus::Cancelled => return Err(VoucherError::Cancelled),
            VoucherStatus::Expired => {
                return Err(VoucherError::Expired {
                    expired_at: self.expires_at,
                })
            }
            VoucherStatus::Used => return Err(VoucherError::Exhausted),
            VoucherStatus::Active | VoucherStatus::PartiallyUsed => {}
        }
        if now > self.expires_at {
            return Err(VoucherError::Expired {
                expired_at: self.expires_at,
            });
        }
        if !self.authorized_suppliers.is_empty()
            && !self.authorized_suppliers.contains(&supplier)
        {
            return Err(VoucherError::SupplierNotAuthorized { supplier });
        }
        if amount > self.remaining() {
            return Err(VoucherError::AmountExceedsRemaining {
                requested: amount,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Redeem part of the face value.
    pub fn redeem(
        &mut self,
        supplier: UserId,
        amount: MoneyAmount,
        now: Timestamp,
    ) -> Result<(), VoucherError> {
        self.check_redemption(supplier, amount, now)?;
        // check_redemption guarantees amount <= remaining.
        self.used_amount =
            MoneyAmount::from_minor(self.used_amount.minor_units() + amount.minor_units());
        self.status = if self.remaining().is_zero() {
            VoucherStatus::Used
        } else {
            VoucherStatus::PartiallyUsed
        };
        Ok(())
    }

    /// Expire the voucher, returning the unredeemed remainder.
    ///
    /// The caller un-reserves the returned amount on the escrow.
    pub fn expire(&mut self, now: Timestamp) -> Result<MoneyAmount, VoucherError> {
        if self.status.is_terminal() {
            return Err(VoucherError::AlreadyTerminal {
                status: self.status,
            });
        }
        if now <= self.expires_at {
            return Err(VoucherError::NotYetExpired {
                expires_at: self.expires_at,
            });
        }
        let remainder = self.remaining();
        self.status = VoucherStatus::Expired;
        Ok(remainder)
    }

    /// Cancel the voucher, returning the unredeemed remainder.
    pub fn cancel(&mut self) -> Result<MoneyAmount, VoucherError> {
        if self.status.is_terminal() {
            return Err(VoucherError::AlreadyTerminal {
                status: self.status,
            });
        }
        let remainder = self.remaining();
        self.status = VoucherStatus::Cancelled;
        Ok(remainder)
    }
}

/// A fresh `MV-XXXXXXXX` redemption code.
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(3 + CODE_LEN);
    code.push_str("MV-");
    for _ in 0..CODE_LEN {
        let idx = rng.gen_range(0..CODE_ALPHABET.len());
        code.push(CODE_ALPHABET[idx] as char);
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn voucher(total: u64, suppliers: Vec<UserId>) -> MaterialVoucher {
        MaterialVoucher::issue(
            EscrowId::new(),
            UserId::new(),
            MoneyAmount::from_minor(total),
            suppliers,
            chrono::Duration::days(30),
            ts("2026-01-15T12:00:00Z"),
        )
    }

    #[test]
    fn test_code_shape() {
        let v = voucher(50_000, vec![]);
        assert!(v.code.starts_with("MV-"));
        assert_eq!(v.code.len(), 11);
        assert!(v.code[3..].bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_issue_sets_expiry() {
        let v = voucher(50_000, vec![]);
        assert_eq!(v.expires_at, ts("2026-02-14T12:00:00Z"));
        assert_eq!(v.status, VoucherStatus::Active);
        assert_eq!(v.remaining(), v.total_amount);
    }

    #[test]
    fn test_partial_then_full_redemption() {
        let supplier = UserId::new();
        let mut v = voucher(50_000, vec![supplier]);
        v.redeem(supplier, MoneyAmount::from_minor(20_000), ts("2026-01-16T10:00:00Z"))
            .unwrap();
        assert_eq!(v.status, VoucherStatus::PartiallyUsed);
        assert_eq!(v.remaining(), MoneyAmount::from_minor(30_000));

        v.redeem(supplier, MoneyAmount::from_minor(30_000), ts("2026-01-17T10:00:00Z"))
            .unwrap();
        assert_eq!(v.status, VoucherStatus::Used);
        assert!(v.remaining().is_zero());
        assert_eq!(v.used_amount, v.total_amount);
    }

    #[test]
    fn test_redeem_past_remaining_rejected() {
        let supplier = UserId::new();
        let mut v = voucher(100, vec![supplier]);
        let err = v
            .redeem(supplier, MoneyAmount::from_minor(101), ts("2026-01-16T10:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, VoucherError::AmountExceedsRemaining { .. }));
        assert_eq!(v.used_amount, MoneyAmount::ZERO);
    }

    #[test]
    fn test_exhausted_voucher_rejects() {
        let supplier = UserId::new();
        let mut v = voucher(100, vec![supplier]);
        v.redeem(supplier, MoneyAmount::from_minor(100), ts("2026-01-16T10:00:00Z"))
            .unwrap();
        let err = v
            .redeem(supplier, MoneyAmount::from_minor(1), ts("2026-01-16T11:00:00Z"))
            .unwrap_err();
        assert_eq!(err, VoucherError::Exhausted);
    }

    #[test]
    fn test_unauthorized_supplier_rejected() {
        let authorized = UserId::new();
        let stranger = UserId::new();
        let mut v = voucher(50_000, vec![authorized]);
        let err = v
            .redeem(stranger, MoneyAmount::from_minor(100), ts("2026-01-16T10:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, VoucherError::SupplierNotAuthorized { .. }));
    }

    #[test]
    fn test_empty_supplier_list_is_unrestricted() {
        let mut v = voucher(50_000, vec![]);
        assert!(v
            .redeem(UserId::new(), MoneyAmount::from_minor(100), ts("2026-01-16T10:00:00Z"))
            .is_ok());
    }

    #[test]
    fn test_redemption_after_expiry_rejected() {
        let supplier = UserId::new();
        let mut v = voucher(50_000, vec![supplier]);
        let err = v
            .redeem(supplier, MoneyAmount::from_minor(100), ts("2026-02-14T12:00:01Z"))
            .unwrap_err();
        assert!(matches!(err, VoucherError::Expired { .. }));
    }

    #[test]
    fn test_expire_returns_remainder() {
        let supplier = UserId::new();
        let mut v = voucher(50_000, vec![supplier]);
        v.redeem(supplier, MoneyAmount::from_minor(20_000), ts("2026-01-16T10:00:00Z"))
            .unwrap();
        let remainder = v.expire(ts("2026-02-14T12:00:01Z")).unwrap();
        assert_eq!(remainder, MoneyAmount::from_minor(30_000));
        assert_eq!(v.status, VoucherStatus::Expired);
    }

    #[test]
    fn test_expire_before_due_rejected() {
        let mut v = voucher(50_000, vec![]);
        assert!(matches!(
            v.expire(ts("2026-02-01T00:00:00Z")),
            Err(VoucherError::NotYetExpired { .. })
        ));
    }

    #[test]
    fn test_cancel_returns_remainder() {
        let mut v = voucher(50_000, vec![]);
        let remainder = v.cancel().unwrap();
        assert_eq!(remainder, MoneyAmount::from_minor(50_000));
        assert_eq!(v.status, VoucherStatus::Cancelled);
        // Terminal now.
        assert!(matches!(
            v.cancel(),
            Err(VoucherError::AlreadyTerminal { .. })
        ));
    }

    #[test]
    fn test_expire_sweep_is_idempotent() {
        let mut v = voucher(50_000, vec![]);
        v.expire(ts("2026-02-14T12:00:01Z")).unwrap();
        // A second sweep pass finds it terminal and returns nothing.
        assert!(matches!(
            v.expire(ts("2026-02-15T12:00:00Z")),
            Err(VoucherError::AlreadyTerminal { .. })
        ));
    }
}
