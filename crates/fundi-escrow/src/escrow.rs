//! # Escrow Accounts
//!
//! An escrow holds a mission's funds in two sub-balances — labor and
//! materials — blocked at deposit and drawn down by releases until
//! nothing remains.
//!
//! ## States
//!
//! ```text
//! BLOCKED ──▶ PARTIAL ──▶ RELEASED
//!    │           │
//!    │           ├──────▶ REFUNDED
//!    │           │
//!    └───────────┴──────▶ FROZEN ──▶ (dispute decision)
//! ```
//!
//! RELEASED and REFUNDED are terminal. FROZEN blocks every release path
//! until a further arbitration decision arrives.
//!
//! ## Invariants
//!
//! - `labor_released + labor_refunded <= labor_amount`, and the same
//!   for materials. Funds move between buckets, never appear or vanish.
//! - `materials_released + materials_reserved <= materials_amount`:
//!   outstanding voucher face value is reserved at issuance, so two
//!   vouchers can never promise the same centime.
//! - Only [`Escrow::apply_dispute_decision`] moves funds outside the
//!   default release path, and the caller must hold a resolved dispute.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fundi_core::{DisputeId, EscrowId, MissionId, MoneyAmount, MoneyError, Timestamp, UserId};
use fundi_dispute::ArbitrationDecision;

/// Errors from escrow operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EscrowError {
    /// The operation is not valid in the escrow's current state.
    #[error("escrow is {status}: cannot {action}")]
    InvalidState {
        /// Current status.
        status: EscrowStatus,
        /// The rejected action.
        action: &'static str,
    },

    /// A release asked for more than the sub-balance holds.
    #[error("over-release: requested {requested}, available {available}")]
    OverRelease {
        /// Amount requested.
        requested: MoneyAmount,
        /// Amount actually available.
        available: MoneyAmount,
    },

    /// A reservation asked for more than the unreserved materials balance.
    #[error("insufficient materials: requested {requested}, unreserved {available}")]
    InsufficientMaterials {
        /// Amount requested.
        requested: MoneyAmount,
        /// Unreserved materials remaining.
        available: MoneyAmount,
    },

    /// A redemption or un-reservation exceeded the outstanding reservation.
    #[error("reservation underflow: requested {requested}, reserved {reserved}")]
    ReservationUnderflow {
        /// Amount requested.
        requested: MoneyAmount,
        /// Amount currently reserved.
        reserved: MoneyAmount,
    },

    /// Money arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Lifecycle state of an escrow account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    /// Deposited, nothing released yet.
    Blocked,
    /// Some funds released, some remaining.
    Partial,
    /// Fully paid out (terminal).
    Released,
    /// Remaining funds returned to the client (terminal).
    Refunded,
    /// All releases blocked pending a further arbitration decision.
    Frozen,
}

impl EscrowStatus {
    /// Whether no further fund movement is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }

    /// Whether the default release path is open.
    pub fn accepts_release(&self) -> bool {
        matches!(self, Self::Blocked | Self::Partial)
    }

    /// Canonical SCREAMING_SNAKE_CASE name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "BLOCKED",
            Self::Partial => "PARTIAL",
            Self::Released => "RELEASED",
            Self::Refunded => "REFUNDED",
            Self::Frozen => "FROZEN",
        }
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of an escrow state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowTransition {
    /// State before.
    pub from: EscrowStatus,
    /// State after.
    pub to: EscrowStatus,
    /// When the transition happened.
    pub at: Timestamp,
    /// What caused it.
    pub reason: String,
}

/// The fund movements an executed arbitration decision produced.
///
/// The settlement engine turns these into gateway transfers and ledger
/// rows; the escrow itself only moves balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// Amount returning to the client.
    pub refund_to_client: MoneyAmount,
    /// Amount paying out to the artisan.
    pub pay_to_artisan: MoneyAmount,
    /// The escrow's status after execution.
    pub status: EscrowStatus,
}

/// An escrow account holding a mission's blocked funds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    /// Unique identifier.
    pub id: EscrowId,
    /// The mission this escrow settles. One escrow per mission.
    pub mission_id: MissionId,
    /// The paying client.
    pub client_id: UserId,
    /// The artisan being paid.
    pub artisan_id: UserId,
    /// Materials deposited at creation.
    pub materials_amount: MoneyAmount,
    /// Labor deposited at creation.
    pub labor_amount: MoneyAmount,
    /// Materials paid out to suppliers so far.
    pub materials_released: MoneyAmount,
    /// Labor paid out to the artisan so far.
    pub labor_released: MoneyAmount,
    /// Materials returned to the client by a ruling.
    pub materials_refunded: MoneyAmount,
    /// Labor returned to the client by a ruling.
    pub labor_refunded: MoneyAmount,
    /// Outstanding voucher face value, counted against the materials
    /// balance. `materials_released + materials_reserved` never exceeds
    /// `materials_amount`.
    pub materials_reserved: MoneyAmount,
    /// Current lifecycle state.
    pub status: EscrowStatus,
    /// When the deposit was blocked.
    pub created_at: Timestamp,
    /// Bumped on every successful mutation.
    pub version: u64,
    /// Ordered transition history.
    pub transitions: Vec<EscrowTransition>,
}

impl Escrow {
    /// Block a fresh deposit: both sub-balances full, nothing moved.
    pub fn new(
        id: EscrowId,
        mission_id: MissionId,
        client_id: UserId,
        artisan_id: UserId,
        materials: MoneyAmount,
        labor: MoneyAmount,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            mission_id,
            client_id,
            artisan_id,
            materials_amount: materials,
            labor_amount: labor,
            materials_released: MoneyAmount::ZERO,
            labor_released: MoneyAmount::ZERO,
            materials_refunded: MoneyAmount::ZERO,
            labor_refunded: MoneyAmount::ZERO,
            materials_reserved: MoneyAmount::ZERO,
            status: EscrowStatus::Blocked,
            created_at: now,
            version: 0,
            transitions: Vec::new(),
        }
    }

    /// Total deposited at creation.
    pub fn total_amount(&self) -> MoneyAmount {
        // Totals were summed once at creation; re-adding cannot overflow.
        MoneyAmount::from_minor(
            self.materials_amount.minor_units() + self.labor_amount.minor_units(),
        )
    }

    /// Labor not yet released or refunded.
    pub fn labor_remaining(&self) -> MoneyAmount {
        MoneyAmount::from_minor(
            self.labor_amount.minor_units()
                - self.labor_released.minor_units()
                - self.labor_refunded.minor_units(),
        )
    }

    /// Materials not yet released or refunded.
    pub fn materials_remaining(&self) -> MoneyAmount {
        MoneyAmount::from_minor(
            self.materials_amount.minor_units()
                - self.materials_released.minor_units()
                - self.materials_refunded.minor_units(),
        )
    }

    /// Funds not yet released or refunded, across both sub-balances.
    pub fn remaining(&self) -> MoneyAmount {
        MoneyAmount::from_minor(
            self.labor_remaining().minor_units() + self.materials_remaining().minor_units(),
        )
    }

    /// Materials balance not promised to any outstanding voucher.
    pub fn unreserved_materials(&self) -> MoneyAmount {
        // Invariant: reserved <= materials remaining.
        MoneyAmount::from_minor(
            self.materials_remaining().minor_units() - self.materials_reserved.minor_units(),
        )
    }

    /// Pay out labor funds to the artisan.
    ///
    /// Driven by milestone validation. Rejects over-release and any
    /// release while frozen or terminal.
    pub fn release_labor(
        &mut self,
        amount: MoneyAmount,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        self.ensure_release_allowed("release labor")?;
        if amount > self.labor_remaining() {
            return Err(EscrowError::OverRelease {
                requested: amount,
                available: self.labor_remaining(),
            });
        }
        self.labor_released = self.labor_released.checked_add(amount)?;
        self.version += 1;
        self.settle_status(reason, now);
        Ok(())
    }

    /// Reserve materials balance against a voucher about to be issued.
    pub fn reserve_materials(&mut self, amount: MoneyAmount) -> Result<(), EscrowError> {
        self.ensure_release_allowed("reserve materials")?;
        if amount > self.unreserved_materials() {
            return Err(EscrowError::InsufficientMaterials {
                requested: amount,
                available: self.unreserved_materials(),
            });
        }
        self.materials_reserved = self.materials_reserved.checked_add(amount)?;
        self.version += 1;
        Ok(())
    }

    /// Return an unredeemed reservation, on voucher expiry or cancellation.
    ///
    /// Allowed in any state: an expiry sweep may run after the escrow
    /// froze or settled, and returning a reservation moves no funds.
    pub fn unreserve_materials(&mut self, amount: MoneyAmount) -> Result<(), EscrowError> {
        if amount > self.materials_reserved {
            return Err(EscrowError::ReservationUnderflow {
                requested: amount,
                reserved: self.materials_reserved,
            });
        }
        self.materials_reserved = self.materials_reserved.checked_sub(amount)?;
        self.version += 1;
        Ok(())
    }

    /// Pay out reserved materials funds to a supplier.
    ///
    /// Driven by voucher redemption; the amount must already be
    /// reserved, which guarantees the balance covers it.
    pub fn redeem_materials(
        &mut self,
        amount: MoneyAmount,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        self.ensure_release_allowed("redeem materials")?;
        if amount > self.materials_reserved {
            return Err(EscrowError::ReservationUnderflow {
                requested: amount,
                reserved: self.materials_reserved,
            });
        }
        self.materials_reserved = self.materials_reserved.checked_sub(amount)?;
        self.materials_released = self.materials_released.checked_add(amount)?;
        self.version += 1;
        self.settle_status(reason, now);
        Ok(())
    }

    /// Execute a resolved arbitration decision against this escrow.
    ///
    /// The one path that moves funds outside milestone validation and
    /// voucher redemption. The caller is responsible for having passed
    /// the dispute's resolution gate first; a terminal escrow rejects
    /// execution outright, so a replay moves nothing.
    ///
    /// Outstanding voucher reservations are cleared by a fund-moving
    /// ruling: the ruling supersedes any unredeemed voucher, and the
    /// settlement layer cancels those vouchers alongside.
    pub fn apply_dispute_decision(
        &mut self,
        dispute_id: DisputeId,
        decision: ArbitrationDecision,
        now: Timestamp,
    ) -> Result<DecisionOutcome, EscrowError> {
        if self.status.is_terminal() {
            return Err(EscrowError::InvalidState {
                status: self.status,
                action: "execute arbitration decision",
            });
        }
        let reason = format!("dispute {dispute_id}");

        let outcome = match decision {
            ArbitrationDecision::RefundClient => {
                let refund = self.remaining();
                self.labor_refunded = self.labor_refunded.checked_add(self.labor_remaining())?;
                self.materials_refunded = self
                    .materials_refunded
                    .checked_add(self.materials_remaining())?;
                self.materials_reserved = MoneyAmount::ZERO;
                self.record(EscrowStatus::Refunded, &reason, now);
                DecisionOutcome {
                    refund_to_client: refund,
                    pay_to_artisan: MoneyAmount::ZERO,
                    status: EscrowStatus::Refunded,
                }
            }
            ArbitrationDecision::PayArtisan => {
                let payout = self.remaining();
                self.labor_released = self.labor_released.checked_add(self.labor_remaining())?;
                self.materials_released = self
                    .materials_released
                    .checked_add(self.materials_remaining())?;
                self.materials_reserved = MoneyAmount::ZERO;
                self.record(EscrowStatus::Released, &reason, now);
                DecisionOutcome {
                    refund_to_client: MoneyAmount::ZERO,
                    pay_to_artisan: payout,
                    status: EscrowStatus::Released,
                }
            }
            ArbitrationDecision::PartialRefund(refund) => {
                let remaining = self.remaining();
                if refund > remaining {
                    return Err(EscrowError::OverRelease {
                        requested: refund,
                        available: remaining,
                    });
                }
                let to_artisan = remaining.checked_sub(refund)?;
                // The refund draws labor first; sub-balances are fungible
                // once a ruling overrides the default path.
                let labor_refund = refund.min(self.labor_remaining());
                let materials_refund = refund.checked_sub(labor_refund)?;
                self.labor_refunded = self.labor_refunded.checked_add(labor_refund)?;
                self.materials_refunded =
                    self.materials_refunded.checked_add(materials_refund)?;
                self.labor_released =
                    self.labor_released.checked_add(self.labor_remaining())?;
                self.materials_released = self
                    .materials_released
                    .checked_add(self.materials_remaining())?;
                self.materials_reserved = MoneyAmount::ZERO;
                let status = if to_artisan.is_zero() {
                    EscrowStatus::Refunded
                } else {
                    EscrowStatus::Released
                };
                self.record(status, &reason, now);
                DecisionOutcome {
                    refund_to_client: refund,
                    pay_to_artisan: to_artisan,
                    status,
                }
            }
            ArbitrationDecision::FreezeFunds => {
                self.record(EscrowStatus::Frozen, &reason, now);
                DecisionOutcome {
                    refund_to_client: MoneyAmount::ZERO,
                    pay_to_artisan: MoneyAmount::ZERO,
                    status: EscrowStatus::Frozen,
                }
            }
        };
        Ok(outcome)
    }

    fn ensure_release_allowed(&self, action: &'static str) -> Result<(), EscrowError> {
        if self.status.accepts_release() {
            Ok(())
        } else {
            Err(EscrowError::InvalidState {
                status: self.status,
                action,
            })
        }
    }

    /// Update status after a release: RELEASED when drained, PARTIAL
    /// otherwise.
    fn settle_status(&mut self, reason: &str, now: Timestamp) {
        let to = if self.remaining().is_zero() {
            EscrowStatus::Released
        } else {
            EscrowStatus::Partial
        };
        if to != self.status {
            self.record(to, reason, now);
        }
    }

    fn record(&mut self, to: EscrowStatus, reason: &str, now: Timestamp) {
        self.transitions.push(EscrowTransition {
            from: self.status,
            to,
            at: now,
            reason: reason.to_string(),
        });
        self.status = to;
        self.version += 1;
    }
}
