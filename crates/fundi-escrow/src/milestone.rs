//! # Milestone Validation
//!
//! A worksite's labor budget is split into ordered milestones, each
//! released on client validation of the artisan's proof of delivery.
//!
//! ## States
//!
//! ```text
//! PENDING ──▶ SUBMITTED ──▶ VALIDATED
//!                 │
//!                 ├───────▶ AUTO_VALIDATED   (deadline passed)
//!                 │
//!                 └───────▶ CONTESTED        (routes to a dispute)
//! ```
//!
//! Submission starts the auto-validation clock: a client who never
//! responds cannot hold the artisan's payment hostage, so once the
//! window elapses a sweep validates the milestone on their behalf.
//! The proof of delivery is immutable once submitted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fundi_core::{GeoPoint, MilestoneId, MoneyAmount, Timestamp, UserId, WorksiteId};

/// Errors from milestone operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MilestoneError {
    /// The action is not valid from the milestone's current state.
    #[error("milestone is {status}: cannot {action}")]
    InvalidTransition {
        /// Current status.
        status: MilestoneStatus,
        /// The rejected action.
        action: &'static str,
    },

    /// Auto-validation attempted before the window elapsed.
    #[error("auto-validation deadline {deadline} has not passed")]
    DeadlineNotReached {
        /// When the window elapses.
        deadline: Timestamp,
    },
}

/// Lifecycle state of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    /// Work not yet submitted.
    Pending,
    /// Proof submitted, awaiting the client's verdict.
    Submitted,
    /// Validated by the client; payable.
    Validated,
    /// Validated by the engine after the client's window elapsed; payable.
    AutoValidated,
    /// Rejected by the client; resolution moves to a dispute.
    Contested,
}

impl MilestoneStatus {
    /// Whether this state authorizes the labor release.
    pub fn is_payable(&self) -> bool {
        matches!(self, Self::Validated | Self::AutoValidated)
    }

    /// Canonical SCREAMING_SNAKE_CASE name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Validated => "VALIDATED",
            Self::AutoValidated => "AUTO_VALIDATED",
            Self::Contested => "CONTESTED",
        }
    }
}

impl std::fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The artisan's evidence that a milestone is done.
///
/// Immutable once attached to a milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofOfDelivery {
    /// Link to the uploaded photo.
    pub photo_url: String,
    /// Where the proof was captured, when the device provided it.
    pub location: Option<GeoPoint>,
    /// When the proof was captured.
    pub captured_at: Timestamp,
    /// Opaque device context (model, app version) kept for fraud review.
    #[serde(default)]
    pub device_metadata: serde_json::Map<String, serde_json::Value>,
}

/// Record of a milestone state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneTransition {
    /// State before.
    pub from: MilestoneStatus,
    /// State after.
    pub to: MilestoneStatus,
    /// When the transition happened.
    pub at: Timestamp,
}

/// One payable unit of a worksite's labor budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier.
    pub id: MilestoneId,
    /// The worksite this milestone belongs to.
    pub worksite_id: WorksiteId,
    /// Human-readable description ("Foundation poured").
    pub description: String,
    /// Labor released when this milestone validates.
    pub labor_amount: MoneyAmount,
    /// Position in the worksite's payment plan, starting at 1.
    pub sequence_number: u32,
    /// Current lifecycle state.
    pub status: MilestoneStatus,
    /// The artisan's proof, set once at submission.
    pub proof: Option<ProofOfDelivery>,
    /// When submitted, set once at submission.
    pub submitted_at: Option<Timestamp>,
    /// When validation happened, by either path.
    pub validated_at: Option<Timestamp>,
    /// When the client's validation window elapses.
    pub auto_validation_deadline: Option<Timestamp>,
    /// The client who validated, absent for auto-validation.
    pub validated_by: Option<UserId>,
    /// The client's stated reason for contesting.
    pub contest_reason: Option<String>,
    /// Ordered transition history.
    pub transitions: Vec<MilestoneTransition>,
}

impl Milestone {
    /// A pending milestone in a worksite's payment plan.
    pub fn new(
        worksite_id: WorksiteId,
        description: impl Into<String>,
        labor_amount: MoneyAmount,
        sequence_number: u32,
    ) -> Self {
        Self {
            id: MilestoneId::new(),
            worksite_id,
            description: description.into(),
            labor_amount,
            sequence_number,
            status: MilestoneStatus::Pending,
            proof: None,
            submitted_at: None,
            validated_at: None,
            auto_validation_deadline: None,
            validated_by: None,
            contest_reason: None,
            transitions: Vec::new(),
        }
    }

    /// Submit proof of delivery and start the auto-validation clock.
    pub fn submit(
        &mut self,
        proof: ProofOfDelivery,
        window: chrono::Duration,
        now: Timestamp,
    ) -> Result<(), MilestoneError> {
        self.ensure(MilestoneStatus::Pending, "submit")?;
        self.proof = Some(proof);
        self.submitted_at = Some(now);
        self.auto_validation_deadline = Some(now.offset(window));
        self.record(MilestoneStatus::Submitted, now);
        Ok(())
    }

    /// The client validates the work.
    pub fn validate(&mut self, client: UserId, now: Timestamp) -> Result<(), MilestoneError> {
        self.ensure(MilestoneStatus::Submitted, "validate")?;
        self.validated_by = Some(client);
        self.validated_at = Some(now);
        self.record(MilestoneStatus::Validated, now);
        Ok(())
    }

    /// The engine validates on the client's behalf after the window.
    ///
    /// Strictly after: at the deadline second the client can still act.
    pub fn auto_validate(&mut self, now: Timestamp) -> Result<(), MilestoneError> {
        self.ensure(MilestoneStatus::Submitted, "auto-validate")?;
        // Deadline is always set once submitted.
        let deadline = self.auto_validation_deadline.unwrap_or(now);
        if now <= deadline {
            return Err(MilestoneError::DeadlineNotReached { deadline });
        }
        self.validated_at = Some(now);
        self.record(MilestoneStatus::AutoValidated, now);
        Ok(())
    }

    /// The client contests the work. Resolution moves to a dispute.
    pub fn contest(
        &mut self,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), MilestoneError> {
        self.ensure(MilestoneStatus::Submitted, "contest")?;
        self.contest_reason = Some(reason.into());
        self.record(MilestoneStatus::Contested, now);
        Ok(())
    }

    fn ensure(
        &self,
        expected: MilestoneStatus,
        action: &'static str,
    ) -> Result<(), MilestoneError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(MilestoneError::InvalidTransition {
                status: self.status,
                action,
            })
        }
    }

    fn record(&mut self, to: MilestoneStatus, now: Timestamp) {
        self.transitions.push(MilestoneTransition {
            from: self.status,
            to,
            at: now,
        });
        self.status = to;
    }
}
