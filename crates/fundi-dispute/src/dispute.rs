//! # Dispute Lifecycle
//!
//! Models disputes over a mission's settlement.
//!
//! ## States
//!
//! ```text
//! OPEN ──▶ IN_MEDIATION ──▶ IN_ARBITRATION ──▶ RESOLVED ──▶ CLOSED
//!   │            │                                 ▲
//!   │            └──────────resolve()──────────────┤
//!   └───────────────────────resolve()──────────────┘
//! ```
//!
//! The OPEN/IN_* → RESOLVED transition is the single gate that
//! authorizes fund movement: it carries the arbitration ruling and fires
//! at most once, so a replayed decision execution finds the dispute
//! already resolved and moves nothing.
//!
//! One exception: a FREEZE_FUNDS ruling leaves the escrow waiting for a
//! further decision, so a frozen resolution may be reopened into
//! arbitration.
//!
//! Mediation is communication only — an ordered append-only message log
//! with no fund effect.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fundi_core::{DisputeId, MissionId, MoneyAmount, Timestamp, UserId};

/// The binding outcome of a resolved arbitration.
///
/// The only path that moves an escrow outside its default lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArbitrationDecision {
    /// Remaining balance returns to the client; escrow REFUNDED.
    RefundClient,
    /// Remaining balance pays out to the artisan; escrow RELEASED.
    PayArtisan,
    /// The given amount refunds to the client, the rest pays the
    /// artisan; escrow status follows the remainder.
    PartialRefund(MoneyAmount),
    /// Escrow FROZEN; releases blocked until a new decision arrives.
    FreezeFunds,
}

/// Lifecycle state of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    /// Filed, not yet in a resolution track.
    Open,
    /// Parties are exchanging mediation messages.
    InMediation,
    /// Escalated to a binding arbitration track.
    InArbitration,
    /// An arbitration ruling has been issued and executed.
    Resolved,
    /// Administratively closed (terminal).
    Closed,
}

impl DisputeStatus {
    /// Whether a ruling may still be issued from this state.
    pub fn accepts_resolution(&self) -> bool {
        matches!(self, Self::Open | Self::InMediation | Self::InArbitration)
    }

    /// Canonical SCREAMING_SNAKE_CASE name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InMediation => "IN_MEDIATION",
            Self::InArbitration => "IN_ARBITRATION",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the dispute is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeKind {
    /// Contested work quality on a milestone.
    Quality,
    /// Worksite delay or abandonment.
    Delay,
    /// Payment disagreement.
    Payment,
    /// Suspected voucher or identity fraud.
    Fraud,
    /// Anything else.
    Other,
}

/// A piece of evidence attached to a dispute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Who submitted it.
    pub submitted_by: UserId,
    /// Short description.
    pub description: String,
    /// Link to the stored artifact (photo, document).
    pub url: String,
    /// When it was attached.
    pub submitted_at: Timestamp,
}

/// One ordered mediation message.
///
/// The log is a sequence keyed by `seq`; it is never reordered or
/// mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediationMessage {
    /// Position in the dispute's mediation log, starting at 0.
    pub seq: u64,
    /// Message author.
    pub author: UserId,
    /// Message body.
    pub body: String,
    /// When the message was appended.
    pub sent_at: Timestamp,
}

/// The binding ruling issued at resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrationRuling {
    /// The arbiter who issued the ruling.
    pub arbiter: UserId,
    /// The decision the settlement engine must execute.
    pub decision: ArbitrationDecision,
    /// Written rationale for the record.
    pub rationale: String,
    /// When the ruling was issued.
    pub decided_at: Timestamp,
}

/// Record of a dispute state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeTransition {
    /// State before.
    pub from: DisputeStatus,
    /// State after.
    pub to: DisputeStatus,
    /// When the transition occurred.
    pub at: Timestamp,
    /// Why.
    pub reason: String,
}

/// Errors from dispute transitions.
#[derive(Error, Debug)]
pub enum DisputeError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid dispute transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// A ruling was already issued; the resolution gate fires once.
    #[error("dispute {dispute_id} is already resolved")]
    AlreadyResolved {
        /// The dispute in question.
        dispute_id: String,
    },

    /// Mediation messages are only accepted while in mediation.
    #[error("dispute {dispute_id} is not in mediation (status {status})")]
    MediationClosed {
        /// The dispute in question.
        dispute_id: String,
        /// Its current status.
        status: String,
    },

    /// Only a FREEZE_FUNDS resolution can be reopened.
    #[error("dispute {dispute_id} resolution cannot be reopened")]
    NotReopenable {
        /// The dispute in question.
        dispute_id: String,
    },
}

/// A dispute over a mission, with its mediation log and eventual ruling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    /// Unique dispute identifier.
    pub id: DisputeId,
    /// The mission (and thus escrow) in question.
    pub mission_id: MissionId,
    /// Who filed the dispute.
    pub reporter_id: UserId,
    /// Who it was filed against.
    pub defendant_id: UserId,
    /// What kind of dispute this is.
    pub kind: DisputeKind,
    /// Free-text description from the reporter.
    pub description: String,
    /// Attached evidence, append-only.
    pub evidence: Vec<Evidence>,
    /// Current lifecycle state.
    pub status: DisputeStatus,
    /// Ordered append-only mediation log.
    pub mediation_log: Vec<MediationMessage>,
    /// The binding ruling, once resolved.
    pub ruling: Option<ArbitrationRuling>,
    /// When the dispute was filed.
    pub created_at: Timestamp,
    /// When it was resolved, if it has been.
    pub resolved_at: Option<Timestamp>,
    /// Ordered log of state transitions.
    pub transitions: Vec<DisputeTransition>,
}

impl Dispute {
    /// File a new dispute in the OPEN state.
    pub fn file(
        mission_id: MissionId,
        reporter_id: UserId,
        defendant_id: UserId,
        kind: DisputeKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: DisputeId::new(),
            mission_id,
            reporter_id,
            defendant_id,
            kind,
            description: description.into(),
            evidence: Vec::new(),
            status: DisputeStatus::Open,
            mediation_log: Vec::new(),
            ruling: None,
            created_at: Timestamp::now(),
            resolved_at: None,
            transitions: Vec::new(),
        }
    }

    /// Attach evidence. Allowed until the dispute is closed.
    pub fn add_evidence(&mut self, evidence: Evidence) -> Result<(), DisputeError> {
        if self.status == DisputeStatus::Closed {
            return Err(DisputeError::InvalidTransition {
                from: self.status.to_string(),
                to: "evidence".to_string(),
            });
        }
        self.evidence.push(evidence);
        Ok(())
    }

    /// Move into mediation (OPEN → IN_MEDIATION).
    pub fn open_mediation(&mut self, now: Timestamp) -> Result<(), DisputeError> {
        self.require(DisputeStatus::Open, DisputeStatus::InMediation)?;
        self.transition(DisputeStatus::InMediation, now, "mediation opened");
        Ok(())
    }

    /// Append a mediation message. Only while IN_MEDIATION; the log is
    /// ordered and never reordered.
    pub fn append_mediation_message(
        &mut self,
        author: UserId,
        body: impl Into<String>,
        now: Timestamp,
    ) -> Result<&MediationMessage, DisputeError> {
        if self.status != DisputeStatus::InMediation {
            return Err(DisputeError::MediationClosed {
                dispute_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        let seq = self.mediation_log.len() as u64;
        self.mediation_log.push(MediationMessage {
            seq,
            author,
            body: body.into(),
            sent_at: now,
        });
        Ok(self.mediation_log.last().expect("just pushed"))
    }

    /// Escalate to arbitration (OPEN | IN_MEDIATION → IN_ARBITRATION).
    pub fn escalate_to_arbitration(&mut self, now: Timestamp) -> Result<(), DisputeError> {
        if !matches!(self.status, DisputeStatus::Open | DisputeStatus::InMediation) {
            return Err(DisputeError::InvalidTransition {
                from: self.status.to_string(),
                to: DisputeStatus::InArbitration.to_string(),
            });
        }
        self.transition(DisputeStatus::InArbitration, now, "escalated to arbitration");
        Ok(())
    }

    /// Issue the binding ruling (OPEN | IN_* → RESOLVED).
    ///
    /// This is the single gate authorizing fund movement: it fires at
    /// most once. A second call fails `AlreadyResolved` and the caller
    /// must not move funds.
    pub fn resolve(&mut self, ruling: ArbitrationRuling, now: Timestamp) -> Result<(), DisputeError> {
        if !self.status.accepts_resolution() {
            return Err(DisputeError::AlreadyResolved {
                dispute_id: self.id.to_string(),
            });
        }
        self.ruling = Some(ruling);
        self.resolved_at = Some(now);
        self.transition(DisputeStatus::Resolved, now, "arbitration ruling issued");
        Ok(())
    }

    /// Reopen a FREEZE_FUNDS resolution into arbitration so a new
    /// decision can be issued (RESOLVED → IN_ARBITRATION).
    pub fn reopen_frozen(&mut self, now: Timestamp) -> Result<(), DisputeError> {
        let frozen = self.status == DisputeStatus::Resolved
            && self
                .ruling
                .as_ref()
                .is_some_and(|r| r.decision == ArbitrationDecision::FreezeFunds);
        if !frozen {
            return Err(DisputeError::NotReopenable {
                dispute_id: self.id.to_string(),
            });
        }
        self.ruling = None;
        self.resolved_at = None;
        self.transition(DisputeStatus::InArbitration, now, "frozen resolution reopened");
        Ok(())
    }

    /// Administratively close a resolved dispute (RESOLVED → CLOSED).
    pub fn close(&mut self, now: Timestamp) -> Result<(), DisputeError> {
        self.require(DisputeStatus::Resolved, DisputeStatus::Closed)?;
        self.transition(DisputeStatus::Closed, now, "dispute closed");
        Ok(())
    }

    fn require(&self, expected: DisputeStatus, target: DisputeStatus) -> Result<(), DisputeError> {
        if self.status != expected {
            return Err(DisputeError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: DisputeStatus, at: Timestamp, reason: &str) {
        self.transitions.push(DisputeTransition {
            from: self.status,
            to,
            at,
            reason: reason.to_string(),
        });
        self.status = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_dispute() -> Dispute {
        Dispute::file(
            MissionId::new(),
            UserId::new(),
            UserId::new(),
            DisputeKind::Quality,
            "tiles are cracked",
        )
    }

    fn ruling(decision: ArbitrationDecision) -> ArbitrationRuling {
        ArbitrationRuling {
            arbiter: UserId::new(),
            decision,
            rationale: "per inspection report".into(),
            decided_at: Timestamp::now(),
        }
    }

    #[test]
    fn test_new_dispute_is_open() {
        let d = file_dispute();
        assert_eq!(d.status, DisputeStatus::Open);
        assert!(d.ruling.is_none());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut d = file_dispute();
        let now = Timestamp::now();
        d.open_mediation(now).unwrap();
        d.escalate_to_arbitration(now).unwrap();
        d.resolve(ruling(ArbitrationDecision::PayArtisan), now).unwrap();
        d.close(now).unwrap();
        assert_eq!(d.status, DisputeStatus::Closed);
        assert_eq!(d.transitions.len(), 4);
    }

    #[test]
    fn test_resolve_straight_from_open() {
        let mut d = file_dispute();
        d.resolve(ruling(ArbitrationDecision::RefundClient), Timestamp::now())
            .unwrap();
        assert_eq!(d.status, DisputeStatus::Resolved);
        assert!(d.resolved_at.is_some());
    }

    #[test]
    fn test_resolve_twice_fails() {
        let mut d = file_dispute();
        let now = Timestamp::now();
        d.resolve(ruling(ArbitrationDecision::PayArtisan), now).unwrap();
        let err = d
            .resolve(ruling(ArbitrationDecision::RefundClient), now)
            .unwrap_err();
        assert!(matches!(err, DisputeError::AlreadyResolved { .. }));
        // First ruling survives.
        assert_eq!(
            d.ruling.as_ref().unwrap().decision,
            ArbitrationDecision::PayArtisan
        );
    }

    #[test]
    fn test_mediation_log_is_ordered() {
        let mut d = file_dispute();
        let now = Timestamp::now();
        d.open_mediation(now).unwrap();
        let alice = UserId::new();
        let bob = UserId::new();
        d.append_mediation_message(alice, "first", now).unwrap();
        d.append_mediation_message(bob, "second", now).unwrap();
        d.append_mediation_message(alice, "third", now).unwrap();
        let seqs: Vec<u64> = d.mediation_log.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(d.mediation_log[1].body, "second");
    }

    #[test]
    fn test_mediation_rejected_outside_mediation() {
        let mut d = file_dispute();
        let err = d
            .append_mediation_message(UserId::new(), "hello", Timestamp::now())
            .unwrap_err();
        assert!(matches!(err, DisputeError::MediationClosed { .. }));
    }

    #[test]
    fn test_cannot_escalate_resolved() {
        let mut d = file_dispute();
        let now = Timestamp::now();
        d.resolve(ruling(ArbitrationDecision::PayArtisan), now).unwrap();
        assert!(d.escalate_to_arbitration(now).is_err());
    }

    #[test]
    fn test_reopen_only_frozen_resolutions() {
        let now = Timestamp::now();

        let mut frozen = file_dispute();
        frozen
            .resolve(ruling(ArbitrationDecision::FreezeFunds), now)
            .unwrap();
        frozen.reopen_frozen(now).unwrap();
        assert_eq!(frozen.status, DisputeStatus::InArbitration);
        assert!(frozen.ruling.is_none());
        // A new ruling can now be issued.
        frozen
            .resolve(ruling(ArbitrationDecision::RefundClient), now)
            .unwrap();

        let mut paid = file_dispute();
        paid.resolve(ruling(ArbitrationDecision::PayArtisan), now).unwrap();
        assert!(matches!(
            paid.reopen_frozen(now),
            Err(DisputeError::NotReopenable { .. })
        ));
    }

    #[test]
    fn test_close_requires_resolved() {
        let mut d = file_dispute();
        assert!(d.close(Timestamp::now()).is_err());
    }

    #[test]
    fn test_evidence_rejected_after_close() {
        let mut d = file_dispute();
        let now = Timestamp::now();
        d.resolve(ruling(ArbitrationDecision::PayArtisan), now).unwrap();
        d.close(now).unwrap();
        let err = d.add_evidence(Evidence {
            submitted_by: UserId::new(),
            description: "late photo".into(),
            url: "https://cdn.example/p.jpg".into(),
            submitted_at: now,
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_decision_serde() {
        let json = serde_json::to_string(&ArbitrationDecision::PartialRefund(
            MoneyAmount::from_minor(40_000),
        ))
        .unwrap();
        assert_eq!(json, r#"{"PARTIAL_REFUND":40000}"#);
        assert_eq!(
            serde_json::to_string(&ArbitrationDecision::FreezeFunds).unwrap(),
            "\"FREEZE_FUNDS\""
        );
    }

    #[test]
    fn test_dispute_serde_roundtrip() {
        let mut d = file_dispute();
        let now = Timestamp::now();
        d.open_mediation(now).unwrap();
        d.append_mediation_message(UserId::new(), "msg", now).unwrap();
        let json = serde_json::to_string(&d).unwrap();
        let parsed: Dispute = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, d.id);
        assert_eq!(parsed.status, d.status);
        assert_eq!(parsed.mediation_log.len(), 1);
    }
}
