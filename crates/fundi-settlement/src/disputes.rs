//! # Dispute Service
//!
//! Files disputes against missions, runs the mediation log, and
//! executes arbitration rulings. Execution gates on the dispute's own
//! OPEN/IN_* → RESOLVED transition: the transition fires at most once,
//! so a replayed decision fails before any fund moves.

use fundi_core::{DisputeId, EngineError, MissionId, Timestamp, UserId};
use fundi_dispute::{
    ArbitrationDecision, ArbitrationRuling, Dispute, DisputeKind, Evidence, MediationMessage,
};
use fundi_escrow::{DecisionOutcome, EscrowStatus};
use fundi_ledger::{NewTransaction, TransactionType};

use crate::engine::{
    base_metadata, new_internal_reference, Direction, PreparedDispatch, SettlementEngine,
    DISPUTE_KEY, ESCROW_KEY,
};
use crate::error;

impl SettlementEngine {
    /// File a dispute against a mission with an escrow.
    pub fn file_dispute(
        &self,
        mission_id: MissionId,
        reporter_id: UserId,
        defendant_id: UserId,
        kind: DisputeKind,
        description: impl Into<String>,
    ) -> Result<Dispute, EngineError> {
        self.require_eligible(reporter_id)?;
        let mut inner = self.stores.write()?;
        if !inner.escrow_by_mission.contains_key(&mission_id) {
            return Err(EngineError::NotFound(format!(
                "no escrow for mission {mission_id}"
            )));
        }
        let dispute = Dispute::file(mission_id, reporter_id, defendant_id, kind, description);
        inner.disputes.insert(dispute.id, dispute.clone());
        tracing::info!(dispute = %dispute.id, mission = %mission_id, "dispute filed");
        Ok(dispute)
    }

    /// Move a dispute into mediation.
    pub fn open_mediation(&self, dispute_id: DisputeId, now: Timestamp) -> Result<(), EngineError> {
        let mut inner = self.stores.write()?;
        inner
            .dispute_mut(dispute_id)?
            .open_mediation(now)
            .map_err(error::from_dispute)
    }

    /// Append to a dispute's ordered mediation log.
    pub fn post_mediation_message(
        &self,
        dispute_id: DisputeId,
        author: UserId,
        body: impl Into<String>,
        now: Timestamp,
    ) -> Result<MediationMessage, EngineError> {
        self.require_eligible(author)?;
        let mut inner = self.stores.write()?;
        let message = inner
            .dispute_mut(dispute_id)?
            .append_mediation_message(author, body, now)
            .map_err(error::from_dispute)?
            .clone();
        Ok(message)
    }

    /// Escalate a dispute to binding arbitration.
    pub fn escalate_dispute(
        &self,
        dispute_id: DisputeId,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        let mut inner = self.stores.write()?;
        inner
            .dispute_mut(dispute_id)?
            .escalate_to_arbitration(now)
            .map_err(error::from_dispute)
    }

    /// Attach evidence to a dispute.
    pub fn add_dispute_evidence(
        &self,
        dispute_id: DisputeId,
        evidence: Evidence,
    ) -> Result<(), EngineError> {
        let mut inner = self.stores.write()?;
        inner
            .dispute_mut(dispute_id)?
            .add_evidence(evidence)
            .map_err(error::from_dispute)
    }

    /// Issue and execute an arbitration ruling.
    ///
    /// The dispute's resolution transition is the single authorization
    /// gate: it fires at most once, so replaying a decision fails
    /// `StateConflict` with no fund movement. Fund-moving rulings
    /// cancel the escrow's outstanding vouchers — the ruling supersedes
    /// them.
    pub async fn execute_decision(
        &self,
        dispute_id: DisputeId,
        arbiter: UserId,
        decision: ArbitrationDecision,
        rationale: impl Into<String>,
        now: Timestamp,
    ) -> Result<DecisionOutcome, EngineError> {
        self.require_eligible(arbiter)?;
        let (outcome, dispatches) = {
            let mut inner = self.stores.write()?;
            let mission_id = inner
                .disputes
                .get(&dispute_id)
                .ok_or_else(|| EngineError::NotFound(format!("dispute {dispute_id}")))?
                .mission_id;
            let escrow_id = *inner
                .escrow_by_mission
                .get(&mission_id)
                .ok_or_else(|| EngineError::NotFound(format!("no escrow for mission {mission_id}")))?;
            let (client, artisan, remaining, escrow_status) = {
                let e = inner.escrow(escrow_id)?;
                (e.client_id, e.artisan_id, e.remaining(), e.status)
            };
            if escrow_status.is_terminal() {
                return Err(EngineError::StateConflict(format!(
                    "escrow {escrow_id} is {escrow_status}: no decision can execute"
                )));
            }
            if let ArbitrationDecision::PartialRefund(refund) = decision {
                if refund > remaining {
                    return Err(EngineError::StateConflict(format!(
                        "partial refund {refund} exceeds remaining balance {remaining}"
                    )));
                }
            }
            // Payout targets resolve before the gate so a bad wallet
            // fails the request, not the resolved dispute.
            let client_wallet = self.wallet(client)?;
            let client_adapter = self.adapter_for(&client_wallet)?;
            let artisan_wallet = self.wallet(artisan)?;
            let artisan_adapter = self.adapter_for(&artisan_wallet)?;

            // The gate. At most one ruling per dispute.
            inner
                .dispute_mut(dispute_id)?
                .resolve(
                    ArbitrationRuling {
                        arbiter,
                        decision,
                        rationale: rationale.into(),
                        decided_at: now,
                    },
                    now,
                )
                .map_err(error::from_dispute)?;

            let outcome = inner
                .escrow_mut(escrow_id)?
                .apply_dispute_decision(dispute_id, decision, now)
                // Preconditions were checked above; a failure past the
                // gate means dispute and escrow disagree.
                .map_err(|e| EngineError::Consistency(e.to_string()))?;

            if outcome.status != EscrowStatus::Frozen {
                cancel_outstanding_vouchers(&mut inner, escrow_id);
            }

            let mut dispatches = Vec::new();
            if !outcome.refund_to_client.is_zero() {
                let internal_ref = new_internal_reference();
                let mut metadata = base_metadata(client_adapter.provider(), &internal_ref);
                metadata.insert(ESCROW_KEY.into(), escrow_id.to_string().into());
                metadata.insert(DISPUTE_KEY.into(), dispute_id.to_string().into());
                let row = self
                    .ledger
                    .record(NewTransaction {
                        from_user: None,
                        to_user: Some(client),
                        amount: outcome.refund_to_client,
                        kind: TransactionType::Refund,
                        provider_reference: None,
                        metadata,
                    })
                    .map_err(error::from_ledger)?;
                dispatches.push(PreparedDispatch {
                    txn: row.id,
                    adapter: client_adapter,
                    direction: Direction::Refund,
                    request: fundi_gateway::TransferRequest {
                        reference: internal_ref,
                        amount: outcome.refund_to_client,
                        msisdn: client_wallet,
                        note: format!("Fundi refund, dispute {dispute_id}"),
                    },
                });
            }
            if !outcome.pay_to_artisan.is_zero() {
                let internal_ref = new_internal_reference();
                let mut metadata = base_metadata(artisan_adapter.provider(), &internal_ref);
                metadata.insert(ESCROW_KEY.into(), escrow_id.to_string().into());
                metadata.insert(DISPUTE_KEY.into(), dispute_id.to_string().into());
                let row = self
                    .ledger
                    .record(NewTransaction {
                        from_user: Some(client),
                        to_user: Some(artisan),
                        amount: outcome.pay_to_artisan,
                        kind: TransactionType::EscrowRelease,
                        provider_reference: None,
                        metadata,
                    })
                    .map_err(error::from_ledger)?;
                dispatches.push(PreparedDispatch {
                    txn: row.id,
                    adapter: artisan_adapter,
                    direction: Direction::Payout,
                    request: fundi_gateway::TransferRequest {
                        reference: internal_ref,
                        amount: outcome.pay_to_artisan,
                        msisdn: artisan_wallet,
                        note: format!("Fundi release, dispute {dispute_id}"),
                    },
                });
            }
            (outcome, dispatches)
        };

        for dispatch in dispatches {
            let txn = dispatch.txn;
            if let Err(e) = self.dispatch(dispatch).await {
                tracing::error!(transaction = %txn, error = %e, "decision payout failed");
            }
        }
        tracing::info!(dispute = %dispute_id, status = %outcome.status, "arbitration decision executed");
        Ok(outcome)
    }

    /// Reopen a FREEZE_FUNDS resolution so a new ruling can be issued.
    pub fn reopen_frozen_dispute(
        &self,
        dispute_id: DisputeId,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        let mut inner = self.stores.write()?;
        inner
            .dispute_mut(dispute_id)?
            .reopen_frozen(now)
            .map_err(error::from_dispute)
    }

    /// Administratively close a resolved dispute.
    pub fn close_dispute(&self, dispute_id: DisputeId, now: Timestamp) -> Result<(), EngineError> {
        let mut inner = self.stores.write()?;
        inner
            .dispute_mut(dispute_id)?
            .close(now)
            .map_err(error::from_dispute)
    }
}

/// Cancel every non-terminal voucher on an escrow. The executed ruling
/// already cleared the reservations, so nothing un-reserves here.
fn cancel_outstanding_vouchers(inner: &mut crate::store::StoreInner, escrow_id: fundi_core::EscrowId) {
    let ids: Vec<_> = inner
        .vouchers
        .values()
        .filter(|v| v.escrow_id == escrow_id && !v.status.is_terminal())
        .map(|v| v.id)
        .collect();
    for id in ids {
        if let Some(v) = inner.vouchers.get_mut(&id) {
            if v.cancel().is_ok() {
                tracing::info!(voucher = %id, escrow = %escrow_id, "voucher superseded by ruling");
            }
        }
    }
}
