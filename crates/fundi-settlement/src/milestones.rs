//! # Milestone Service
//!
//! Registers a worksite's payment plan against its escrow and drives
//! milestones through submission, validation, and the auto-validation
//! sweep. A payable milestone triggers exactly one labor release.

use fundi_core::{EngineError, MilestoneId, MissionId, MoneyAmount, Timestamp, UserId, WorksiteId};
use fundi_escrow::{Milestone, MilestoneStatus, ProofOfDelivery};
use fundi_ledger::{NewTransaction, Transaction, TransactionType};

use crate::engine::{
    base_metadata, new_internal_reference, Direction, PreparedDispatch, SettlementEngine,
    COMMISSION_KEY, ESCROW_KEY, MILESTONE_KEY,
};
use crate::error;
use crate::store::StoreInner;

impl SettlementEngine {
    /// Register a worksite's payment plan.
    ///
    /// The plan's labor amounts must sum exactly to the escrow's labor
    /// budget — every centime of labor is accounted to a milestone.
    pub fn register_payment_plan(
        &self,
        worksite_id: WorksiteId,
        mission_id: MissionId,
        plan: Vec<(String, MoneyAmount)>,
    ) -> Result<Vec<Milestone>, EngineError> {
        if plan.is_empty() {
            return Err(EngineError::Validation(
                "payment plan must contain at least one milestone".to_string(),
            ));
        }
        let mut inner = self.stores.write()?;
        let escrow_id = *inner
            .escrow_by_mission
            .get(&mission_id)
            .ok_or_else(|| EngineError::NotFound(format!("no escrow for mission {mission_id}")))?;
        if inner.worksite_escrow.contains_key(&worksite_id) {
            return Err(EngineError::StateConflict(format!(
                "worksite {worksite_id} already has a payment plan"
            )));
        }
        let labor_budget = inner.escrow(escrow_id)?.labor_amount;
        let mut planned = MoneyAmount::ZERO;
        for (_, amount) in &plan {
            planned = planned
                .checked_add(*amount)
                .map_err(|e| EngineError::Validation(e.to_string()))?;
        }
        if planned != labor_budget {
            return Err(EngineError::Validation(format!(
                "payment plan total {planned} must equal the escrow labor amount {labor_budget}"
            )));
        }

        let milestones: Vec<Milestone> = plan
            .into_iter()
            .enumerate()
            .map(|(i, (description, amount))| {
                Milestone::new(worksite_id, description, amount, (i + 1) as u32)
            })
            .collect();
        inner.worksite_escrow.insert(worksite_id, escrow_id);
        for m in &milestones {
            inner.milestones.insert(m.id, m.clone());
        }
        Ok(milestones)
    }

    /// Submit proof of delivery for a milestone and start the
    /// auto-validation clock.
    pub fn submit_milestone(
        &self,
        milestone_id: MilestoneId,
        proof: ProofOfDelivery,
        now: Timestamp,
    ) -> Result<Milestone, EngineError> {
        let mut inner = self.stores.write()?;
        let window = self.config.auto_validation_window();
        let m = inner.milestone_mut(milestone_id)?;
        m.submit(proof, window, now).map_err(error::from_milestone)?;
        Ok(m.clone())
    }

    /// The client validates a submitted milestone, releasing its labor.
    pub async fn validate_milestone(
        &self,
        milestone_id: MilestoneId,
        validator: UserId,
        now: Timestamp,
    ) -> Result<Transaction, EngineError> {
        self.require_eligible(validator)?;
        let (row, dispatch) = {
            let mut inner = self.stores.write()?;
            let escrow_id = escrow_for_milestone(&inner, milestone_id)?;
            let client = inner.escrow(escrow_id)?.client_id;
            if validator != client {
                return Err(EngineError::UserNotEligible(format!(
                    "only the client may validate; {validator} is not {client}"
                )));
            }
            self.release_for_milestone(&mut inner, milestone_id, Some(validator), now)?
        };
        self.dispatch(dispatch).await?;
        Ok(row)
    }

    /// The client contests a submitted milestone; its labor stays
    /// frozen pending a dispute.
    pub fn contest_milestone(
        &self,
        milestone_id: MilestoneId,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<Milestone, EngineError> {
        let mut inner = self.stores.write()?;
        let m = inner.milestone_mut(milestone_id)?;
        m.contest(reason, now).map_err(error::from_milestone)?;
        Ok(m.clone())
    }

    /// Release every SUBMITTED milestone whose validation window has
    /// elapsed. Idempotent: a second run finds nothing SUBMITTED and
    /// releases nothing.
    ///
    /// Returns the number of milestones auto-validated.
    pub async fn run_auto_validation_sweep(&self, now: Timestamp) -> Result<usize, EngineError> {
        let mut dispatches = Vec::new();
        {
            let mut inner = self.stores.write()?;
            let due: Vec<MilestoneId> = inner
                .milestones
                .values()
                .filter(|m| {
                    m.status == MilestoneStatus::Submitted
                        && m.auto_validation_deadline.is_some_and(|d| now > d)
                })
                .map(|m| m.id)
                .collect();
            for milestone_id in due {
                match self.release_for_milestone(&mut inner, milestone_id, None, now) {
                    Ok((_, dispatch)) => dispatches.push(dispatch),
                    // A broken payout target must not wedge the sweep;
                    // the milestone stays SUBMITTED for the next run.
                    Err(e) => {
                        tracing::warn!(
                            milestone = %milestone_id,
                            error = %e,
                            "auto-validation skipped milestone"
                        );
                    }
                }
            }
        }
        let released = dispatches.len();
        for dispatch in dispatches {
            let txn = dispatch.txn;
            if let Err(e) = self.dispatch(dispatch).await {
                tracing::error!(transaction = %txn, error = %e, "auto-validation payout failed");
            }
        }
        if released > 0 {
            tracing::info!(count = released, "auto-validation sweep released milestones");
        }
        Ok(released)
    }

    /// Validate a milestone (by client or sweep) and release its labor:
    /// escrow balance, milestone state, and the PENDING ledger row move
    /// together under the caller's guard.
    fn release_for_milestone(
        &self,
        inner: &mut StoreInner,
        milestone_id: MilestoneId,
        validator: Option<UserId>,
        now: Timestamp,
    ) -> Result<(Transaction, PreparedDispatch), EngineError> {
        let (worksite_id, amount, status) = {
            let m = inner.milestone(milestone_id)?;
            (m.worksite_id, m.labor_amount, m.status)
        };
        if status != MilestoneStatus::Submitted {
            return Err(EngineError::StateConflict(format!(
                "milestone {milestone_id} is {status}: cannot validate"
            )));
        }
        let escrow_id = escrow_for_milestone(inner, milestone_id)?;
        let (client, artisan) = {
            let e = inner.escrow(escrow_id)?;
            (e.client_id, e.artisan_id)
        };
        let wallet = self.wallet(artisan)?;
        let adapter = self.adapter_for(&wallet)?;

        // Escrow first: it carries the preconditions (frozen, over-release).
        inner
            .escrow_mut(escrow_id)?
            .release_labor(amount, &format!("milestone {milestone_id}"), now)
            .map_err(error::from_escrow)?;
        let m = inner.milestone_mut(milestone_id)?;
        let result = match validator {
            Some(user) => m.validate(user, now),
            None => m.auto_validate(now),
        };
        // The status and deadline were checked above; a failure here
        // means the aggregates disagree mid-guard.
        result.map_err(|e| EngineError::Consistency(e.to_string()))?;

        let internal_ref = new_internal_reference();
        let commission = amount.share_bps(self.config.commission_rate_bps);
        let mut metadata = base_metadata(adapter.provider(), &internal_ref);
        metadata.insert(ESCROW_KEY.into(), escrow_id.to_string().into());
        metadata.insert(MILESTONE_KEY.into(), milestone_id.to_string().into());
        metadata.insert(COMMISSION_KEY.into(), commission.minor_units().into());
        let row = self
            .ledger
            .record(NewTransaction {
                from_user: Some(client),
                to_user: Some(artisan),
                amount,
                kind: TransactionType::EscrowRelease,
                provider_reference: None,
                metadata,
            })
            .map_err(error::from_ledger)?;

        let dispatch = PreparedDispatch {
            txn: row.id,
            adapter,
            direction: Direction::Payout,
            request: fundi_gateway::TransferRequest {
                reference: internal_ref,
                amount,
                msisdn: wallet,
                note: format!("Fundi labor release, milestone {milestone_id}"),
            },
        };
        Ok((row, dispatch))
    }
}

fn escrow_for_milestone(
    inner: &StoreInner,
    milestone_id: MilestoneId,
) -> Result<fundi_core::EscrowId, EngineError> {
    let worksite_id = inner.milestone(milestone_id)?.worksite_id;
    inner
        .worksite_escrow
        .get(&worksite_id)
        .copied()
        .ok_or_else(|| {
            EngineError::Consistency(format!(
                "milestone {milestone_id} belongs to worksite {worksite_id} with no escrow"
            ))
        })
}
