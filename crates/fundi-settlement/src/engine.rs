//! # The Settlement Engine
//!
//! Owns the aggregate stores, the ledger, the provider router, and the
//! identity seam. Service methods are grouped by concern: escrow
//! creation here, milestones in `milestones.rs`, vouchers in
//! `vouchers.rs`, reconciliation in `reconcile.rs`, disputes in
//! `disputes.rs`.
//!
//! Every fund movement follows the same shape: validate, mutate
//! aggregates and record the PENDING ledger row under one store guard,
//! then call the provider outside the guard. Provider acceptance is not
//! settlement — rows stay PENDING until a webhook or poll confirms them.

use std::sync::Arc;

use fundi_core::{
    DisputeId, EngineError, EscrowId, MilestoneId, MissionId, MoneyAmount, PhoneNumber,
    SettlementConfig, Timestamp, TransactionId, UserId, VoucherId,
};
use fundi_dispute::Dispute;
use fundi_escrow::{Escrow, MaterialVoucher, Milestone, VoucherValidation};
use fundi_gateway::{
    GatewayRouter, PaymentGatewayAdapter, ProviderKind, TransferRequest,
};
use fundi_ledger::{Ledger, NewTransaction, Transaction, TransactionType, INTERNAL_REFERENCE_KEY};

use crate::directory::UserDirectory;
use crate::error;
use crate::store::Stores;

/// Metadata key naming the provider a movement was routed to.
pub(crate) const PROVIDER_KEY: &str = "provider";
/// Metadata key carrying the platform commission on a release, in minor units.
pub(crate) const COMMISSION_KEY: &str = "commission_minor";
pub(crate) const ESCROW_KEY: &str = "escrow_id";
pub(crate) const MILESTONE_KEY: &str = "milestone_id";
pub(crate) const VOUCHER_KEY: &str = "voucher_id";
pub(crate) const VALIDATION_KEY: &str = "validation_id";
pub(crate) const DISPUTE_KEY: &str = "dispute_id";

/// Which adapter call a payout dispatch makes.
pub(crate) enum Direction {
    /// `transfer_funds` — pay an artisan or supplier.
    Payout,
    /// `refund_funds` — return funds to a client.
    Refund,
}

/// A movement prepared under the store guard, executed after it drops.
pub(crate) struct PreparedDispatch {
    pub txn: TransactionId,
    pub adapter: Arc<dyn PaymentGatewayAdapter>,
    pub direction: Direction,
    pub request: TransferRequest,
}

/// The orchestration engine over escrows, milestones, vouchers,
/// disputes, the ledger, and the provider gateways.
pub struct SettlementEngine {
    pub(crate) config: SettlementConfig,
    pub(crate) stores: Stores,
    pub(crate) ledger: Arc<Ledger>,
    pub(crate) router: GatewayRouter,
    pub(crate) directory: Arc<dyn UserDirectory>,
}

impl SettlementEngine {
    /// An engine with empty stores and a fresh ledger.
    pub fn new(
        config: SettlementConfig,
        router: GatewayRouter,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            config,
            stores: Stores::default(),
            ledger: Arc::new(Ledger::new()),
            router,
            directory,
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// The transaction ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Create and fund an escrow for a mission.
    ///
    /// Reserves the mission slot and records the PENDING DEPOSIT row,
    /// then asks the client's provider to block the funds. The BLOCKED
    /// escrow becomes visible only once the initiation returns, so
    /// nothing can attach to it while the outcome is in flight: a
    /// definitive rejection releases the slot, an unknown outcome
    /// leaves the row for the polling path.
    pub async fn create_escrow(
        &self,
        mission_id: MissionId,
        client_id: UserId,
        artisan_id: UserId,
        materials: MoneyAmount,
        labor: MoneyAmount,
    ) -> Result<Escrow, EngineError> {
        self.require_eligible(client_id)?;
        self.require_eligible(artisan_id)?;
        let total = materials
            .checked_add(labor)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        if total.is_zero() {
            return Err(EngineError::Validation(
                "escrow must hold a non-zero amount".to_string(),
            ));
        }
        let client_wallet = self.wallet(client_id)?;
        let adapter = self.adapter_for(&client_wallet)?;

        let now = Timestamp::now();
        let internal_ref = new_internal_reference();
        let escrow = Escrow::new(
            EscrowId::new(),
            mission_id,
            client_id,
            artisan_id,
            materials,
            labor,
            now,
        );

        let row = {
            let mut inner = self.stores.write()?;
            if inner.escrow_by_mission.contains_key(&mission_id) {
                return Err(EngineError::StateConflict(format!(
                    "mission {mission_id} already has an escrow"
                )));
            }
            let mut metadata = base_metadata(adapter.provider(), &internal_ref);
            metadata.insert(ESCROW_KEY.into(), escrow.id.to_string().into());
            let row = self
                .ledger
                .record(NewTransaction {
                    from_user: Some(client_id),
                    to_user: None,
                    amount: total,
                    kind: TransactionType::Deposit,
                    provider_reference: None,
                    metadata,
                })
                .map_err(error::from_ledger)?;
            // Reserve the slot only. The escrow aggregate stays out of
            // the store until the initiation returns, so no plan or
            // voucher can attach to an escrow that may roll back.
            inner.escrow_by_mission.insert(mission_id, escrow.id);
            row
        };

        let request = TransferRequest {
            reference: internal_ref,
            amount: total,
            msisdn: client_wallet,
            note: format!("Fundi escrow deposit for {mission_id}"),
        };
        match adapter.block_funds(&request).await {
            Ok(ack) => {
                self.ledger
                    .set_provider_reference(row.id, &ack.provider_reference)
                    .map_err(error::from_ledger)?;
            }
            Err(e) if e.defers_to_polling() => {
                tracing::warn!(
                    transaction = %row.id,
                    escrow = %escrow.id,
                    error = %e,
                    "deposit outcome unknown, deferring to polling"
                );
            }
            Err(e) => {
                // The deposit never happened; the escrow never takes effect.
                let mut inner = self.stores.write()?;
                inner.escrow_by_mission.remove(&mission_id);
                drop(inner);
                let _ = self
                    .ledger
                    .mark_failed(row.id, Some(e.to_string()), Timestamp::now());
                return Err(error::from_gateway(e));
            }
        }
        self.stores
            .write()?
            .escrows
            .insert(escrow.id, escrow.clone());

        tracing::info!(
            escrow = %escrow.id,
            mission = %mission_id,
            amount = %total,
            "escrow created"
        );
        Ok(escrow)
    }

    /// Execute a prepared movement against its provider.
    ///
    /// Acceptance attaches the provider reference; an unknown outcome
    /// leaves the row PENDING for the polling sweep; a definitive
    /// rejection fails the row and surfaces the error.
    pub(crate) async fn dispatch(&self, prepared: PreparedDispatch) -> Result<(), EngineError> {
        let PreparedDispatch {
            txn,
            adapter,
            direction,
            request,
        } = prepared;
        let result = match direction {
            Direction::Payout => adapter.transfer_funds(&request).await,
            Direction::Refund => adapter.refund_funds(&request).await,
        };
        match result {
            Ok(ack) => self
                .ledger
                .set_provider_reference(txn, &ack.provider_reference)
                .map_err(error::from_ledger),
            Err(e) if e.defers_to_polling() => {
                tracing::warn!(
                    transaction = %txn,
                    error = %e,
                    "movement outcome unknown, deferring to polling"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(transaction = %txn, error = %e, "movement rejected by provider");
                let _ = self
                    .ledger
                    .mark_failed(txn, Some(e.to_string()), Timestamp::now());
                Err(error::from_gateway(e))
            }
        }
    }

    pub(crate) fn require_eligible(&self, user: UserId) -> Result<(), EngineError> {
        if self.directory.is_eligible(user) {
            Ok(())
        } else {
            Err(EngineError::UserNotEligible(user.to_string()))
        }
    }

    pub(crate) fn wallet(&self, user: UserId) -> Result<PhoneNumber, EngineError> {
        self.directory
            .wallet_msisdn(user)
            .ok_or_else(|| EngineError::Validation(format!("user {user} has no wallet on file")))
    }

    pub(crate) fn adapter_for(
        &self,
        msisdn: &PhoneNumber,
    ) -> Result<Arc<dyn PaymentGatewayAdapter>, EngineError> {
        self.router.route(msisdn).map_err(error::from_gateway)
    }

    // ---- Read-only views ----------------------------------------------

    /// Snapshot of an escrow.
    pub fn escrow(&self, id: EscrowId) -> Result<Escrow, EngineError> {
        Ok(self.stores.read()?.escrow(id)?.clone())
    }

    /// Snapshot of the escrow backing a mission.
    pub fn escrow_for_mission(&self, mission_id: MissionId) -> Result<Escrow, EngineError> {
        let inner = self.stores.read()?;
        let id = inner
            .escrow_by_mission
            .get(&mission_id)
            .ok_or_else(|| EngineError::NotFound(format!("no escrow for mission {mission_id}")))?;
        Ok(inner.escrow(*id)?.clone())
    }

    /// Snapshot of a milestone.
    pub fn milestone(&self, id: MilestoneId) -> Result<Milestone, EngineError> {
        Ok(self.stores.read()?.milestone(id)?.clone())
    }

    /// Snapshot of a voucher.
    pub fn voucher(&self, id: VoucherId) -> Result<MaterialVoucher, EngineError> {
        let inner = self.stores.read()?;
        inner
            .vouchers
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("voucher {id}")))
    }

    /// Snapshot of a dispute.
    pub fn dispute(&self, id: DisputeId) -> Result<Dispute, EngineError> {
        let inner = self.stores.read()?;
        inner
            .disputes
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("dispute {id}")))
    }

    /// The redemption audit trail, oldest first.
    pub fn validations(&self) -> Result<Vec<VoucherValidation>, EngineError> {
        Ok(self.stores.read()?.validations.clone())
    }

    /// Snapshot of a ledger row.
    pub fn transaction(&self, id: TransactionId) -> Result<Transaction, EngineError> {
        self.ledger
            .get(id)
            .ok_or_else(|| EngineError::NotFound(format!("transaction {id}")))
    }

    /// All ledger rows in insertion order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.ledger.entries()
    }
}

/// A fresh engine-side reference for a provider movement.
pub(crate) fn new_internal_reference() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Metadata every provider-facing row carries: which provider it was
/// routed to, and the engine-side reference webhooks can echo.
pub(crate) fn base_metadata(
    provider: ProviderKind,
    internal_ref: &str,
) -> serde_json::Map<String, serde_json::Value> {
    let mut metadata = serde_json::Map::new();
    metadata.insert(PROVIDER_KEY.into(), provider.as_str().into());
    metadata.insert(INTERNAL_REFERENCE_KEY.into(), internal_ref.into());
    metadata
}
