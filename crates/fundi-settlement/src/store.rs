//! # Aggregate Stores
//!
//! One lock over every aggregate map. Cross-aggregate operations
//! (voucher validation touches a voucher, an escrow, and the ledger)
//! perform all their mutations under a single write guard, so no
//! partially-applied state is ever observable. Gateway calls never
//! happen while a guard is held.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use fundi_core::{
    DisputeId, EngineError, EscrowId, MilestoneId, MissionId, VoucherId, WorksiteId,
};
use fundi_dispute::Dispute;
use fundi_escrow::{Escrow, MaterialVoucher, Milestone, VoucherValidation};

/// Every aggregate the engine owns, behind one guard.
#[derive(Default)]
pub(crate) struct StoreInner {
    pub escrows: HashMap<EscrowId, Escrow>,
    /// One escrow per mission.
    pub escrow_by_mission: HashMap<MissionId, EscrowId>,
    pub milestones: HashMap<MilestoneId, Milestone>,
    /// Which escrow a worksite's payment plan draws on.
    pub worksite_escrow: HashMap<WorksiteId, EscrowId>,
    pub vouchers: HashMap<VoucherId, MaterialVoucher>,
    pub voucher_by_code: HashMap<String, VoucherId>,
    /// Append-only redemption audit trail, including rejections.
    pub validations: Vec<VoucherValidation>,
    pub disputes: HashMap<DisputeId, Dispute>,
}

impl StoreInner {
    pub fn escrow(&self, id: EscrowId) -> Result<&Escrow, EngineError> {
        self.escrows
            .get(&id)
            .ok_or_else(|| EngineError::NotFound(format!("escrow {id}")))
    }

    pub fn escrow_mut(&mut self, id: EscrowId) -> Result<&mut Escrow, EngineError> {
        self.escrows
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("escrow {id}")))
    }

    pub fn milestone(&self, id: MilestoneId) -> Result<&Milestone, EngineError> {
        self.milestones
            .get(&id)
            .ok_or_else(|| EngineError::NotFound(format!("milestone {id}")))
    }

    pub fn milestone_mut(&mut self, id: MilestoneId) -> Result<&mut Milestone, EngineError> {
        self.milestones
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("milestone {id}")))
    }

    pub fn voucher_mut(&mut self, id: VoucherId) -> Result<&mut MaterialVoucher, EngineError> {
        self.vouchers
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("voucher {id}")))
    }

    pub fn dispute_mut(&mut self, id: DisputeId) -> Result<&mut Dispute, EngineError> {
        self.disputes
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("dispute {id}")))
    }
}

/// Thread-safe wrapper over [`StoreInner`].
#[derive(Default)]
pub(crate) struct Stores {
    inner: RwLock<StoreInner>,
}

impl Stores {
    pub fn read(&self) -> Result<RwLockReadGuard<'_, StoreInner>, EngineError> {
        self.inner
            .read()
            .map_err(|_| EngineError::Consistency("aggregate store lock poisoned".to_string()))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, StoreInner>, EngineError> {
        self.inner
            .write()
            .map_err(|_| EngineError::Consistency("aggregate store lock poisoned".to_string()))
    }
}
