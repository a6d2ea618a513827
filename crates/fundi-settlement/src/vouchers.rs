//! # Voucher Service
//!
//! Issues material vouchers against an escrow's unreserved materials
//! allowance and settles their redemption at suppliers. Every
//! redemption attempt — approved, flagged, or rejected — lands on the
//! append-only audit trail with the artisan/supplier distance as a
//! fraud signal.

use fundi_core::{
    haversine_meters, EngineError, EscrowId, GeoPoint, MoneyAmount, Timestamp, UserId,
    ValidationId, VoucherId,
};
use fundi_escrow::{MaterialVoucher, ValidationStatus, VoucherValidation};
use fundi_ledger::{NewTransaction, TransactionType};

use crate::engine::{
    base_metadata, new_internal_reference, Direction, PreparedDispatch, SettlementEngine,
    ESCROW_KEY, VALIDATION_KEY, VOUCHER_KEY,
};
use crate::error;

/// Without a configured cap, a redemption this far from the artisan is
/// flagged for review but still settles.
const IMPLAUSIBLE_DISTANCE_METERS: f64 = 10_000.0;

impl SettlementEngine {
    /// Issue a voucher against an escrow's materials balance.
    ///
    /// The face value is reserved immediately: outstanding vouchers can
    /// never promise more than the unreserved materials allowance.
    pub fn issue_voucher(
        &self,
        escrow_id: EscrowId,
        artisan_id: UserId,
        amount: MoneyAmount,
        authorized_suppliers: Vec<UserId>,
        ttl: Option<chrono::Duration>,
        now: Timestamp,
    ) -> Result<MaterialVoucher, EngineError> {
        if amount.is_zero() {
            return Err(EngineError::Validation(
                "voucher face value must be non-zero".to_string(),
            ));
        }
        self.require_eligible(artisan_id)?;
        let ttl = ttl.unwrap_or_else(|| self.config.voucher_ttl());

        let mut inner = self.stores.write()?;
        let escrow = inner.escrow_mut(escrow_id)?;
        if artisan_id != escrow.artisan_id {
            return Err(EngineError::Validation(format!(
                "voucher holder {artisan_id} is not the escrow artisan"
            )));
        }
        escrow.reserve_materials(amount).map_err(error::from_escrow)?;

        let mut voucher =
            MaterialVoucher::issue(escrow_id, artisan_id, amount, authorized_suppliers, ttl, now);
        // Codes are short; regenerate on the rare collision.
        while inner.voucher_by_code.contains_key(&voucher.code) {
            voucher = MaterialVoucher::issue(
                escrow_id,
                artisan_id,
                amount,
                voucher.authorized_suppliers.clone(),
                ttl,
                now,
            );
        }
        inner.voucher_by_code.insert(voucher.code.clone(), voucher.id);
        inner.vouchers.insert(voucher.id, voucher.clone());
        tracing::info!(voucher = %voucher.id, escrow = %escrow_id, amount = %amount, "voucher issued");
        Ok(voucher)
    }

    /// Settle a supplier's redemption of a voucher code.
    ///
    /// Rejections append an audit row and change nothing else. Approval
    /// redeems the voucher, releases the reserved materials, records
    /// the ESCROW_RELEASE row, and pays the supplier.
    pub async fn validate_voucher(
        &self,
        code: &str,
        supplier_id: UserId,
        amount: MoneyAmount,
        artisan_location: Option<GeoPoint>,
        supplier_location: Option<GeoPoint>,
        now: Timestamp,
    ) -> Result<VoucherValidation, EngineError> {
        self.require_eligible(supplier_id)?;
        let (validation, dispatch) = {
            let mut inner = self.stores.write()?;
            let voucher_id = *inner
                .voucher_by_code
                .get(code)
                .ok_or_else(|| EngineError::NotFound(format!("no voucher with code {code}")))?;
            let (escrow_id, artisan_id, check) = {
                let v = inner
                    .vouchers
                    .get(&voucher_id)
                    .ok_or_else(|| EngineError::NotFound(format!("voucher {voucher_id}")))?;
                (
                    v.escrow_id,
                    v.artisan_id,
                    v.check_redemption(supplier_id, amount, now),
                )
            };
            let distance = match (artisan_location, supplier_location) {
                (Some(a), Some(s)) => Some(haversine_meters(a, s)),
                _ => None,
            };
            let mut audit = VoucherValidation {
                id: ValidationId::new(),
                voucher_id,
                supplier_id,
                artisan_id,
                amount_used: amount,
                artisan_location,
                supplier_location,
                distance_meters: distance,
                validation_status: ValidationStatus::Approved,
                notes: None,
                validated_at: now,
            };

            if let Err(err) = check {
                audit.validation_status = ValidationStatus::Rejected;
                audit.notes = Some(err.to_string());
                inner.validations.push(audit);
                return Err(error::from_voucher(err));
            }
            if let (Some(cap), Some(d)) = (self.config.max_supplier_distance_meters, distance) {
                if d > cap {
                    let note = format!("supplier {d:.0} m from artisan exceeds {cap:.0} m cap");
                    audit.validation_status = ValidationStatus::Rejected;
                    audit.notes = Some(note.clone());
                    inner.validations.push(audit);
                    return Err(EngineError::StateConflict(note));
                }
            }
            let escrow_ok = inner.escrow(escrow_id)?.status.accepts_release();
            if !escrow_ok {
                let status = inner.escrow(escrow_id)?.status;
                let note = format!("escrow {escrow_id} is {status}");
                audit.validation_status = ValidationStatus::Rejected;
                audit.notes = Some(note.clone());
                inner.validations.push(audit);
                return Err(EngineError::StateConflict(note));
            }
            if distance.is_some_and(|d| d > IMPLAUSIBLE_DISTANCE_METERS) {
                audit.validation_status = ValidationStatus::Flagged;
                audit.notes = Some(format!(
                    "supplier {:.0} m from artisan, flagged for review",
                    distance.unwrap_or_default()
                ));
            }

            let wallet = self.wallet(supplier_id)?;
            let adapter = self.adapter_for(&wallet)?;
            let client = inner.escrow(escrow_id)?.client_id;

            // All preconditions held; these mutations cannot half-apply.
            inner
                .voucher_mut(voucher_id)?
                .redeem(supplier_id, amount, now)
                .map_err(|e| EngineError::Consistency(e.to_string()))?;
            inner
                .escrow_mut(escrow_id)?
                .redeem_materials(amount, &format!("voucher {voucher_id}"), now)
                .map_err(|e| EngineError::Consistency(e.to_string()))?;

            let internal_ref = new_internal_reference();
            let mut metadata = base_metadata(adapter.provider(), &internal_ref);
            metadata.insert(ESCROW_KEY.into(), escrow_id.to_string().into());
            metadata.insert(VOUCHER_KEY.into(), voucher_id.to_string().into());
            metadata.insert(VALIDATION_KEY.into(), audit.id.to_string().into());
            let row = self
                .ledger
                .record(NewTransaction {
                    from_user: Some(client),
                    to_user: Some(supplier_id),
                    amount,
                    kind: TransactionType::EscrowRelease,
                    provider_reference: None,
                    metadata,
                })
                .map_err(error::from_ledger)?;

            inner.validations.push(audit.clone());
            let dispatch = PreparedDispatch {
                txn: row.id,
                adapter,
                direction: Direction::Payout,
                request: fundi_gateway::TransferRequest {
                    reference: internal_ref,
                    amount,
                    msisdn: wallet,
                    note: format!("Fundi materials, voucher {code}"),
                },
            };
            (audit, dispatch)
        };
        self.dispatch(dispatch).await?;
        Ok(validation)
    }

    /// Cancel a voucher, returning its unredeemed remainder to the
    /// escrow's materials allowance.
    pub fn cancel_voucher(&self, voucher_id: VoucherId) -> Result<MoneyAmount, EngineError> {
        let mut inner = self.stores.write()?;
        let (escrow_id, remainder) = {
            let v = inner.voucher_mut(voucher_id)?;
            let remainder = v.cancel().map_err(error::from_voucher)?;
            (v.escrow_id, remainder)
        };
        release_reservation(&mut inner, escrow_id, remainder)?;
        tracing::info!(voucher = %voucher_id, remainder = %remainder, "voucher cancelled");
        Ok(remainder)
    }

    /// Expire every due voucher, returning remainders to their escrows.
    /// Idempotent: expired vouchers are terminal and skipped.
    ///
    /// Returns the number of vouchers expired.
    pub fn run_expiry_sweep(&self, now: Timestamp) -> Result<usize, EngineError> {
        let mut inner = self.stores.write()?;
        let due: Vec<VoucherId> = inner
            .vouchers
            .values()
            .filter(|v| !v.status.is_terminal() && now > v.expires_at)
            .map(|v| v.id)
            .collect();
        let mut expired = 0;
        for voucher_id in &due {
            let (escrow_id, remainder) = {
                let v = inner.voucher_mut(*voucher_id)?;
                match v.expire(now) {
                    Ok(remainder) => (v.escrow_id, remainder),
                    Err(e) => {
                        tracing::warn!(voucher = %voucher_id, error = %e, "expiry skipped voucher");
                        continue;
                    }
                }
            };
            release_reservation(&mut inner, escrow_id, remainder)?;
            expired += 1;
        }
        if expired > 0 {
            tracing::info!(count = expired, "voucher expiry sweep");
        }
        Ok(expired)
    }
}

/// Return an unredeemed remainder to the escrow's allowance.
///
/// An escrow settled by a ruling has already cleared its reservations,
/// so only the still-reserved portion goes back.
fn release_reservation(
    inner: &mut crate::store::StoreInner,
    escrow_id: EscrowId,
    remainder: MoneyAmount,
) -> Result<(), EngineError> {
    if remainder.is_zero() {
        return Ok(());
    }
    let escrow = inner.escrow_mut(escrow_id)?;
    let give_back = remainder.min(escrow.materials_reserved);
    if !give_back.is_zero() {
        escrow
            .unreserve_materials(give_back)
            .map_err(error::from_escrow)?;
    }
    Ok(())
}
