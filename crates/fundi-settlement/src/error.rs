//! # Error Mapping
//!
//! Each aggregate crate carries its own precise error enum; the engine
//! surfaces everything as [`EngineError`] classes. Conversions live here
//! so every service module classifies the same way.

use fundi_core::EngineError;
use fundi_dispute::DisputeError;
use fundi_escrow::{EscrowError, MilestoneError, VoucherError};
use fundi_gateway::GatewayError;
use fundi_ledger::LedgerError;

pub(crate) fn from_escrow(err: EscrowError) -> EngineError {
    match err {
        EscrowError::InvalidState { .. }
        | EscrowError::OverRelease { .. }
        | EscrowError::InsufficientMaterials { .. }
        | EscrowError::ReservationUnderflow { .. } => EngineError::StateConflict(err.to_string()),
        // Money arithmetic inside an escrow only fails when an invariant
        // is already broken.
        EscrowError::Money(_) => EngineError::Consistency(err.to_string()),
    }
}

pub(crate) fn from_milestone(err: MilestoneError) -> EngineError {
    EngineError::StateConflict(err.to_string())
}

pub(crate) fn from_voucher(err: VoucherError) -> EngineError {
    EngineError::StateConflict(err.to_string())
}

pub(crate) fn from_dispute(err: DisputeError) -> EngineError {
    EngineError::StateConflict(err.to_string())
}

pub(crate) fn from_ledger(err: LedgerError) -> EngineError {
    match err {
        LedgerError::NotFound(_) => EngineError::NotFound(err.to_string()),
        // A second differing provider reference or a poisoned lock means
        // the ledger no longer reflects what happened.
        LedgerError::ProviderReferenceSet { .. } | LedgerError::Poisoned => {
            EngineError::Consistency(err.to_string())
        }
    }
}

pub(crate) fn from_gateway(err: GatewayError) -> EngineError {
    match err {
        GatewayError::BadSignature(_) => EngineError::Signature(err.to_string()),
        GatewayError::Payload(_)
        | GatewayError::Unroutable(_)
        | GatewayError::UnknownProvider(_) => EngineError::Validation(err.to_string()),
        GatewayError::Auth(_)
        | GatewayError::Network(_)
        | GatewayError::Rejected(_)
        | GatewayError::Unknown(_) => EngineError::Provider(err.to_string()),
    }
}
