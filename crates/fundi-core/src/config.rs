//! # Settlement Configuration
//!
//! The operational knobs the engine carries instead of baked-in constants:
//! the auto-validation window, the reconciliation grace period, voucher
//! TTL, commission rate, the optional supplier-distance cap, and the
//! gateway call timeout.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Engine configuration with production defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Hours after milestone submission before the auto-validation sweep
    /// releases the milestone without client action.
    pub auto_validation_hours: i64,

    /// Seconds a transaction may stay PENDING before the polling sweep
    /// queries the provider for its status.
    pub reconciliation_grace_secs: i64,

    /// Default voucher lifetime in days when the issuer does not pass one.
    pub voucher_ttl_days: i64,

    /// Platform commission on escrow releases, in basis points.
    /// Recorded in transaction metadata, never as its own ledger row.
    pub commission_rate_bps: u32,

    /// Optional hard cap on artisan-supplier distance at voucher
    /// validation. `None` means the distance is an audit signal only.
    pub max_supplier_distance_meters: Option<f64>,

    /// Bounded timeout for every gateway call. A timeout classifies as
    /// "unknown" and defers to the polling path.
    pub gateway_timeout_secs: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            auto_validation_hours: 72,
            reconciliation_grace_secs: 300,
            voucher_ttl_days: 30,
            commission_rate_bps: 1_000,
            max_supplier_distance_meters: None,
            gateway_timeout_secs: 10,
        }
    }
}

impl SettlementConfig {
    /// The auto-validation window as a duration.
    pub fn auto_validation_window(&self) -> Duration {
        Duration::hours(self.auto_validation_hours)
    }

    /// The reconciliation grace window as a duration.
    pub fn reconciliation_grace(&self) -> Duration {
        Duration::seconds(self.reconciliation_grace_secs)
    }

    /// The default voucher lifetime as a duration.
    pub fn voucher_ttl(&self) -> Duration {
        Duration::days(self.voucher_ttl_days)
    }
}
