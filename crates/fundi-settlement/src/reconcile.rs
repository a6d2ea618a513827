//! # Reconciliation
//!
//! Two converging paths resolve PENDING ledger rows:
//!
//! - **Webhook push**: a provider posts a signed status payload. The
//!   signature is verified before anything else; the payload maps to a
//!   canonical report and applies to the row it references.
//! - **Polling pull**: a sweep queries the provider for every PENDING
//!   row older than the grace window.
//!
//! Both paths end in the same at-most-once ledger transitions, so a
//! webhook and a concurrent poll reporting the same outcome apply it
//! exactly once, in either order.

use fundi_core::{EngineError, Timestamp};
use fundi_gateway::{ProviderKind, ProviderStatus, StatusReport};
use fundi_ledger::{SignalOutcome, Transaction, INTERNAL_REFERENCE_KEY};

use crate::engine::{SettlementEngine, PROVIDER_KEY};
use crate::error;

impl SettlementEngine {
    /// Ingest a provider webhook.
    ///
    /// A bad signature rejects the request before any state change; the
    /// provider sees a failure and retries. An unknown reference is
    /// `NotFound` — also a retryable failure, since the row may still
    /// be committing.
    pub fn ingest_webhook(
        &self,
        provider: ProviderKind,
        body: &[u8],
        signature: &str,
    ) -> Result<SignalOutcome, EngineError> {
        let adapter = self.router.by_provider(provider).map_err(error::from_gateway)?;
        adapter
            .verify_webhook_signature(body, signature)
            .map_err(|e| {
                tracing::warn!(provider = %provider, "webhook signature rejected");
                error::from_gateway(e)
            })?;
        let report = adapter.parse_webhook(body).map_err(error::from_gateway)?;
        self.apply_status_report(&report)
    }

    /// Apply a canonical provider report to the row it references.
    ///
    /// The row is located by provider reference first, then by the
    /// internal reference the provider echoes back. Duplicate signals
    /// are no-ops.
    pub(crate) fn apply_status_report(
        &self,
        report: &StatusReport,
    ) -> Result<SignalOutcome, EngineError> {
        let row = self
            .ledger
            .find_by_provider_reference(&report.transaction_id)
            .or_else(|| {
                report
                    .reference
                    .as_deref()
                    .and_then(|r| self.ledger.find_by_internal_reference(r))
            })
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "no transaction for provider reference {}",
                    report.transaction_id
                ))
            })?;
        // An initiation that timed out never learned its reference;
        // the first signal that carries one attaches it.
        if row.provider_reference.is_none() {
            self.ledger
                .set_provider_reference(row.id, &report.transaction_id)
                .map_err(error::from_ledger)?;
        }
        let outcome = self.settle_row(&row, report)?;
        if outcome.applied() {
            tracing::info!(
                transaction = %row.id,
                status = ?report.status,
                "provider signal applied"
            );
        }
        Ok(outcome)
    }

    /// Query providers for every PENDING row past the grace window.
    ///
    /// Per-row failures are logged and skipped; the next sweep retries.
    /// Returns the number of rows whose status was resolved.
    pub async fn run_reconciliation_sweep(&self, now: Timestamp) -> Result<usize, EngineError> {
        let due = self
            .ledger
            .pending_past_grace(now, self.config.reconciliation_grace());
        let mut resolved = 0;
        for row in due {
            let Some(kind) = row
                .metadata
                .get(PROVIDER_KEY)
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<ProviderKind>().ok())
            else {
                tracing::warn!(transaction = %row.id, "pending row names no provider, skipping");
                continue;
            };
            let adapter = match self.router.by_provider(kind) {
                Ok(adapter) => adapter,
                Err(e) => {
                    tracing::warn!(transaction = %row.id, error = %e, "no adapter for pending row");
                    continue;
                }
            };
            // Rows whose initiation timed out have no provider reference;
            // probe with our own, which reference-echoing providers accept.
            let Some(probe) = row.provider_reference.clone().or_else(|| {
                row.metadata
                    .get(INTERNAL_REFERENCE_KEY)
                    .and_then(|v| v.as_str())
                    .map(String::from)
            }) else {
                tracing::warn!(transaction = %row.id, "pending row has no reference to probe");
                continue;
            };
            match adapter.check_status(&probe).await {
                Ok(report) => {
                    if self.settle_row(&row, &report)?.applied() {
                        resolved += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(transaction = %row.id, error = %e, "status probe failed");
                }
            }
        }
        if resolved > 0 {
            tracing::info!(count = resolved, "reconciliation sweep resolved rows");
        }
        Ok(resolved)
    }

    /// Apply one report to one row. PENDING reports apply nothing.
    fn settle_row(
        &self,
        row: &Transaction,
        report: &StatusReport,
    ) -> Result<SignalOutcome, EngineError> {
        let now = Timestamp::now();
        let outcome = match report.status {
            ProviderStatus::Pending => SignalOutcome::Duplicate,
            ProviderStatus::Completed => self
                .ledger
                .mark_completed(row.id, now)
                .map_err(error::from_ledger)?,
            ProviderStatus::Failed => self
                .ledger
                .mark_failed(row.id, report.error_message.clone(), now)
                .map_err(error::from_ledger)?,
            ProviderStatus::Cancelled => self
                .ledger
                .mark_cancelled(row.id, now)
                .map_err(error::from_ledger)?,
        };
        Ok(outcome)
    }
}
