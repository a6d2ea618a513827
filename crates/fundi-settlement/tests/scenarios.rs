//! End-to-end settlement flows against the sandbox provider: escrow
//! funding, voucher redemption, milestone auto-validation, webhook and
//! polling convergence, and arbitration decision execution.

use std::sync::Arc;

use fundi_core::{
    EngineError, GeoPoint, MissionId, MoneyAmount, PhoneNumber, SettlementConfig, Timestamp,
    UserId, WorksiteId,
};
use fundi_dispute::{ArbitrationDecision, DisputeKind, DisputeStatus};
use fundi_escrow::{
    EscrowStatus, MilestoneStatus, ProofOfDelivery, ValidationStatus, VoucherStatus,
};
use fundi_gateway::{
    GatewayRouter, PaymentGatewayAdapter, ProviderKind, ProviderStatus, SandboxGateway,
    StatusReport,
};
use fundi_ledger::{TransactionStatus, TransactionType};
use fundi_settlement::{InMemoryDirectory, SettlementEngine};

const WEBHOOK_SECRET: &str = "sandbox-webhook-secret";

struct Harness {
    engine: SettlementEngine,
    sandbox: Arc<SandboxGateway>,
    directory: Arc<InMemoryDirectory>,
}

fn harness() -> Harness {
    harness_with(SettlementConfig {
        // Tests poll immediately instead of waiting out the grace window.
        reconciliation_grace_secs: 0,
        ..SettlementConfig::default()
    })
}

fn harness_with(config: SettlementConfig) -> Harness {
    let sandbox = Arc::new(SandboxGateway::unrestricted(WEBHOOK_SECRET));
    let router = GatewayRouter::new(vec![sandbox.clone() as Arc<dyn PaymentGatewayAdapter>]);
    let directory = Arc::new(InMemoryDirectory::permissive(
        PhoneNumber::parse("237677123456").unwrap(),
    ));
    let engine = SettlementEngine::new(config, router, directory.clone());
    Harness {
        engine,
        sandbox,
        directory,
    }
}

fn m(minor: u64) -> MoneyAmount {
    MoneyAmount::from_minor(minor)
}

fn proof() -> ProofOfDelivery {
    ProofOfDelivery {
        photo_url: "https://cdn.example.test/proof/42.jpg".to_string(),
        location: None,
        captured_at: Timestamp::now(),
        device_metadata: serde_json::Map::new(),
    }
}

fn completed_releases(engine: &SettlementEngine) -> Vec<fundi_ledger::Transaction> {
    engine
        .transactions()
        .into_iter()
        .filter(|t| {
            t.kind == TransactionType::EscrowRelease && t.status == TransactionStatus::Completed
        })
        .collect()
}

#[tokio::test]
async fn test_voucher_redemption_releases_materials_once() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan, supplier) = (UserId::new(), UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(50_000), m(150_000))
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Blocked);

    let now = Timestamp::now();
    let voucher = h
        .engine
        .issue_voucher(escrow.id, artisan, m(20_000), vec![], None, now)
        .unwrap();
    assert_eq!(voucher.status, VoucherStatus::Active);

    let validation = h
        .engine
        .validate_voucher(&voucher.code, supplier, m(20_000), None, None, now)
        .await
        .unwrap();
    assert_eq!(validation.validation_status, ValidationStatus::Approved);

    let voucher = h.engine.voucher(voucher.id).unwrap();
    assert_eq!(voucher.status, VoucherStatus::Used);
    assert!(voucher.remaining().is_zero());

    let escrow = h.engine.escrow(escrow.id).unwrap();
    assert_eq!(escrow.materials_released, m(20_000));
    assert!(escrow.materials_reserved.is_zero());
    assert_eq!(escrow.status, EscrowStatus::Partial);

    // Settle the pending rows through the polling path.
    h.engine
        .run_reconciliation_sweep(Timestamp::now())
        .await
        .unwrap();
    let releases = completed_releases(&h.engine);
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].amount, m(20_000));
    assert_eq!(releases[0].to_user, Some(supplier));
}

#[tokio::test]
async fn test_auto_validation_sweep_releases_exactly_once() {
    let h = harness();
    let mission = MissionId::new();
    let worksite = WorksiteId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    h.engine
        .create_escrow(mission, client, artisan, m(0), m(30_000))
        .await
        .unwrap();
    let milestones = h
        .engine
        .register_payment_plan(worksite, mission, vec![("Foundation".to_string(), m(30_000))])
        .unwrap();
    assert_eq!(milestones.len(), 1);

    let submitted_at = Timestamp::now();
    h.engine
        .submit_milestone(milestones[0].id, proof(), submitted_at)
        .unwrap();

    // The boundary second does not trigger; strictly past it does.
    let at_deadline = submitted_at.offset(chrono::Duration::hours(72));
    assert_eq!(h.engine.run_auto_validation_sweep(at_deadline).await.unwrap(), 0);

    let past_deadline = submitted_at.offset(chrono::Duration::hours(73));
    assert_eq!(h.engine.run_auto_validation_sweep(past_deadline).await.unwrap(), 1);
    assert_eq!(h.engine.run_auto_validation_sweep(past_deadline).await.unwrap(), 0);
    assert_eq!(h.engine.run_auto_validation_sweep(past_deadline).await.unwrap(), 0);

    let milestone = h.engine.milestone(milestones[0].id).unwrap();
    assert_eq!(milestone.status, MilestoneStatus::AutoValidated);

    let escrow = h.engine.escrow_for_mission(mission).unwrap();
    assert_eq!(escrow.labor_released, m(30_000));
    assert_eq!(escrow.status, EscrowStatus::Released);
}

#[tokio::test]
async fn test_webhook_and_poll_converge_on_one_transition() {
    let h = harness();
    let mission = MissionId::new();
    let worksite = WorksiteId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    h.engine
        .create_escrow(mission, client, artisan, m(0), m(30_000))
        .await
        .unwrap();
    let milestones = h
        .engine
        .register_payment_plan(worksite, mission, vec![("Roofing".to_string(), m(30_000))])
        .unwrap();
    let now = Timestamp::now();
    h.engine
        .submit_milestone(milestones[0].id, proof(), now)
        .unwrap();
    let release = h
        .engine
        .validate_milestone(milestones[0].id, client, now)
        .await
        .unwrap();

    // The payout was the most recent initiation.
    let provider_ref = h.sandbox.last_reference().unwrap();
    let report = StatusReport {
        transaction_id: provider_ref,
        status: ProviderStatus::Completed,
        reference: None,
        error_message: None,
    };
    let (body, sig) = h.sandbox.signed_webhook(&report);

    let first = h
        .engine
        .ingest_webhook(ProviderKind::Sandbox, &body, &sig)
        .unwrap();
    assert!(first.applied());
    // The poll arriving after the webhook finds the row terminal.
    h.engine
        .run_reconciliation_sweep(Timestamp::now())
        .await
        .unwrap();
    // So does a redelivered webhook.
    let replay = h
        .engine
        .ingest_webhook(ProviderKind::Sandbox, &body, &sig)
        .unwrap();
    assert!(!replay.applied());

    let row = h.engine.transaction(release.id).unwrap();
    assert_eq!(row.status, TransactionStatus::Completed);
    assert!(row.completed_at.is_some());
    assert_eq!(completed_releases(&h.engine).len(), 1);
}

#[tokio::test]
async fn test_partial_refund_splits_and_rejects_replay() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan, arbiter) = (UserId::new(), UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(0), m(60_000))
        .await
        .unwrap();

    let dispute = h
        .engine
        .file_dispute(mission, client, artisan, DisputeKind::Quality, "tiles cracked")
        .unwrap();
    let now = Timestamp::now();
    h.engine.escalate_dispute(dispute.id, now).unwrap();

    let outcome = h
        .engine
        .execute_decision(
            dispute.id,
            arbiter,
            ArbitrationDecision::PartialRefund(m(40_000)),
            "two of three rooms unusable",
            now,
        )
        .await
        .unwrap();
    assert_eq!(outcome.refund_to_client, m(40_000));
    assert_eq!(outcome.pay_to_artisan, m(20_000));
    assert_eq!(outcome.status, EscrowStatus::Released);

    let escrow = h.engine.escrow(escrow.id).unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);
    assert!(escrow.remaining().is_zero());

    let refunds: Vec<_> = h
        .engine
        .transactions()
        .into_iter()
        .filter(|t| t.kind == TransactionType::Refund)
        .collect();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, m(40_000));
    assert_eq!(refunds[0].to_user, Some(client));

    let err = h
        .engine
        .execute_decision(
            dispute.id,
            arbiter,
            ArbitrationDecision::RefundClient,
            "second thoughts",
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn test_duplicate_escrow_for_mission_conflicts() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    h.engine
        .create_escrow(mission, client, artisan, m(10_000), m(0))
        .await
        .unwrap();
    let err = h
        .engine
        .create_escrow(mission, client, artisan, m(10_000), m(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn test_bad_webhook_signature_changes_nothing() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(10_000), m(0))
        .await
        .unwrap();
    let deposit = h
        .engine
        .transactions()
        .into_iter()
        .find(|t| t.kind == TransactionType::Deposit)
        .unwrap();
    assert_eq!(deposit.status, TransactionStatus::Pending);

    let report = StatusReport {
        transaction_id: h.sandbox.last_reference().unwrap(),
        status: ProviderStatus::Completed,
        reference: None,
        error_message: None,
    };
    let (body, _) = h.sandbox.signed_webhook(&report);
    let err = h
        .engine
        .ingest_webhook(ProviderKind::Sandbox, &body, "deadbeef")
        .unwrap_err();
    assert!(matches!(err, EngineError::Signature(_)));

    let row = h.engine.transaction(deposit.id).unwrap();
    assert_eq!(row.status, TransactionStatus::Pending);
    assert_eq!(h.engine.escrow(escrow.id).unwrap().status, EscrowStatus::Blocked);
}

#[tokio::test]
async fn test_voucher_cancellation_returns_reservation() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(50_000), m(0))
        .await
        .unwrap();
    let now = Timestamp::now();
    let voucher = h
        .engine
        .issue_voucher(escrow.id, artisan, m(20_000), vec![], None, now)
        .unwrap();
    assert_eq!(
        h.engine.escrow(escrow.id).unwrap().materials_reserved,
        m(20_000)
    );

    let remainder = h.engine.cancel_voucher(voucher.id).unwrap();
    assert_eq!(remainder, m(20_000));
    assert_eq!(
        h.engine.voucher(voucher.id).unwrap().status,
        VoucherStatus::Cancelled
    );
    let escrow_after = h.engine.escrow(escrow.id).unwrap();
    assert!(escrow_after.materials_reserved.is_zero());

    // The full allowance is available again.
    h.engine
        .issue_voucher(escrow.id, artisan, m(50_000), vec![], None, now)
        .unwrap();
}

#[tokio::test]
async fn test_supplier_restriction_rejects_and_audits() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan) = (UserId::new(), UserId::new());
    let (authorized, stranger) = (UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(30_000), m(0))
        .await
        .unwrap();
    let now = Timestamp::now();
    let voucher = h
        .engine
        .issue_voucher(escrow.id, artisan, m(30_000), vec![authorized], None, now)
        .unwrap();

    let err = h
        .engine
        .validate_voucher(&voucher.code, stranger, m(10_000), None, None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    // The rejection landed on the audit trail; the voucher is untouched.
    let validations = h.engine.validations().unwrap();
    assert_eq!(validations.len(), 1);
    assert_eq!(validations[0].validation_status, ValidationStatus::Rejected);
    assert_eq!(
        h.engine.voucher(voucher.id).unwrap().status,
        VoucherStatus::Active
    );
    assert!(h.engine.escrow(escrow.id).unwrap().materials_released.is_zero());
}

#[tokio::test]
async fn test_distant_redemption_flags_but_settles() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan, supplier) = (UserId::new(), UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(30_000), m(0))
        .await
        .unwrap();
    let now = Timestamp::now();
    let voucher = h
        .engine
        .issue_voucher(escrow.id, artisan, m(30_000), vec![], None, now)
        .unwrap();

    // Douala to Yaounde, far past any plausible materials run.
    let artisan_loc = GeoPoint {
        lat: 4.0511,
        lon: 9.7679,
        accuracy_meters: None,
    };
    let supplier_loc = GeoPoint {
        lat: 3.8480,
        lon: 11.5021,
        accuracy_meters: None,
    };
    let validation = h
        .engine
        .validate_voucher(
            &voucher.code,
            supplier,
            m(30_000),
            Some(artisan_loc),
            Some(supplier_loc),
            now,
        )
        .await
        .unwrap();
    assert_eq!(validation.validation_status, ValidationStatus::Flagged);
    assert!(validation.distance_meters.unwrap() > 100_000.0);
    assert_eq!(
        h.engine.escrow(escrow.id).unwrap().materials_released,
        m(30_000)
    );
}

#[tokio::test]
async fn test_distance_cap_rejects_redemption() {
    let h = harness_with(SettlementConfig {
        reconciliation_grace_secs: 0,
        max_supplier_distance_meters: Some(5_000.0),
        ..SettlementConfig::default()
    });
    let mission = MissionId::new();
    let (client, artisan, supplier) = (UserId::new(), UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(30_000), m(0))
        .await
        .unwrap();
    let now = Timestamp::now();
    let voucher = h
        .engine
        .issue_voucher(escrow.id, artisan, m(30_000), vec![], None, now)
        .unwrap();

    let artisan_loc = GeoPoint {
        lat: 4.0511,
        lon: 9.7679,
        accuracy_meters: None,
    };
    let supplier_loc = GeoPoint {
        lat: 4.1511,
        lon: 9.7679,
        accuracy_meters: None,
    };
    let err = h
        .engine
        .validate_voucher(
            &voucher.code,
            supplier,
            m(30_000),
            Some(artisan_loc),
            Some(supplier_loc),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
    assert_eq!(
        h.engine.voucher(voucher.id).unwrap().status,
        VoucherStatus::Active
    );
}

#[tokio::test]
async fn test_freeze_reopen_then_final_ruling() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan, arbiter) = (UserId::new(), UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(0), m(50_000))
        .await
        .unwrap();
    let dispute = h
        .engine
        .file_dispute(mission, client, artisan, DisputeKind::Fraud, "forged receipts")
        .unwrap();
    let now = Timestamp::now();
    h.engine.escalate_dispute(dispute.id, now).unwrap();

    let frozen = h
        .engine
        .execute_decision(
            dispute.id,
            arbiter,
            ArbitrationDecision::FreezeFunds,
            "pending police report",
            now,
        )
        .await
        .unwrap();
    assert_eq!(frozen.status, EscrowStatus::Frozen);
    assert!(frozen.refund_to_client.is_zero());
    assert!(frozen.pay_to_artisan.is_zero());
    assert_eq!(
        h.engine.dispute(dispute.id).unwrap().status,
        DisputeStatus::Resolved
    );

    h.engine.reopen_frozen_dispute(dispute.id, now).unwrap();
    assert_eq!(
        h.engine.dispute(dispute.id).unwrap().status,
        DisputeStatus::InArbitration
    );

    let settled = h
        .engine
        .execute_decision(
            dispute.id,
            arbiter,
            ArbitrationDecision::PayArtisan,
            "receipts verified genuine",
            now,
        )
        .await
        .unwrap();
    assert_eq!(settled.status, EscrowStatus::Released);
    assert_eq!(settled.pay_to_artisan, m(50_000));
    assert_eq!(h.engine.escrow(escrow.id).unwrap().status, EscrowStatus::Released);
}

#[tokio::test]
async fn test_refund_ruling_cancels_outstanding_vouchers() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan, arbiter) = (UserId::new(), UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(40_000), m(10_000))
        .await
        .unwrap();
    let now = Timestamp::now();
    let voucher = h
        .engine
        .issue_voucher(escrow.id, artisan, m(25_000), vec![], None, now)
        .unwrap();

    let dispute = h
        .engine
        .file_dispute(mission, client, artisan, DisputeKind::Delay, "site abandoned")
        .unwrap();
    h.engine.escalate_dispute(dispute.id, now).unwrap();
    let outcome = h
        .engine
        .execute_decision(
            dispute.id,
            arbiter,
            ArbitrationDecision::RefundClient,
            "no work performed",
            now,
        )
        .await
        .unwrap();
    assert_eq!(outcome.refund_to_client, m(50_000));
    assert_eq!(outcome.status, EscrowStatus::Refunded);
    assert_eq!(
        h.engine.voucher(voucher.id).unwrap().status,
        VoucherStatus::Cancelled
    );

    // The cancelled code no longer redeems.
    let supplier = UserId::new();
    let err = h
        .engine
        .validate_voucher(&voucher.code, supplier, m(5_000), None, None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn test_suspended_user_cannot_move_funds() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan) = (UserId::new(), UserId::new());
    h.directory.suspend(client);

    let err = h
        .engine
        .create_escrow(mission, client, artisan, m(10_000), m(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UserNotEligible(_)));
    assert!(h.engine.transactions().is_empty());
}

#[tokio::test]
async fn test_plan_must_sum_to_labor_budget() {
    let h = harness();
    let mission = MissionId::new();
    let worksite = WorksiteId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    h.engine
        .create_escrow(mission, client, artisan, m(0), m(30_000))
        .await
        .unwrap();
    let err = h
        .engine
        .register_payment_plan(
            worksite,
            mission,
            vec![
                ("Foundation".to_string(), m(10_000)),
                ("Walls".to_string(), m(10_000)),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_contested_milestone_is_not_swept() {
    let h = harness();
    let mission = MissionId::new();
    let worksite = WorksiteId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    h.engine
        .create_escrow(mission, client, artisan, m(0), m(30_000))
        .await
        .unwrap();
    let milestones = h
        .engine
        .register_payment_plan(worksite, mission, vec![("Plumbing".to_string(), m(30_000))])
        .unwrap();
    let submitted_at = Timestamp::now();
    h.engine
        .submit_milestone(milestones[0].id, proof(), submitted_at)
        .unwrap();
    h.engine
        .contest_milestone(milestones[0].id, "pipes not to spec", submitted_at)
        .unwrap();

    let past_deadline = submitted_at.offset(chrono::Duration::hours(80));
    assert_eq!(h.engine.run_auto_validation_sweep(past_deadline).await.unwrap(), 0);
    let escrow = h.engine.escrow_for_mission(mission).unwrap();
    assert!(escrow.labor_released.is_zero());
}

#[tokio::test]
async fn test_only_the_client_validates() {
    let h = harness();
    let mission = MissionId::new();
    let worksite = WorksiteId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    h.engine
        .create_escrow(mission, client, artisan, m(0), m(30_000))
        .await
        .unwrap();
    let milestones = h
        .engine
        .register_payment_plan(worksite, mission, vec![("Painting".to_string(), m(30_000))])
        .unwrap();
    let now = Timestamp::now();
    h.engine
        .submit_milestone(milestones[0].id, proof(), now)
        .unwrap();

    let err = h
        .engine
        .validate_milestone(milestones[0].id, artisan, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UserNotEligible(_)));
    assert_eq!(
        h.engine.milestone(milestones[0].id).unwrap().status,
        MilestoneStatus::Submitted
    );
}

#[tokio::test]
async fn test_expiry_sweep_returns_remainders() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan, supplier) = (UserId::new(), UserId::new(), UserId::new());

    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(50_000), m(0))
        .await
        .unwrap();
    let issued_at = Timestamp::now();
    let voucher = h
        .engine
        .issue_voucher(
            escrow.id,
            artisan,
            m(30_000),
            vec![],
            Some(chrono::Duration::days(7)),
            issued_at,
        )
        .unwrap();
    h.engine
        .validate_voucher(&voucher.code, supplier, m(12_000), None, None, issued_at)
        .await
        .unwrap();
    assert_eq!(
        h.engine.voucher(voucher.id).unwrap().status,
        VoucherStatus::PartiallyUsed
    );

    let past_expiry = issued_at.offset(chrono::Duration::days(8));
    assert_eq!(h.engine.run_expiry_sweep(past_expiry).unwrap(), 1);
    assert_eq!(h.engine.run_expiry_sweep(past_expiry).unwrap(), 0);

    let voucher = h.engine.voucher(voucher.id).unwrap();
    assert_eq!(voucher.status, VoucherStatus::Expired);
    let escrow = h.engine.escrow(escrow.id).unwrap();
    assert_eq!(escrow.materials_released, m(12_000));
    assert!(escrow.materials_reserved.is_zero());
}

#[tokio::test]
async fn test_rejected_deposit_leaves_no_escrow_behind() {
    let h = harness();
    let mission = MissionId::new();
    let worksite = WorksiteId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    h.sandbox.reject_next_initiation("wallet closed");
    let err = h
        .engine
        .create_escrow(mission, client, artisan, m(10_000), m(30_000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Provider(_)));

    // The escrow never took effect, so nothing can attach to it.
    let lookup = h.engine.escrow_for_mission(mission).unwrap_err();
    assert!(matches!(lookup, EngineError::NotFound(_)));
    let plan = h
        .engine
        .register_payment_plan(worksite, mission, vec![("Foundation".to_string(), m(30_000))])
        .unwrap_err();
    assert!(matches!(plan, EngineError::NotFound(_)));

    let deposit = h
        .engine
        .transactions()
        .into_iter()
        .find(|t| t.kind == TransactionType::Deposit)
        .unwrap();
    assert_eq!(deposit.status, TransactionStatus::Failed);

    // The mission slot is free again; a retry funds normally.
    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(10_000), m(30_000))
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Blocked);
    h.engine
        .register_payment_plan(worksite, mission, vec![("Foundation".to_string(), m(30_000))])
        .unwrap();
}

#[tokio::test]
async fn test_unknown_initiation_outcome_defers_to_polling() {
    let h = harness();
    let mission = MissionId::new();
    let (client, artisan) = (UserId::new(), UserId::new());

    h.sandbox.fail_next_initiation("simulated timeout");
    let escrow = h
        .engine
        .create_escrow(mission, client, artisan, m(10_000), m(0))
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Blocked);

    let deposit = h
        .engine
        .transactions()
        .into_iter()
        .find(|t| t.kind == TransactionType::Deposit)
        .unwrap();
    assert_eq!(deposit.status, TransactionStatus::Pending);
    assert!(deposit.provider_reference.is_none());

    // The sweep probes with the internal reference and the sandbox
    // answers COMPLETED for unscripted references.
    let resolved = h
        .engine
        .run_reconciliation_sweep(Timestamp::now())
        .await
        .unwrap();
    assert_eq!(resolved, 1);
    let row = h.engine.transaction(deposit.id).unwrap();
    assert_eq!(row.status, TransactionStatus::Completed);
}
