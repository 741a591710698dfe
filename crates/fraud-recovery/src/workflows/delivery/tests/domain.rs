use chrono::Duration;

use super::common::*;
use crate::workflows::delivery::{
    ConfirmationOutcome, ConfirmationSource, DeliverySession, DeliveryState, PaymentInstrument,
    PendingPayment, SessionId, TransactionReference, TransitionError,
};
use crate::workflows::intake::{CaseIntakeGuard, MoneyAmount};

fn drafted() -> DeliverySession {
    let case = CaseIntakeGuard::default()
        .validate(submission(), now())
        .expect("valid submission");
    DeliverySession::draft(
        SessionId("case-test".to_string()),
        case,
        Vec::new(),
        MoneyAmount::from_cents(4990),
        now(),
    )
}

fn pending(reference: &str) -> PendingPayment {
    PendingPayment {
        reference: TransactionReference(reference.to_string()),
        instrument: PaymentInstrument {
            qr_code_payload: format!("qr:{reference}"),
            copy_paste_code: format!("000201{reference}"),
        },
        amount: MoneyAmount::from_cents(4990),
        requested_at: now(),
        expires_at: None,
    }
}

#[test]
fn drafted_session_cannot_skip_payment() {
    let mut session = drafted();

    let err = session.deliver(now()).expect_err("delivery before payment");
    assert_eq!(
        err,
        TransitionError::InvalidTransition {
            from: DeliveryState::Drafted,
            to: DeliveryState::Delivered,
        }
    );

    let err = session
        .record_payment(confirmation("tx-1", ConfirmationSource::Webhook))
        .expect_err("no payment requested");
    assert_eq!(err, TransitionError::NoPendingPayment);
    assert_eq!(session.state(), DeliveryState::Drafted);
    assert!(!session.is_unlocked());
}

#[test]
fn confirmation_for_foreign_reference_is_rejected() {
    let mut session = drafted();
    session
        .begin_payment(pending("tx-1"), now())
        .expect("payment requested");

    let err = session
        .record_payment(confirmation("tx-404", ConfirmationSource::Poll))
        .expect_err("foreign reference");
    assert!(matches!(err, TransitionError::UnknownReference(_)));
    assert_eq!(session.state(), DeliveryState::AwaitingPayment);
}

#[test]
fn superseded_reference_still_unlocks() {
    let mut session = drafted();
    session
        .begin_payment(pending("tx-1"), now())
        .expect("first request");
    session
        .begin_payment(pending("tx-2"), now() + Duration::minutes(1))
        .expect("second request");

    assert_eq!(
        session.superseded_references(),
        &[TransactionReference("tx-1".to_string())]
    );
    let outcome = session
        .record_payment(confirmation("tx-1", ConfirmationSource::Webhook))
        .expect("late confirmation of the first request");
    assert_eq!(outcome, ConfirmationOutcome::Applied);
    assert_eq!(session.state(), DeliveryState::Paid);
}

#[test]
fn paid_session_refuses_new_requests_and_repeats_confirmations() {
    let mut session = drafted();
    session
        .begin_payment(pending("tx-1"), now())
        .expect("payment requested");
    session
        .record_payment(confirmation("tx-1", ConfirmationSource::Webhook))
        .expect("confirmed");
    session.deliver(now()).expect("delivered");

    assert_eq!(
        session.begin_payment(pending("tx-2"), now()),
        Err(TransitionError::AlreadyPaid)
    );
    assert_eq!(
        session.record_payment(confirmation("tx-1", ConfirmationSource::Poll)),
        Ok(ConfirmationOutcome::AlreadyConfirmed)
    );
    assert!(session.deliver(now()).is_err());

    let states: Vec<DeliveryState> = session.history().iter().map(|step| step.to).collect();
    assert_eq!(
        states,
        vec![
            DeliveryState::Drafted,
            DeliveryState::AwaitingPayment,
            DeliveryState::Paid,
            DeliveryState::Delivered,
        ]
    );
    assert!(session.is_unlocked());
}

#[test]
fn history_never_moves_backwards() {
    let mut session = drafted();
    session
        .begin_payment(pending("tx-1"), now())
        .expect("first request");
    session
        .begin_payment(pending("tx-2"), now())
        .expect("superseding request");
    session
        .record_payment(confirmation("tx-2", ConfirmationSource::Poll))
        .expect("confirmed");
    session.deliver(now()).expect("delivered");

    for step in session.history() {
        if let Some(from) = step.from {
            assert!(from <= step.to, "{from} -> {} regressed", step.to);
        }
    }
}
