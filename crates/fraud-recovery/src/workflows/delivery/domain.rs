use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::workflows::documents::AssembledDocument;
use crate::workflows::intake::{CaseRecord, MoneyAmount};

/// Unlock state of a delivery session. Progresses forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Drafted,
    AwaitingPayment,
    Paid,
    Delivered,
}

impl DeliveryState {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Drafted,
            Self::AwaitingPayment,
            Self::Paid,
            Self::Delivered,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Drafted => "drafted",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Paid => "paid",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processor-issued identifier of one payment request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionReference(pub String);

impl fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the purchaser needs to pay: a scannable code and the same code as copyable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInstrument {
    pub qr_code_payload: String,
    pub copy_paste_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub reference: TransactionReference,
    pub instrument: PaymentInstrument,
    pub amount: MoneyAmount,
    pub requested_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationSource {
    Webhook,
    Poll,
}

/// Explicit settlement notice from the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub reference: TransactionReference,
    pub settled_at: NaiveDateTime,
    pub source: ConfirmationSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub from: Option<DeliveryState>,
    pub to: DeliveryState,
    pub at: NaiveDateTime,
    pub cause: String,
}

/// Result of applying a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    Applied,
    AlreadyConfirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        from: DeliveryState,
        to: DeliveryState,
    },
    #[error("no payment has been requested for this session")]
    NoPendingPayment,
    #[error("transaction reference {0} does not belong to this session")]
    UnknownReference(TransactionReference),
    #[error("documents for this session are already paid")]
    AlreadyPaid,
}

/// Payment-gated delivery of one case's documents.
///
/// State fields are private: the only way forward is through the transition methods,
/// so `Paid` always carries a confirmation and `Delivered` is always preceded by `Paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliverySession {
    pub id: SessionId,
    pub case: CaseRecord,
    pub documents: Vec<AssembledDocument>,
    pub amount_due: MoneyAmount,
    pub created_at: NaiveDateTime,
    state: DeliveryState,
    pending: Option<PendingPayment>,
    superseded: Vec<TransactionReference>,
    confirmation: Option<PaymentConfirmation>,
    history: Vec<StateTransition>,
}

impl DeliverySession {
    pub fn draft(
        id: SessionId,
        case: CaseRecord,
        documents: Vec<AssembledDocument>,
        amount_due: MoneyAmount,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            case,
            documents,
            amount_due,
            created_at: at,
            state: DeliveryState::Drafted,
            pending: None,
            superseded: Vec::new(),
            confirmation: None,
            history: vec![StateTransition {
                from: None,
                to: DeliveryState::Drafted,
                at,
                cause: "documents drafted".to_string(),
            }],
        }
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    pub fn pending_payment(&self) -> Option<&PendingPayment> {
        self.pending.as_ref()
    }

    pub fn superseded_references(&self) -> &[TransactionReference] {
        &self.superseded
    }

    pub fn confirmation(&self) -> Option<&PaymentConfirmation> {
        self.confirmation.as_ref()
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == DeliveryState::Delivered
    }

    /// True for the current reference and any reference it superseded.
    pub fn accepts_reference(&self, reference: &TransactionReference) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| &pending.reference == reference)
            || self.superseded.contains(reference)
    }

    /// Attach a payment request. A second request while awaiting payment supersedes the first.
    pub fn begin_payment(
        &mut self,
        pending: PendingPayment,
        at: NaiveDateTime,
    ) -> Result<(), TransitionError> {
        let cause = match self.state {
            DeliveryState::Drafted => format!("payment requested ({})", pending.reference),
            DeliveryState::AwaitingPayment => {
                let previous = self.pending.take().map(|previous| previous.reference);
                let cause = match &previous {
                    Some(previous) => {
                        format!("payment request {previous} superseded by {}", pending.reference)
                    }
                    None => format!("payment requested ({})", pending.reference),
                };
                self.superseded.extend(previous);
                cause
            }
            DeliveryState::Paid | DeliveryState::Delivered => {
                return Err(TransitionError::AlreadyPaid)
            }
        };

        self.pending = Some(pending);
        self.transition(DeliveryState::AwaitingPayment, at, cause);
        Ok(())
    }

    /// Apply a settlement confirmation. This is the only way into `Paid`.
    pub fn record_payment(
        &mut self,
        confirmation: PaymentConfirmation,
    ) -> Result<ConfirmationOutcome, TransitionError> {
        match self.state {
            DeliveryState::Drafted => Err(TransitionError::NoPendingPayment),
            DeliveryState::AwaitingPayment => {
                if !self.accepts_reference(&confirmation.reference) {
                    return Err(TransitionError::UnknownReference(confirmation.reference));
                }
                let cause = format!(
                    "payment {} confirmed via {}",
                    confirmation.reference,
                    match confirmation.source {
                        ConfirmationSource::Webhook => "webhook",
                        ConfirmationSource::Poll => "poll",
                    }
                );
                let at = confirmation.settled_at;
                self.confirmation = Some(confirmation);
                self.transition(DeliveryState::Paid, at, cause);
                Ok(ConfirmationOutcome::Applied)
            }
            DeliveryState::Paid | DeliveryState::Delivered => {
                if self.accepts_reference(&confirmation.reference) {
                    Ok(ConfirmationOutcome::AlreadyConfirmed)
                } else {
                    Err(TransitionError::UnknownReference(confirmation.reference))
                }
            }
        }
    }

    /// Unlock the documents. Only valid straight after payment.
    pub fn deliver(&mut self, at: NaiveDateTime) -> Result<(), TransitionError> {
        if self.state != DeliveryState::Paid {
            return Err(TransitionError::InvalidTransition {
                from: self.state,
                to: DeliveryState::Delivered,
            });
        }
        self.transition(DeliveryState::Delivered, at, "documents unlocked".to_string());
        Ok(())
    }

    fn transition(&mut self, to: DeliveryState, at: NaiveDateTime, cause: String) {
        self.history.push(StateTransition {
            from: Some(self.state),
            to,
            at,
            cause,
        });
        self.state = to;
    }
}
