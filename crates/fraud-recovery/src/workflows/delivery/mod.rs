//! Payment-gated delivery: `Drafted -> AwaitingPayment -> Paid -> Delivered`.
//!
//! Documents are assembled eagerly when a session is drafted and kept redacted until the
//! payment collaborator confirms settlement through [`DeliveryWorkflow::confirm_payment`].

pub mod domain;
pub mod gateway;
pub mod guide;
pub mod repository;
pub mod router;
pub mod service;
pub mod watcher;

#[cfg(test)]
mod tests;

pub use domain::{
    ConfirmationOutcome, ConfirmationSource, DeliverySession, DeliveryState, PaymentConfirmation,
    PaymentInstrument, PendingPayment, SessionId, StateTransition, TransactionReference,
    TransitionError,
};
pub use gateway::{
    ChargeStatus, HttpPaymentGateway, PaymentCharge, PaymentGateway, PaymentGatewayError,
    PaymentRequest,
};
pub use guide::{CompletionGuide, GuidePathway, GuideStep};
pub use repository::{DocumentEmail, DocumentMailer, MailerError, RepositoryError, SessionRepository};
pub use router::{delivery_router, DraftRequest, WebhookPayload};
pub use service::{
    ConfirmationReceipt, DeliveryError, DeliverySettings, DeliveryView, DeliveryWorkflow,
    ExportFormat, ExportedDocuments, PaymentView, PollOutcome,
};
pub use watcher::PaymentWatcher;
