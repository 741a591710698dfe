use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    ConfirmationOutcome, ConfirmationSource, DeliverySession, DeliveryState, PaymentConfirmation,
    PendingPayment, SessionId, StateTransition, TransactionReference, TransitionError,
};
use super::gateway::{ChargeStatus, PaymentGateway, PaymentGatewayError, PaymentRequest};
use super::guide::CompletionGuide;
use super::repository::{
    DocumentEmail, DocumentMailer, RepositoryError, SessionRepository,
};
use crate::config::AppConfig;
use crate::workflows::catalog::IncidentCatalog;
use crate::workflows::documents::{bundle, AssembledDocument, AssemblyExtras, DocumentAssembler};
use crate::workflows::intake::{CaseIntakeGuard, CaseSubmission, IntakeRejected, MoneyAmount};
use crate::workflows::render::PaginatedRenderer;

/// Product settings the workflow needs from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySettings {
    pub brand: String,
    pub product_code: String,
    pub price: MoneyAmount,
}

impl DeliverySettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            brand: config.documents.brand.clone(),
            product_code: config.payment.product_code.clone(),
            price: config.payment.price,
        }
    }
}

/// Service composing intake, assembly, rendering, and the payment collaborator.
pub struct DeliveryWorkflow<R, G, M> {
    guard: Arc<CaseIntakeGuard>,
    catalog: IncidentCatalog,
    assembler: Arc<DocumentAssembler>,
    renderer: Arc<PaginatedRenderer>,
    repository: Arc<R>,
    gateway: Arc<G>,
    mailer: Arc<M>,
    settings: DeliverySettings,
    /// Serialises read-modify-write cycles on sessions.
    session_lock: Mutex<()>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("case-{id:06}"))
}

impl<R, G, M> DeliveryWorkflow<R, G, M>
where
    R: SessionRepository + 'static,
    G: PaymentGateway + 'static,
    M: DocumentMailer + 'static,
{
    pub fn new(repository: Arc<R>, gateway: Arc<G>, mailer: Arc<M>, settings: DeliverySettings) -> Self {
        let renderer = PaginatedRenderer::new(settings.brand.clone());
        Self {
            guard: Arc::new(CaseIntakeGuard::default()),
            catalog: IncidentCatalog::standard(),
            assembler: Arc::new(DocumentAssembler::new()),
            renderer: Arc::new(renderer),
            repository,
            gateway,
            mailer,
            settings,
            session_lock: Mutex::new(()),
        }
    }

    pub fn with_assembler(mut self, assembler: DocumentAssembler) -> Self {
        self.assembler = Arc::new(assembler);
        self
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    /// Validate a submission, assemble its documents, and store a `Drafted` session.
    pub fn draft(
        &self,
        submission: CaseSubmission,
        now: NaiveDateTime,
    ) -> Result<DeliverySession, DeliveryError> {
        self.draft_with(submission, &AssemblyExtras::default(), now)
    }

    /// [`Self::draft`] with kind-specific extras such as negotiated demands.
    pub fn draft_with(
        &self,
        submission: CaseSubmission,
        extras: &AssemblyExtras,
        now: NaiveDateTime,
    ) -> Result<DeliverySession, DeliveryError> {
        let case = self.guard.validate(submission, now)?;
        let set = self.catalog.document_set(case.incident.incident_type);
        let documents = self
            .assembler
            .assemble_with(&case, &set, extras, now.date());

        let session = DeliverySession::draft(
            next_session_id(),
            case,
            documents,
            self.settings.price,
            now,
        );
        let stored = self.repository.insert(session)?;
        info!(
            session = %stored.id,
            incident = %stored.case.incident.incident_type,
            documents = stored.documents.len(),
            "delivery session drafted"
        );
        Ok(stored)
    }

    /// Ask the processor for a charge. Failures leave the session and its draft untouched.
    pub async fn request_payment(
        &self,
        id: &SessionId,
        now: NaiveDateTime,
    ) -> Result<DeliverySession, DeliveryError> {
        let session = self.fetch(id)?;
        if matches!(
            session.state(),
            DeliveryState::Paid | DeliveryState::Delivered
        ) {
            return Err(TransitionError::AlreadyPaid.into());
        }

        let request = PaymentRequest {
            session_id: session.id.clone(),
            customer_name: session.case.person.full_name.clone(),
            customer_email: session.case.person.email.clone(),
            national_id: session.case.person.national_id.to_string(),
            product_code: self.settings.product_code.clone(),
            amount: session.amount_due,
        };
        let charge = match self.gateway.create_charge(&request).await {
            Ok(charge) => charge,
            Err(err) => {
                warn!(session = %id, error = %err, "payment request failed");
                return Err(err.into());
            }
        };

        let _lock = self.lock();
        let mut session = self.fetch(id)?;
        session.begin_payment(
            PendingPayment {
                reference: charge.reference.clone(),
                instrument: charge.instrument,
                amount: charge.amount,
                requested_at: now,
                expires_at: charge.expires_at,
            },
            now,
        )?;
        self.repository.update(session.clone())?;
        info!(
            session = %id,
            reference = %charge.reference,
            superseded = session.superseded_references().len(),
            "payment requested"
        );
        Ok(session)
    }

    /// Single entry point into `Paid`. Both the webhook and the poller land here.
    pub fn confirm_payment(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<ConfirmationReceipt, DeliveryError> {
        let lock = self.lock();
        let mut session = self
            .repository
            .find_by_reference(&confirmation.reference)?
            .ok_or_else(|| DeliveryError::UnknownReference(confirmation.reference.clone()))?;

        let reference = confirmation.reference.clone();
        let source = confirmation.source;
        let settled_at = confirmation.settled_at;
        let outcome = session.record_payment(confirmation)?;

        if outcome == ConfirmationOutcome::AlreadyConfirmed {
            debug!(session = %session.id, reference = %reference, "duplicate payment confirmation ignored");
            return Ok(ConfirmationReceipt {
                state: session.state(),
                outcome,
                session_id: session.id,
            });
        }

        session.deliver(settled_at)?;
        self.repository.update(session.clone())?;
        drop(lock);

        info!(
            session = %session.id,
            reference = %reference,
            source = ?source,
            "payment confirmed, documents unlocked"
        );
        self.mail_documents(&session);

        Ok(ConfirmationReceipt {
            state: session.state(),
            outcome,
            session_id: session.id,
        })
    }

    /// Processor push for `reference`. The push only triggers a status check; the
    /// processor's own answer decides, and its settlement time is the one recorded.
    pub async fn verify_pushed_payment(
        &self,
        reference: &TransactionReference,
    ) -> Result<ConfirmationReceipt, DeliveryError> {
        let session = self
            .repository
            .find_by_reference(reference)?
            .ok_or_else(|| DeliveryError::UnknownReference(reference.clone()))?;

        match self.gateway.charge_status(reference).await? {
            ChargeStatus::Settled { settled_at } => self.confirm_payment(PaymentConfirmation {
                reference: reference.clone(),
                settled_at,
                source: ConfirmationSource::Webhook,
            }),
            status => {
                warn!(
                    session = %session.id,
                    reference = %reference,
                    status = status.label(),
                    "payment push not backed by processor settlement"
                );
                Err(DeliveryError::Unsettled {
                    reference: reference.clone(),
                    status: status.label(),
                })
            }
        }
    }

    /// Ask the processor once whether the current charge settled.
    pub async fn poll_payment(
        &self,
        id: &SessionId,
        now: NaiveDateTime,
    ) -> Result<PollOutcome, DeliveryError> {
        let session = self.fetch(id)?;
        let reference = match session.state() {
            DeliveryState::Drafted => return Err(TransitionError::NoPendingPayment.into()),
            DeliveryState::Paid | DeliveryState::Delivered => {
                return Ok(PollOutcome::Settled {
                    state: session.state(),
                })
            }
            DeliveryState::AwaitingPayment => match session.pending_payment() {
                Some(pending) => pending.reference.clone(),
                None => return Err(TransitionError::NoPendingPayment.into()),
            },
        };

        match self.gateway.charge_status(&reference).await? {
            ChargeStatus::Pending => {
                debug!(session = %id, reference = %reference, at = %now, "payment still pending");
                Ok(PollOutcome::Pending)
            }
            ChargeStatus::Expired => {
                info!(session = %id, reference = %reference, "payment request expired");
                Ok(PollOutcome::Expired)
            }
            ChargeStatus::Settled { settled_at } => {
                let receipt = self.confirm_payment(PaymentConfirmation {
                    reference,
                    settled_at,
                    source: ConfirmationSource::Poll,
                })?;
                Ok(PollOutcome::Settled {
                    state: receipt.state,
                })
            }
        }
    }

    pub fn get(&self, id: &SessionId) -> Result<DeliverySession, DeliveryError> {
        self.fetch(id)
    }

    /// Purchaser-facing view; documents stay redacted until delivery.
    pub fn view(&self, id: &SessionId) -> Result<DeliveryView, DeliveryError> {
        let session = self.fetch(id)?;
        Ok(self.view_of(&session))
    }

    pub fn view_of(&self, session: &DeliverySession) -> DeliveryView {
        let unlocked = session.is_unlocked();
        let documents = if unlocked {
            session.documents.clone()
        } else {
            session
                .documents
                .iter()
                .map(AssembledDocument::redacted)
                .collect()
        };
        let guide = unlocked.then(|| {
            let entry = self.catalog.entry(session.case.incident.incident_type);
            CompletionGuide::build(entry, &session.documents)
        });

        DeliveryView {
            session_id: session.id.clone(),
            state: session.state(),
            state_label: session.state().label(),
            amount_due: session.amount_due,
            amount_due_display: session.amount_due.to_string(),
            payment: session.pending_payment().map(|pending| PaymentView {
                reference: pending.reference.clone(),
                qr_code_payload: pending.instrument.qr_code_payload.clone(),
                copy_paste_code: pending.instrument.copy_paste_code.clone(),
                expires_at: pending.expires_at,
            }),
            locked: !unlocked,
            documents,
            guide,
            history: session.history().to_vec(),
        }
    }

    /// Export unlocked documents. Refused before delivery.
    pub fn export(
        &self,
        id: &SessionId,
        format: ExportFormat,
    ) -> Result<ExportedDocuments, DeliveryError> {
        let session = self.fetch(id)?;
        if !session.is_unlocked() {
            return Err(DeliveryError::Locked {
                state: session.state(),
            });
        }

        let body = match format {
            ExportFormat::Clipboard => bundle(&session.documents),
            ExportFormat::Text => self
                .renderer
                .render(&session.documents, session.created_at.date())
                .to_plain_text(),
            ExportFormat::Html => self
                .renderer
                .render(&session.documents, session.created_at.date())
                .to_html(),
        };
        debug!(session = %id, format = format.label(), "documents exported");

        Ok(ExportedDocuments {
            file_name: format!("{}-documents.{}", session.id, format.extension()),
            content_type: format.content_type(),
            body,
        })
    }

    fn fetch(&self, id: &SessionId) -> Result<DeliverySession, DeliveryError> {
        let session = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(session)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.session_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn mail_documents(&self, session: &DeliverySession) {
        let email = DocumentEmail {
            session_id: session.id.clone(),
            recipient: session.case.person.email.clone(),
            subject: format!("{}: your documents are ready", self.settings.brand),
            documents: session.documents.clone(),
        };
        if let Err(err) = self.mailer.send(email) {
            warn!(session = %session.id, error = %err, "document e-mail could not be sent");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationReceipt {
    pub session_id: SessionId,
    pub outcome: ConfirmationOutcome,
    pub state: DeliveryState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    Pending,
    Expired,
    Settled { state: DeliveryState },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentView {
    pub reference: TransactionReference,
    pub qr_code_payload: String,
    pub copy_paste_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryView {
    pub session_id: SessionId,
    pub state: DeliveryState,
    pub state_label: &'static str,
    pub amount_due: MoneyAmount,
    pub amount_due_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentView>,
    pub locked: bool,
    pub documents: Vec<AssembledDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide: Option<CompletionGuide>,
    pub history: Vec<StateTransition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Text,
    Clipboard,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "html" => Some(Self::Html),
            "txt" | "text" => Some(Self::Text),
            "clipboard" => Some(Self::Clipboard),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "txt",
            Self::Clipboard => "clipboard",
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text | Self::Clipboard => "txt",
        }
    }

    pub fn content_type(self) -> mime::Mime {
        match self {
            Self::Html => mime::TEXT_HTML_UTF_8,
            Self::Text | Self::Clipboard => mime::TEXT_PLAIN_UTF_8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedDocuments {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub body: String,
}

/// Error raised by the delivery workflow.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Intake(#[from] IntakeRejected),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Gateway(#[from] PaymentGatewayError),
    #[error("no session owns transaction reference {0}")]
    UnknownReference(TransactionReference),
    #[error("documents are locked until payment is confirmed (current state: {state})")]
    Locked { state: DeliveryState },
    #[error("processor reports transaction {reference} as {status}")]
    Unsettled {
        reference: TransactionReference,
        status: &'static str,
    },
}
