use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::workflows::delivery::{
    ChargeStatus, ConfirmationSource, DeliverySession, DeliverySettings, DeliveryWorkflow,
    DocumentEmail, DocumentMailer, MailerError, PaymentCharge, PaymentConfirmation,
    PaymentGateway, PaymentGatewayError, PaymentInstrument, PaymentRequest, RepositoryError,
    SessionId, SessionRepository, TransactionReference,
};
use crate::workflows::intake::{
    CaseProgress, CaseSubmission, CounterpartDetails, IncidentSubmission, InstitutionSubmission,
    MoneyAmount, PersonSubmission,
};

pub(super) fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10)
        .expect("valid date")
        .and_hms_opt(20, 0, 0)
        .expect("valid time")
}

pub(super) fn settings() -> DeliverySettings {
    DeliverySettings {
        brand: "Fraud Recovery Kit".to_string(),
        product_code: "fraud-kit-complete".to_string(),
        price: MoneyAmount::from_cents(4990),
    }
}

pub(super) fn submission() -> CaseSubmission {
    CaseSubmission {
        person: PersonSubmission {
            full_name: "Maria Aparecida Souza".to_string(),
            national_id: "529.982.247-25".to_string(),
            address: Some("Rua das Flores, 120, Campinas/SP".to_string()),
            phone: Some("(19) 99876-5432".to_string()),
            email: "maria.souza@example.com".to_string(),
        },
        incident: IncidentSubmission {
            incident_type: "real_time_payment".to_string(),
            occurred_on: Some("2024-03-10".to_string()),
            occurred_at: Some("10:00".to_string()),
            description: "Someone claiming to be from my bank's security team convinced me to move my savings to a 'protected' account by Pix.".to_string(),
            loss_amount: Some(3000.0),
            counterpart: CounterpartDetails {
                name: Some("J. Silva Servicos".to_string()),
                payment_key: Some("silva.servicos@pix.example".to_string()),
                account: None,
                institution: Some("Banco Destino".to_string()),
            },
            reference_numbers: vec!["E00000000202403101000abc".to_string()],
        },
        institution: Some(InstitutionSubmission {
            name: "Banco Exemplo S.A.".to_string(),
            branch: Some("0001".to_string()),
            account: Some("12345-6".to_string()),
        }),
        progress: CaseProgress::default(),
    }
}

pub(super) fn invalid_submission() -> CaseSubmission {
    let mut raw = submission();
    raw.person.national_id = "000.000.000-00".to_string();
    raw.incident.description = "short".to_string();
    raw
}

pub(super) fn confirmation(reference: &str, source: ConfirmationSource) -> PaymentConfirmation {
    PaymentConfirmation {
        reference: TransactionReference(reference.to_string()),
        settled_at: now() + chrono::Duration::minutes(3),
        source,
    }
}

pub(super) type TestWorkflow = DeliveryWorkflow<MemoryRepository, StubGateway, MemoryMailer>;

pub(super) struct Harness {
    pub workflow: Arc<TestWorkflow>,
    pub repository: Arc<MemoryRepository>,
    pub gateway: Arc<StubGateway>,
    pub mailer: Arc<MemoryMailer>,
}

pub(super) fn harness() -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let gateway = Arc::new(StubGateway::default());
    let mailer = Arc::new(MemoryMailer::default());
    let workflow = Arc::new(DeliveryWorkflow::new(
        Arc::clone(&repository),
        Arc::clone(&gateway),
        Arc::clone(&mailer),
        settings(),
    ));
    Harness {
        workflow,
        repository,
        gateway,
        mailer,
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    sessions: Mutex<HashMap<SessionId, DeliverySession>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, session: DeliverySession) -> Result<DeliverySession, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: DeliverySession) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&session.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(session.id.clone(), session);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<DeliverySession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_reference(
        &self,
        reference: &TransactionReference,
    ) -> Result<Option<DeliverySession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|session| session.accepts_reference(reference))
            .cloned())
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _session: DeliverySession) -> Result<DeliverySession, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _session: DeliverySession) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<DeliverySession>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_reference(
        &self,
        _reference: &TransactionReference,
    ) -> Result<Option<DeliverySession>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Processor double: charges are numbered `tx-1`, `tx-2`, ... and stay pending until settled.
#[derive(Default)]
pub(super) struct StubGateway {
    counter: AtomicU64,
    failing: AtomicBool,
    statuses: Mutex<HashMap<String, ChargeStatus>>,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl StubGateway {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn settle(&self, reference: &str, settled_at: NaiveDateTime) {
        self.statuses
            .lock()
            .expect("status mutex poisoned")
            .insert(reference.to_string(), ChargeStatus::Settled { settled_at });
    }

    pub fn expire(&self, reference: &str) {
        self.statuses
            .lock()
            .expect("status mutex poisoned")
            .insert(reference.to_string(), ChargeStatus::Expired);
    }

    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().expect("request mutex poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_charge(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentCharge, PaymentGatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentGatewayError::Transport("processor offline".to_string()));
        }
        self.requests
            .lock()
            .expect("request mutex poisoned")
            .push(request.clone());
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = format!("tx-{id}");
        self.statuses
            .lock()
            .expect("status mutex poisoned")
            .insert(reference.clone(), ChargeStatus::Pending);
        Ok(PaymentCharge {
            reference: TransactionReference(reference.clone()),
            instrument: PaymentInstrument {
                qr_code_payload: format!("qr:{reference}"),
                copy_paste_code: format!("000201{reference}"),
            },
            amount: request.amount,
            expires_at: None,
        })
    }

    async fn charge_status(
        &self,
        reference: &TransactionReference,
    ) -> Result<ChargeStatus, PaymentGatewayError> {
        self.statuses
            .lock()
            .expect("status mutex poisoned")
            .get(&reference.0)
            .copied()
            .ok_or_else(|| PaymentGatewayError::InvalidResponse("unknown charge".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryMailer {
    sent: Mutex<Vec<DocumentEmail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<DocumentEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

impl DocumentMailer for MemoryMailer {
    fn send(&self, delivery: DocumentEmail) -> Result<(), MailerError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(delivery);
        Ok(())
    }
}

pub(super) struct FailingMailer;

impl DocumentMailer for FailingMailer {
    fn send(&self, _delivery: DocumentEmail) -> Result<(), MailerError> {
        Err(MailerError::Transport("smtp refused".to_string()))
    }
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) async fn text_body(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub(super) fn json_request(method: &str, uri: &str, body: &Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn empty_request(method: &str, uri: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}
