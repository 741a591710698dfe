use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use fraud_recovery::config::{AppConfig, AppEnvironment, ConfigError};
use fraud_recovery::error::AppError;
use fraud_recovery::workflows::delivery::{
    ChargeStatus, DeliveryError, DeliverySession, DocumentEmail, DocumentMailer,
    HttpPaymentGateway, MailerError, PaymentCharge, PaymentGateway, PaymentGatewayError,
    PaymentInstrument, PaymentRequest, RepositoryError, SessionId, SessionRepository,
    TransactionReference,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, DeliverySession>>>,
}

impl SessionRepository for InMemorySessionRepository {
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
        if guard.contains_key(&session.id) {
            guard.insert(session.id.clone(), session);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
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

/// Mailer that logs each delivery and keeps a copy for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingMailer {
    sent: Arc<Mutex<Vec<DocumentEmail>>>,
}

impl DocumentMailer for LoggingMailer {
    fn send(&self, delivery: DocumentEmail) -> Result<(), MailerError> {
        info!(
            session = %delivery.session_id,
            documents = delivery.documents.len(),
            subject = %delivery.subject,
            "document e-mail queued"
        );
        let mut guard = self.sent.lock().expect("mailer mutex poisoned");
        guard.push(delivery);
        Ok(())
    }
}

impl LoggingMailer {
    pub(crate) fn sent(&self) -> Vec<DocumentEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

/// Local stand-in for the payment processor. Charges settle once `settle_after` has passed.
pub(crate) struct SandboxGateway {
    sequence: AtomicU64,
    settle_after: chrono::Duration,
    charges: Mutex<HashMap<String, NaiveDateTime>>,
}

impl SandboxGateway {
    pub(crate) fn new(settle_after: chrono::Duration) -> Self {
        Self {
            sequence: AtomicU64::new(1),
            settle_after,
            charges: Mutex::new(HashMap::new()),
        }
    }

    fn status_at(&self, reference: &TransactionReference, now: NaiveDateTime) -> Option<ChargeStatus> {
        let guard = self.charges.lock().expect("sandbox mutex poisoned");
        let created_at = *guard.get(&reference.0)?;
        let settled_at = created_at + self.settle_after;
        if now >= settled_at {
            Some(ChargeStatus::Settled { settled_at })
        } else {
            Some(ChargeStatus::Pending)
        }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_charge(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentCharge, PaymentGatewayError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let reference = format!("sbx-{id:06}");
        self.charges
            .lock()
            .expect("sandbox mutex poisoned")
            .insert(reference.clone(), Local::now().naive_local());

        Ok(PaymentCharge {
            reference: TransactionReference(reference.clone()),
            instrument: PaymentInstrument {
                qr_code_payload: format!("sandbox://pay/{reference}?amount={}", request.amount.cents()),
                copy_paste_code: format!(
                    "00020126SANDBOX{reference}{}{:010}",
                    request.product_code,
                    request.amount.cents()
                ),
            },
            amount: request.amount,
            expires_at: None,
        })
    }

    async fn charge_status(
        &self,
        reference: &TransactionReference,
    ) -> Result<ChargeStatus, PaymentGatewayError> {
        self.status_at(reference, Local::now().naive_local())
            .ok_or_else(|| PaymentGatewayError::InvalidResponse(format!("unknown charge {reference}")))
    }
}

/// Processor selected from configuration: the HTTP adapter when a URL is set, the sandbox
/// only for development.
pub(crate) enum ConfiguredGateway {
    Remote(HttpPaymentGateway),
    Sandbox(SandboxGateway),
}

impl ConfiguredGateway {
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        match HttpPaymentGateway::from_config(&config.payment) {
            Ok(gateway) => Ok(Self::Remote(gateway)),
            Err(PaymentGatewayError::NotConfigured)
                if config.environment == AppEnvironment::Development =>
            {
                warn!("no payment processor configured, using sandbox charges");
                Ok(Self::Sandbox(SandboxGateway::new(chrono::Duration::seconds(10))))
            }
            Err(PaymentGatewayError::NotConfigured) => Err(ConfigError::MissingPaymentGateway {
                environment: config.environment,
            }
            .into()),
            Err(err) => Err(DeliveryError::Gateway(err).into()),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::Sandbox(_) => "sandbox",
        }
    }
}

#[async_trait]
impl PaymentGateway for ConfiguredGateway {
    async fn create_charge(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentCharge, PaymentGatewayError> {
        match self {
            Self::Remote(gateway) => gateway.create_charge(request).await,
            Self::Sandbox(gateway) => gateway.create_charge(request).await,
        }
    }

    async fn charge_status(
        &self,
        reference: &TransactionReference,
    ) -> Result<ChargeStatus, PaymentGatewayError> {
        match self {
            Self::Remote(gateway) => gateway.charge_status(reference).await,
            Self::Sandbox(gateway) => gateway.charge_status(reference).await,
        }
    }
}

/// Accepts `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD HH:MM[:SS]`.
pub(crate) fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| format!("failed to parse '{raw}' as YYYY-MM-DDTHH:MM"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fraud_recovery::config::{DocumentConfig, PaymentConfig, ServerConfig, TelemetryConfig};
    use fraud_recovery::workflows::intake::MoneyAmount;

    fn request() -> PaymentRequest {
        PaymentRequest {
            session_id: SessionId("case-000001".to_string()),
            customer_name: "Maria Souza".to_string(),
            customer_email: "maria@example.com".to_string(),
            national_id: "529.982.247-25".to_string(),
            product_code: "fraud-kit-complete".to_string(),
            amount: MoneyAmount::from_cents(4990),
        }
    }

    #[tokio::test]
    async fn sandbox_charges_settle_after_the_delay() {
        let gateway = SandboxGateway::new(chrono::Duration::seconds(30));
        let charge = gateway.create_charge(&request()).await.expect("charge");
        assert_eq!(charge.reference.0, "sbx-000001");
        assert!(charge.instrument.qr_code_payload.contains("amount=4990"));

        let created_at = *gateway
            .charges
            .lock()
            .expect("sandbox mutex")
            .get("sbx-000001")
            .expect("charge recorded");
        assert_eq!(
            gateway.status_at(&charge.reference, created_at),
            Some(ChargeStatus::Pending)
        );
        let later = created_at + chrono::Duration::seconds(30);
        assert_eq!(
            gateway.status_at(&charge.reference, later),
            Some(ChargeStatus::Settled { settled_at: later })
        );
        assert!(gateway
            .charge_status(&TransactionReference("sbx-999999".to_string()))
            .await
            .is_err());
    }

    fn config(environment: AppEnvironment, gateway_url: Option<&str>) -> AppConfig {
        AppConfig {
            environment,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
            documents: DocumentConfig {
                brand: "Fraud Recovery Kit".to_string(),
            },
            payment: PaymentConfig {
                product_code: "fraud-kit-complete".to_string(),
                price: MoneyAmount::from_cents(4990),
                gateway_url: gateway_url.map(str::to_string),
                api_key: None,
                poll_interval_secs: 5,
                request_timeout_secs: 10,
            },
        }
    }

    #[test]
    fn sandbox_is_limited_to_development() {
        let gateway = ConfiguredGateway::from_config(&config(AppEnvironment::Development, None))
            .expect("development may use the sandbox");
        assert_eq!(gateway.label(), "sandbox");

        for environment in [AppEnvironment::Production, AppEnvironment::Test] {
            match ConfiguredGateway::from_config(&config(environment, None)) {
                Err(AppError::Config(ConfigError::MissingPaymentGateway { environment: got })) => {
                    assert_eq!(got, environment)
                }
                Err(other) => panic!("unexpected error: {other}"),
                Ok(gateway) => panic!("{environment:?} started with {} charges", gateway.label()),
            }
        }
    }

    #[test]
    fn configured_processor_is_used_in_every_environment() {
        for environment in [AppEnvironment::Development, AppEnvironment::Production] {
            let gateway = ConfiguredGateway::from_config(&config(
                environment,
                Some("https://payments.example.com/v1"),
            ))
            .expect("remote gateway builds");
            assert_eq!(gateway.label(), "remote");
        }
    }

    #[test]
    fn parses_cli_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 10)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .expect("valid timestamp");
        assert_eq!(parse_datetime("2025-03-10T09:30"), Ok(expected));
        assert_eq!(parse_datetime("2025-03-10 09:30:00"), Ok(expected));
        assert!(parse_datetime("10/03/2025").is_err());
    }
}
