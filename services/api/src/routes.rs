use crate::infra::AppState;
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDateTime, NaiveTime};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use fraud_recovery::error::AppError;
use fraud_recovery::workflows::catalog::{IncidentCatalog, RecoveryPathway};
use fraud_recovery::workflows::delivery::{
    delivery_router, DeliveryWorkflow, DocumentMailer, PaymentGateway, SessionRepository,
};
use fraud_recovery::workflows::diagnostic::{
    DeadlineStatus, DeadlineTier, DiagnosticEngine, DiagnosticResult, LiveCountdown,
    StatutoryWindow, LIVE_TICK,
};
use fraud_recovery::workflows::documents::DocumentKind;
use fraud_recovery::workflows::intake::{
    parse_form_date, parse_form_time, CaseIntakeGuard, CaseSubmission, FieldError,
    IncidentType, IntakeRejected,
};

#[derive(Debug, Serialize)]
pub(crate) struct CatalogEntryView {
    pub(crate) key: &'static str,
    pub(crate) label: &'static str,
    pub(crate) base_rate: u8,
    pub(crate) documents: Vec<DocumentKindView>,
    pub(crate) warnings: Vec<&'static str>,
    pub(crate) pathways: Vec<RecoveryPathway>,
    pub(crate) windows: Vec<StatutoryWindow>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DocumentKindView {
    pub(crate) kind: DocumentKind,
    pub(crate) label: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountdownQuery {
    pub(crate) incident_type: String,
    #[serde(default)]
    pub(crate) occurred_on: Option<String>,
    #[serde(default)]
    pub(crate) occurred_at: Option<String>,
}

pub(crate) fn with_api_routes<R, G, M>(workflow: Arc<DeliveryWorkflow<R, G, M>>) -> axum::Router
where
    R: SessionRepository + 'static,
    G: PaymentGateway + 'static,
    M: DocumentMailer + 'static,
{
    delivery_router(workflow)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/catalog", axum::routing::get(catalog_endpoint))
        .route(
            "/api/v1/diagnostic",
            axum::routing::post(diagnostic_endpoint),
        )
        .route(
            "/api/v1/diagnostic/countdown",
            axum::routing::get(countdown_endpoint),
        )
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn catalog_endpoint() -> Json<Vec<CatalogEntryView>> {
    let entries = IncidentCatalog::standard()
        .entries()
        .iter()
        .map(|entry| CatalogEntryView {
            key: entry.incident_type.key(),
            label: entry.label(),
            base_rate: entry.base_rate,
            documents: entry
                .document_set()
                .kinds()
                .iter()
                .map(|kind| DocumentKindView {
                    kind: *kind,
                    label: kind.label(),
                })
                .collect(),
            warnings: entry.warnings.to_vec(),
            pathways: entry.pathways.to_vec(),
            windows: entry.windows.to_vec(),
        })
        .collect();
    Json(entries)
}

pub(crate) async fn diagnostic_endpoint(
    Json(submission): Json<CaseSubmission>,
) -> Result<Json<DiagnosticResult>, AppError> {
    let now = now();
    let case = CaseIntakeGuard::default().validate(submission, now)?;
    Ok(Json(DiagnosticEngine::default().diagnose(&case, now)))
}

/// Server-sent countdown for the most urgent statutory window of an incident.
///
/// The stream owns the [`LiveCountdown`]; a client disconnect drops it and stops the timer.
pub(crate) async fn countdown_endpoint(Query(query): Query<CountdownQuery>) -> Response {
    let occurred_at = match countdown_instant(&query) {
        Ok(occurred_at) => occurred_at,
        Err(rejected) => return AppError::from(rejected).into_response(),
    };
    let entry = IncidentCatalog::standard().entry(IncidentType::from_key(&query.incident_type));
    let live = LiveCountdown::spawn(entry.windows.to_vec(), occurred_at, LIVE_TICK, now);

    Sse::new(countdown_events(live))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn countdown_instant(query: &CountdownQuery) -> Result<Option<NaiveDateTime>, IntakeRejected> {
    let mut errors = Vec::new();
    let date = match query.occurred_on.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = parse_form_date(raw);
            if parsed.is_none() {
                errors.push(FieldError {
                    field: "incident.occurred_on",
                    message: "occurrence date must be YYYY-MM-DD or DD/MM/YYYY".to_string(),
                });
            }
            parsed
        }
    };
    let time = match query.occurred_at.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = parse_form_time(raw);
            if parsed.is_none() {
                errors.push(FieldError {
                    field: "incident.occurred_at",
                    message: "occurrence time must be HH:MM".to_string(),
                });
            }
            parsed
        }
    };

    if !errors.is_empty() {
        return Err(IntakeRejected { errors });
    }
    Ok(date.map(|date| date.and_time(time.unwrap_or(NaiveTime::MIN))))
}

fn countdown_events(
    live: LiveCountdown,
) -> impl Stream<Item = Result<Event, axum::Error>> + Send + 'static {
    let receiver = live.subscribe();
    stream::unfold(
        (live, receiver, false, true),
        |(live, mut receiver, finished, first)| async move {
            if finished {
                return None;
            }
            if !first && receiver.changed().await.is_err() {
                return None;
            }
            let status = receiver.borrow_and_update().clone();
            let finished = matches!(status, DeadlineStatus::NotApplicable)
                || status.tier() == Some(DeadlineTier::Expired);
            let event = Event::default().event("countdown").json_data(json!({
                "status": status,
                "clock": status.countdown().map(|countdown| countdown.clock()),
                "description": status.description(),
            }));
            Some((event, (live, receiver, finished, false)))
        },
    )
}
