use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::json;

use super::domain::{SessionId, TransactionReference};
use super::gateway::PaymentGateway;
use super::repository::{DocumentMailer, SessionRepository};
use super::service::{DeliveryWorkflow, ExportFormat};
use crate::error::AppError;
use crate::workflows::documents::AssemblyExtras;
use crate::workflows::intake::CaseSubmission;

/// Router builder exposing the purchase flow over HTTP.
pub fn delivery_router<R, G, M>(workflow: Arc<DeliveryWorkflow<R, G, M>>) -> Router
where
    R: SessionRepository + 'static,
    G: PaymentGateway + 'static,
    M: DocumentMailer + 'static,
{
    Router::new()
        .route("/api/v1/cases", post(draft_handler::<R, G, M>))
        .route("/api/v1/cases/:session_id", get(view_handler::<R, G, M>))
        .route(
            "/api/v1/cases/:session_id/payment",
            post(payment_handler::<R, G, M>),
        )
        .route(
            "/api/v1/cases/:session_id/payment/poll",
            post(poll_handler::<R, G, M>),
        )
        .route(
            "/api/v1/cases/:session_id/export",
            get(export_handler::<R, G, M>),
        )
        .route(
            "/api/v1/payments/webhook",
            post(webhook_handler::<R, G, M>),
        )
        .with_state(workflow)
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Intake form plus optional per-document extras.
#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    #[serde(flatten)]
    pub submission: CaseSubmission,
    #[serde(default)]
    pub extras: AssemblyExtras,
}

pub(crate) async fn draft_handler<R, G, M>(
    State(workflow): State<Arc<DeliveryWorkflow<R, G, M>>>,
    axum::Json(request): axum::Json<DraftRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    G: PaymentGateway + 'static,
    M: DocumentMailer + 'static,
{
    match workflow.draft_with(request.submission, &request.extras, now()) {
        Ok(session) => {
            let view = workflow.view_of(&session);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn view_handler<R, G, M>(
    State(workflow): State<Arc<DeliveryWorkflow<R, G, M>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    G: PaymentGateway + 'static,
    M: DocumentMailer + 'static,
{
    match workflow.view(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn payment_handler<R, G, M>(
    State(workflow): State<Arc<DeliveryWorkflow<R, G, M>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    G: PaymentGateway + 'static,
    M: DocumentMailer + 'static,
{
    match workflow
        .request_payment(&SessionId(session_id), now())
        .await
    {
        Ok(session) => {
            let view = workflow.view_of(&session);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn poll_handler<R, G, M>(
    State(workflow): State<Arc<DeliveryWorkflow<R, G, M>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    G: PaymentGateway + 'static,
    M: DocumentMailer + 'static,
{
    match workflow.poll_payment(&SessionId(session_id), now()).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

/// Push notification from the payment processor. Only the reference is trusted as a
/// trigger; settlement is read back from the processor.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub reference: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl WebhookPayload {
    /// Pushes announcing anything other than settlement are acknowledged without a lookup.
    fn announces_settlement(&self) -> bool {
        match self.status.as_deref() {
            None => true,
            Some(status) => matches!(
                status.to_ascii_lowercase().as_str(),
                "paid" | "settled" | "approved"
            ),
        }
    }
}

pub(crate) async fn webhook_handler<R, G, M>(
    State(workflow): State<Arc<DeliveryWorkflow<R, G, M>>>,
    axum::Json(payload): axum::Json<WebhookPayload>,
) -> Response
where
    R: SessionRepository + 'static,
    G: PaymentGateway + 'static,
    M: DocumentMailer + 'static,
{
    if !payload.announces_settlement() {
        let body = json!({ "ignored": true, "reference": payload.reference });
        return (StatusCode::ACCEPTED, axum::Json(body)).into_response();
    }

    let reference = TransactionReference(payload.reference);
    match workflow.verify_pushed_payment(&reference).await {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

pub(crate) async fn export_handler<R, G, M>(
    State(workflow): State<Arc<DeliveryWorkflow<R, G, M>>>,
    Path(session_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Response
where
    R: SessionRepository + 'static,
    G: PaymentGateway + 'static,
    M: DocumentMailer + 'static,
{
    let raw_format = query.format.unwrap_or_else(|| "html".to_string());
    let Some(format) = ExportFormat::parse(&raw_format) else {
        let body = json!({
            "error": format!("unsupported export format '{raw_format}'"),
            "supported": ["html", "txt", "clipboard"],
        });
        return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
    };

    match workflow.export(&SessionId(session_id), format) {
        Ok(export) => {
            let content_type = export.content_type.to_string();
            if format == ExportFormat::Clipboard {
                return (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, content_type)],
                    export.body,
                )
                    .into_response();
            }
            let disposition = format!("attachment; filename=\"{}\"", export.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                export.body,
            )
                .into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}
