use axum::http::{header, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::delivery::{delivery_router, SessionId};
use crate::workflows::documents::DocumentKind;

fn app() -> (Router, Harness) {
    let h = harness();
    (delivery_router(std::sync::Arc::clone(&h.workflow)), h)
}

fn submission_json() -> Value {
    serde_json::to_value(submission()).expect("submission serializes")
}

async fn draft(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/cases", &submission_json()))
        .await
        .expect("draft response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    body["session_id"]
        .as_str()
        .expect("session id in view")
        .to_string()
}

#[tokio::test]
async fn drafting_returns_a_locked_view() {
    let (app, _h) = app();
    let response = app
        .oneshot(json_request("POST", "/api/v1/cases", &submission_json()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["state"], "drafted");
    assert_eq!(body["locked"], true);
    assert_eq!(body["documents"].as_array().map(Vec::len), Some(5));
    assert!(body.get("guide").is_none());
}

#[tokio::test]
async fn drafting_accepts_demands_for_one_document() {
    let (app, h) = app();
    let mut payload = submission_json();
    payload["extras"] = json!({
        "demands": {
            "institution_notification": ["Reverse the Pix transfer of R$ 3.000,00 within 48 hours."]
        }
    });
    let response = app
        .oneshot(json_request("POST", "/api/v1/cases", &payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let session_id = body["session_id"].as_str().expect("session id").to_string();

    let session = h
        .workflow
        .get(&SessionId(session_id))
        .expect("session stored");
    let body_of = |kind: DocumentKind| {
        session
            .documents
            .iter()
            .find(|document| document.kind == kind)
            .map(|document| document.body.clone())
            .expect("document assembled")
    };
    let notice = body_of(DocumentKind::InstitutionNotification);
    assert!(notice.contains("1. Reverse the Pix transfer of R$ 3.000,00 within 48 hours."));
    assert!(!notice.contains("security logs"));

    let police = body_of(DocumentKind::PoliceReportDraft);
    assert!(police.contains("open an investigation"));
    assert!(!police.contains("Reverse the Pix transfer"));
}

#[tokio::test]
async fn invalid_submission_returns_field_errors() {
    let (app, _h) = app();
    let payload = serde_json::to_value(invalid_submission()).expect("serializes");
    let response = app
        .oneshot(json_request("POST", "/api/v1/cases", &payload))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .expect("field list")
        .iter()
        .filter_map(|field| field["field"].as_str())
        .collect();
    assert!(fields.contains(&"person.national_id"));
    assert!(fields.contains(&"incident.description"));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (app, _h) = app();
    let response = app
        .oneshot(empty_request("GET", "/api/v1/cases/case-424242"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_before_payment_conflicts() {
    let (app, _h) = app();
    let session_id = draft(&app).await;

    let response = app
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/cases/{session_id}/export?format=txt"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("locked")));
}

#[tokio::test]
async fn webhook_confirmation_unlocks_exports() {
    let (app, h) = app();
    let session_id = draft(&app).await;

    let response = app
        .clone()
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/cases/{session_id}/payment"),
        ))
        .await
        .expect("payment response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["state"], "awaiting_payment");
    assert_eq!(body["payment"]["reference"], "tx-1");

    let settled_at = now() + chrono::Duration::minutes(2);
    h.gateway.settle("tx-1", settled_at);
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/payments/webhook",
            &json!({ "reference": "tx-1", "status": "PAID" }),
        ))
        .await
        .expect("webhook response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["outcome"], "applied");
    assert_eq!(body["state"], "delivered");

    let session = h
        .workflow
        .get(&SessionId(session_id.clone()))
        .expect("session stored");
    assert_eq!(
        session.confirmation().map(|confirmation| confirmation.settled_at),
        Some(settled_at)
    );

    let response = app
        .clone()
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/cases/{session_id}/export?format=clipboard"),
        ))
        .await
        .expect("export response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .is_none());
    let text = text_body(response).await;
    assert!(text.contains("POLICE REPORT DRAFT"));

    let response = app
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/cases/{session_id}/export"),
        ))
        .await
        .expect("html export response");
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .expect("attachment header");
    assert!(disposition.contains(&format!("{session_id}-documents.html")));

    assert_eq!(h.mailer.sent().len(), 1);
}

#[tokio::test]
async fn webhook_without_processor_settlement_is_rejected() {
    let (app, h) = app();
    let session_id = draft(&app).await;
    app.clone()
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/cases/{session_id}/payment"),
        ))
        .await
        .expect("payment response");

    for payload in [
        json!({ "reference": "tx-1" }),
        json!({ "reference": "tx-1", "status": "paid", "settled_at": "2025-03-10T20:01:00" }),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/payments/webhook", &payload))
            .await
            .expect("webhook response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert!(body["error"]
            .as_str()
            .is_some_and(|message| message.contains("pending")));
    }

    let response = app
        .clone()
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/cases/{session_id}/export?format=clipboard"),
        ))
        .await
        .expect("export response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(h.mailer.sent().is_empty());

    let response = app
        .oneshot(empty_request("GET", &format!("/api/v1/cases/{session_id}")))
        .await
        .expect("view response");
    let body = json_body(response).await;
    assert_eq!(body["state"], "awaiting_payment");
}

#[tokio::test]
async fn webhook_for_unknown_reference_is_not_found() {
    let (app, _h) = app();
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/payments/webhook",
            &json!({ "reference": "tx-unknown" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_settlement_webhook_is_acknowledged_and_ignored() {
    let (app, h) = app();
    let session_id = draft(&app).await;
    app.clone()
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/cases/{session_id}/payment"),
        ))
        .await
        .expect("payment response");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/payments/webhook",
            &json!({ "reference": "tx-1", "status": "pending" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["ignored"], true);
    assert!(h.mailer.sent().is_empty());

    let response = app
        .oneshot(empty_request("GET", &format!("/api/v1/cases/{session_id}")))
        .await
        .expect("view response");
    let body = json_body(response).await;
    assert_eq!(body["state"], "awaiting_payment");
}

#[tokio::test]
async fn poll_route_reports_pending_charge() {
    let (app, _h) = app();
    let session_id = draft(&app).await;
    app.clone()
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/cases/{session_id}/payment"),
        ))
        .await
        .expect("payment response");

    let response = app
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/cases/{session_id}/payment/poll"),
        ))
        .await
        .expect("poll response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["outcome"], "pending");
}

#[tokio::test]
async fn unsupported_export_format_is_a_bad_request() {
    let (app, _h) = app();
    let session_id = draft(&app).await;
    let response = app
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/cases/{session_id}/export?format=docx"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
