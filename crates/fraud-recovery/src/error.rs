use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::delivery::{DeliveryError, RepositoryError};
use crate::workflows::intake::IntakeRejected;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Intake(IntakeRejected),
    Delivery(DeliveryError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Intake(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Delivery(err) => delivery_status(err),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn delivery_status(err: &DeliveryError) -> StatusCode {
    match err {
        DeliveryError::Intake(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DeliveryError::Repository(RepositoryError::NotFound) | DeliveryError::UnknownReference(_) => {
            StatusCode::NOT_FOUND
        }
        DeliveryError::Repository(RepositoryError::Conflict)
        | DeliveryError::Transition(_)
        | DeliveryError::Locked { .. }
        | DeliveryError::Unsettled { .. } => StatusCode::CONFLICT,
        DeliveryError::Gateway(_) => StatusCode::BAD_GATEWAY,
        DeliveryError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Intake(err) => write!(f, "{}", err),
            AppError::Delivery(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Intake(err) => Some(err),
            AppError::Delivery(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let fields = match &self {
            AppError::Intake(rejected) | AppError::Delivery(DeliveryError::Intake(rejected)) => {
                Some(rejected.errors.clone())
            }
            _ => None,
        };

        let body = match fields {
            Some(fields) => json!({ "error": self.to_string(), "fields": fields }),
            None => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<IntakeRejected> for AppError {
    fn from(value: IntakeRejected) -> Self {
        Self::Intake(value)
    }
}

impl From<DeliveryError> for AppError {
    fn from(value: DeliveryError) -> Self {
        Self::Delivery(value)
    }
}
