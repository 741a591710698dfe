use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::{PaymentInstrument, SessionId, TransactionReference};
use crate::config::PaymentConfig;
use crate::workflows::intake::MoneyAmount;

/// Outbound charge request sent to the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub session_id: SessionId,
    pub customer_name: String,
    pub customer_email: String,
    pub national_id: String,
    pub product_code: String,
    pub amount: MoneyAmount,
}

/// Charge created by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentCharge {
    pub reference: TransactionReference,
    pub instrument: PaymentInstrument,
    pub amount: MoneyAmount,
    pub expires_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Settled { settled_at: NaiveDateTime },
    Expired,
}

impl ChargeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Settled { .. } => "settled",
            Self::Expired => "expired",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentGatewayError {
    #[error("payment processor is not configured")]
    NotConfigured,
    #[error("payment processor unreachable: {0}")]
    Transport(String),
    #[error("payment processor rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected payment processor response: {0}")]
    InvalidResponse(String),
}

/// Black-box processor boundary: create a charge, then ask whether it settled.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_charge(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentCharge, PaymentGatewayError>;

    async fn charge_status(
        &self,
        reference: &TransactionReference,
    ) -> Result<ChargeStatus, PaymentGatewayError>;
}

/// JSON-over-HTTP adapter for an instant-payment processor.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentGatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PaymentGatewayError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &PaymentConfig) -> Result<Self, PaymentGatewayError> {
        let base_url = config
            .gateway_url
            .clone()
            .ok_or(PaymentGatewayError::NotConfigured)?;
        Self::new(base_url, config.api_key.clone(), config.request_timeout())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChargeBody<'a> {
    external_reference: &'a str,
    product_code: &'a str,
    amount_cents: u64,
    customer: CustomerBody<'a>,
}

#[derive(Debug, Serialize)]
struct CustomerBody<'a> {
    name: &'a str,
    email: &'a str,
    tax_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
    qr_code: String,
    copy_paste: String,
    amount_cents: u64,
    #[serde(default)]
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    paid_at: Option<String>,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_charge(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentCharge, PaymentGatewayError> {
        let body = ChargeBody {
            external_reference: &request.session_id.0,
            product_code: &request.product_code,
            amount_cents: request.amount.cents(),
            customer: CustomerBody {
                name: &request.customer_name,
                email: &request.customer_email,
                tax_id: &request.national_id,
            },
        };

        let response = self
            .authorize(self.client.post(format!("{}/charges", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let charge: ChargeResponse = read_json(response).await?;

        let expires_at = match charge.expires_at.as_deref() {
            Some(raw) => Some(parse_timestamp(raw)?),
            None => None,
        };
        Ok(PaymentCharge {
            reference: TransactionReference(charge.id),
            instrument: PaymentInstrument {
                qr_code_payload: charge.qr_code,
                copy_paste_code: charge.copy_paste,
            },
            amount: MoneyAmount::from_cents(charge.amount_cents),
            expires_at,
        })
    }

    async fn charge_status(
        &self,
        reference: &TransactionReference,
    ) -> Result<ChargeStatus, PaymentGatewayError> {
        let response = self
            .authorize(
                self.client
                    .get(format!("{}/charges/{}", self.base_url, reference.0)),
            )
            .send()
            .await
            .map_err(transport)?;
        let status: StatusResponse = read_json(response).await?;

        match status.status.as_str() {
            "pending" | "waiting" | "created" => Ok(ChargeStatus::Pending),
            "expired" | "cancelled" => Ok(ChargeStatus::Expired),
            "paid" | "settled" | "approved" => {
                let raw = status.paid_at.ok_or_else(|| {
                    PaymentGatewayError::InvalidResponse("settled charge without paid_at".into())
                })?;
                Ok(ChargeStatus::Settled {
                    settled_at: parse_timestamp(&raw)?,
                })
            }
            other => Err(PaymentGatewayError::InvalidResponse(format!(
                "unknown charge status '{other}'"
            ))),
        }
    }
}

fn transport(err: reqwest::Error) -> PaymentGatewayError {
    PaymentGatewayError::Transport(err.to_string())
}

async fn read_json<T>(response: reqwest::Response) -> Result<T, PaymentGatewayError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(PaymentGatewayError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|err| PaymentGatewayError::InvalidResponse(err.to_string()))
}

/// Accepts RFC 3339 or a naive `YYYY-MM-DDTHH:MM:SS` timestamp; offsets are normalised to UTC.
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, PaymentGatewayError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| PaymentGatewayError::InvalidResponse(format!("invalid timestamp '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_processor_timestamps() {
        let with_offset = parse_timestamp("2025-03-10T12:00:00-03:00").expect("rfc3339");
        assert_eq!(with_offset.to_string(), "2025-03-10 15:00:00");
        let naive = parse_timestamp("2025-03-10T12:00:00").expect("naive");
        assert_eq!(naive.to_string(), "2025-03-10 12:00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn from_config_requires_a_url() {
        let config = PaymentConfig {
            product_code: "fraud-kit-complete".to_string(),
            price: MoneyAmount::from_cents(4990),
            gateway_url: None,
            api_key: None,
            poll_interval_secs: 5,
            request_timeout_secs: 10,
        };
        assert!(matches!(
            HttpPaymentGateway::from_config(&config),
            Err(PaymentGatewayError::NotConfigured)
        ));

        let configured = PaymentConfig {
            gateway_url: Some("https://payments.example.com/v1/".to_string()),
            ..config
        };
        let gateway = HttpPaymentGateway::from_config(&configured).expect("client builds");
        assert_eq!(gateway.base_url, "https://payments.example.com/v1");
    }
}
