use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Closed set of incident categories the catalog knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    RealTimePayment,
    FraudulentBill,
    CardFraud,
    BankImpersonation,
    MessagingImpersonation,
    InvestmentScam,
    OnlinePurchase,
    AccountTakeover,
    DeviceTheft,
    Other,
}

impl IncidentType {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::RealTimePayment,
            Self::FraudulentBill,
            Self::CardFraud,
            Self::BankImpersonation,
            Self::MessagingImpersonation,
            Self::InvestmentScam,
            Self::OnlinePurchase,
            Self::AccountTakeover,
            Self::DeviceTheft,
            Self::Other,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::RealTimePayment => "real_time_payment",
            Self::FraudulentBill => "fraudulent_bill",
            Self::CardFraud => "card_fraud",
            Self::BankImpersonation => "bank_impersonation",
            Self::MessagingImpersonation => "messaging_impersonation",
            Self::InvestmentScam => "investment_scam",
            Self::OnlinePurchase => "online_purchase",
            Self::AccountTakeover => "account_takeover",
            Self::DeviceTheft => "device_theft",
            Self::Other => "other",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::RealTimePayment => "Pix / instant transfer fraud",
            Self::FraudulentBill => "Fraudulent payment slip",
            Self::CardFraud => "Card cloning or unauthorized card purchase",
            Self::BankImpersonation => "Fake bank agent call",
            Self::MessagingImpersonation => "Messaging app impersonation",
            Self::InvestmentScam => "Investment scam",
            Self::OnlinePurchase => "Online purchase never delivered",
            Self::AccountTakeover => "Phishing / account takeover",
            Self::DeviceTheft => "Phone or device theft",
            Self::Other => "Other fraud",
        }
    }

    /// Resolve a form key, falling back to [`IncidentType::Other`] for anything unknown.
    pub fn from_key(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ordered()
            .into_iter()
            .find(|kind| kind.key() == normalized)
            .unwrap_or(Self::Other)
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Non-negative amount in cents, displayed in BRL notation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MoneyAmount(u64);

impl MoneyAmount {
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn from_reais(reais: u64) -> Self {
        Self(reais.saturating_mul(100))
    }

    /// Convert a form value in reais. Returns `None` for negative or non-finite input.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents > u64::MAX as f64 {
            return None;
        }
        Some(Self(cents as u64))
    }

    pub const fn cents(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reais = (self.0 / 100).to_string();
        let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
        for (index, digit) in reais.chars().enumerate() {
            if index > 0 && (reais.len() - index) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }
        write!(f, "R$ {},{:02}", grouped, self.0 % 100)
    }
}

/// Brazilian taxpayer number (CPF), stored in the canonical `000.000.000-00` layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NationalId(String);

impl NationalId {
    /// Parse and checksum-validate a CPF in any common punctuation style.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw
            .chars()
            .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | '-' | ' ')))
        {
            return None;
        }

        let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() != 11 || digits.iter().all(|digit| *digit == digits[0]) {
            return None;
        }

        let check = |len: usize| -> u32 {
            let weight_start = len as u32 + 1;
            let sum: u32 = digits[..len]
                .iter()
                .enumerate()
                .map(|(index, digit)| digit * (weight_start - index as u32))
                .sum();
            let rest = (sum * 10) % 11;
            if rest == 10 {
                0
            } else {
                rest
            }
        };

        if check(9) != digits[9] || check(10) != digits[10] {
            return None;
        }

        let text: String = digits
            .iter()
            .filter_map(|digit| char::from_digit(*digit, 10))
            .collect();
        Some(Self(format!(
            "{}.{}.{}-{}",
            &text[0..3],
            &text[3..6],
            &text[6..9],
            &text[9..11]
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw intake form as posted by the client. Nothing downstream consumes this directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseSubmission {
    pub person: PersonSubmission,
    pub incident: IncidentSubmission,
    pub institution: Option<InstitutionSubmission>,
    pub progress: CaseProgress,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonSubmission {
    pub full_name: String,
    pub national_id: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentSubmission {
    pub incident_type: String,
    /// `YYYY-MM-DD` or `DD/MM/YYYY`.
    pub occurred_on: Option<String>,
    /// `HH:MM`, optional.
    pub occurred_at: Option<String>,
    pub description: String,
    /// Amount in reais as typed by the victim.
    pub loss_amount: Option<f64>,
    pub counterpart: CounterpartDetails,
    pub reference_numbers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionSubmission {
    pub name: String,
    pub branch: Option<String>,
    pub account: Option<String>,
}

/// Steps the victim reports having already taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseProgress {
    pub police_report_filed: bool,
    pub police_report_number: Option<String>,
    pub institution_contacted: bool,
    pub institution_protocol: Option<String>,
}

/// Destination of the fraudulent transfer, as far as the victim knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterpartDetails {
    pub name: Option<String>,
    /// Pix key, boleto line, card merchant descriptor, or similar identifier.
    pub payment_key: Option<String>,
    pub account: Option<String>,
    pub institution: Option<String>,
}

/// Validated case snapshot. Built only by the intake guard and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub person: PersonDetails,
    pub incident: IncidentDetails,
    pub institution: Option<InstitutionDetails>,
    pub progress: CaseProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDetails {
    pub full_name: String,
    pub national_id: NationalId,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentDetails {
    pub incident_type: IncidentType,
    pub occurred_on: Option<NaiveDate>,
    pub occurred_at: Option<NaiveTime>,
    pub description: String,
    pub loss_amount: Option<MoneyAmount>,
    pub counterpart: CounterpartDetails,
    pub reference_numbers: Vec<String>,
}

impl IncidentDetails {
    /// Occurrence instant; a missing time of day means the start of the day.
    pub fn occurred_at_instant(&self) -> Option<NaiveDateTime> {
        self.occurred_on
            .map(|date| date.and_time(self.occurred_at.unwrap_or(NaiveTime::MIN)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionDetails {
    pub name: String,
    pub branch: Option<String>,
    pub account: Option<String>,
}
