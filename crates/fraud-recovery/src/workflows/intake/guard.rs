use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::domain::{
    CaseRecord, CaseSubmission, IncidentDetails, IncidentType, InstitutionDetails, MoneyAmount,
    NationalId, PersonDetails,
};

pub const DEFAULT_MIN_DESCRIPTION_CHARS: usize = 40;
const MAX_LOSS_REAIS: f64 = 1_000_000_000.0;

/// Single field-level validation failure, shaped for inline form display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found in one submission, so the form can flag all fields at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("case submission rejected: {}", summarize(.errors))]
pub struct IntakeRejected {
    pub errors: Vec<FieldError>,
}

impl IntakeRejected {
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.field, error.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Guard responsible for producing [`CaseRecord`] instances from raw form input.
#[derive(Debug, Clone)]
pub struct CaseIntakeGuard {
    min_description_chars: usize,
}

impl Default for CaseIntakeGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DESCRIPTION_CHARS)
    }
}

impl CaseIntakeGuard {
    pub fn new(min_description_chars: usize) -> Self {
        Self {
            min_description_chars,
        }
    }

    pub fn min_description_chars(&self) -> usize {
        self.min_description_chars
    }

    /// Validate a submission against the intake invariants as of `now`.
    pub fn validate(
        &self,
        submission: CaseSubmission,
        now: NaiveDateTime,
    ) -> Result<CaseRecord, IntakeRejected> {
        let mut errors = Vec::new();
        let CaseSubmission {
            person,
            incident,
            institution,
            progress,
        } = submission;

        let full_name = person.full_name.trim().to_string();
        if full_name.chars().count() < 3 {
            errors.push(field_error("person.full_name", "full name is required"));
        }

        let national_id = NationalId::parse(person.national_id.trim());
        if national_id.is_none() {
            errors.push(field_error(
                "person.national_id",
                "national ID must be a valid 11-digit CPF",
            ));
        }

        let email = person.email.trim().to_string();
        if !looks_like_email(&email) {
            errors.push(field_error("person.email", "a valid email address is required"));
        }

        let phone = clean(person.phone);
        if let Some(phone) = &phone {
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            if !(10..=13).contains(&digits) {
                errors.push(field_error(
                    "person.phone",
                    "phone must contain area code and number (10 to 13 digits)",
                ));
            }
        }

        let occurred_on = match clean(incident.occurred_on) {
            Some(raw) => match parse_form_date(&raw) {
                Some(date) if date > now.date() => {
                    errors.push(field_error(
                        "incident.occurred_on",
                        "occurrence date cannot be in the future",
                    ));
                    None
                }
                Some(date) => Some(date),
                None => {
                    errors.push(field_error(
                        "incident.occurred_on",
                        "occurrence date must be YYYY-MM-DD or DD/MM/YYYY",
                    ));
                    None
                }
            },
            None => None,
        };

        let occurred_at = match clean(incident.occurred_at) {
            Some(raw) => match parse_form_time(&raw) {
                Some(time) => {
                    if occurred_on == Some(now.date()) && time > now.time() {
                        errors.push(field_error(
                            "incident.occurred_at",
                            "occurrence time cannot be in the future",
                        ));
                    }
                    Some(time)
                }
                None => {
                    errors.push(field_error(
                        "incident.occurred_at",
                        "occurrence time must be HH:MM",
                    ));
                    None
                }
            },
            None => None,
        };

        let description = incident.description.trim().to_string();
        if description.chars().count() < self.min_description_chars {
            errors.push(field_error(
                "incident.description",
                format!(
                    "describe what happened in at least {} characters",
                    self.min_description_chars
                ),
            ));
        }

        let loss_amount = match incident.loss_amount {
            Some(value) if value.is_finite() && value > MAX_LOSS_REAIS => {
                errors.push(field_error(
                    "incident.loss_amount",
                    "loss amount is beyond any plausible value",
                ));
                None
            }
            Some(value) => match MoneyAmount::from_decimal(value) {
                Some(amount) => Some(amount),
                None => {
                    errors.push(field_error(
                        "incident.loss_amount",
                        "loss amount must be zero or a positive number",
                    ));
                    None
                }
            },
            None => None,
        };

        let institution = match institution {
            Some(raw) => {
                let name = raw.name.trim().to_string();
                let branch = clean(raw.branch);
                let account = clean(raw.account);
                if name.is_empty() {
                    if branch.is_some() || account.is_some() {
                        errors.push(field_error(
                            "institution.name",
                            "institution name is required when branch or account is given",
                        ));
                    }
                    None
                } else {
                    Some(InstitutionDetails {
                        name,
                        branch,
                        account,
                    })
                }
            }
            None => None,
        };

        let national_id = match national_id {
            Some(id) if errors.is_empty() => id,
            _ => return Err(IntakeRejected { errors }),
        };

        let mut counterpart = incident.counterpart;
        counterpart.name = clean(counterpart.name);
        counterpart.payment_key = clean(counterpart.payment_key);
        counterpart.account = clean(counterpart.account);
        counterpart.institution = clean(counterpart.institution);

        let mut progress = progress;
        progress.police_report_number = clean(progress.police_report_number);
        progress.institution_protocol = clean(progress.institution_protocol);

        Ok(CaseRecord {
            person: PersonDetails {
                full_name,
                national_id,
                address: clean(person.address),
                phone,
                email,
            },
            incident: IncidentDetails {
                incident_type: IncidentType::from_key(&incident.incident_type),
                occurred_on,
                occurred_at,
                description,
                loss_amount,
                counterpart,
                reference_numbers: incident
                    .reference_numbers
                    .into_iter()
                    .filter_map(|reference| clean(Some(reference)))
                    .collect(),
            },
            institution,
            progress,
        })
    }
}

fn field_error(field: &'static str, message: impl Into<String>) -> FieldError {
    FieldError {
        field,
        message: message.into(),
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn looks_like_email(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = raw.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Parse the date layouts accepted by the intake form.
pub fn parse_form_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

pub fn parse_form_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}
