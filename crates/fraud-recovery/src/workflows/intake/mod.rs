//! Case intake: raw form submissions in, validated [`CaseRecord`]s out.

pub mod domain;
mod guard;

pub use domain::{
    CaseProgress, CaseRecord, CaseSubmission, CounterpartDetails, IncidentDetails,
    IncidentSubmission, IncidentType, InstitutionDetails, InstitutionSubmission, MoneyAmount,
    NationalId, PersonDetails, PersonSubmission,
};
pub use guard::{CaseIntakeGuard, FieldError, IntakeRejected, DEFAULT_MIN_DESCRIPTION_CHARS};
pub use guard::{parse_form_date, parse_form_time};
