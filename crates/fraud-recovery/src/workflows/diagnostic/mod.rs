//! Free diagnostic: recovery estimate, statutory countdown, and pathway assessment.

pub mod countdown;
pub mod deadline;
pub mod estimator;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::catalog::{CatalogEntry, IncidentCatalog, RecoveryPathway};
use super::intake::{CaseRecord, IncidentType};

pub use countdown::{LiveCountdown, LIVE_TICK};
pub use deadline::{
    countdown as deadline_countdown, most_urgent, DeadlineCountdown, DeadlineStatus,
    DeadlineTier, StatutoryWindow, CHARGEBACK_WINDOW, CONTESTATION_HARD_CUTOFF,
    CONTESTATION_WINDOW,
};
pub use estimator::{
    estimate, pathway_probability, ElapsedBucket, EstimateInput, RecoveryCategory,
    RecoveryEstimate, ScoreComponent, ScoreFactor, PROBABILITY_CEILING, PROBABILITY_FLOOR,
};

pub const DISCLAIMER: &str = "This figure is a heuristic estimate based on the information you provided. It is not a guarantee of recovery and not legal advice.";

/// Assessment of one recovery pathway for a specific case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathwayAssessment {
    pub key: &'static str,
    pub name: &'static str,
    pub probability: u8,
    pub available: bool,
    pub rationale: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DeadlineStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticResult {
    pub incident_type: IncidentType,
    pub incident_label: &'static str,
    pub probability: u8,
    pub category: RecoveryCategory,
    pub category_label: &'static str,
    pub elapsed: ElapsedBucket,
    pub components: Vec<ScoreComponent>,
    pub deadline: DeadlineStatus,
    pub deadline_description: String,
    pub pathways: Vec<PathwayAssessment>,
    pub warnings: Vec<&'static str>,
    pub disclaimer: &'static str,
}

/// Combines the catalog, estimator, and deadline calculator for one case.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticEngine {
    catalog: IncidentCatalog,
}

impl DiagnosticEngine {
    pub fn new(catalog: IncidentCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &IncidentCatalog {
        &self.catalog
    }

    /// Deterministic for a given case and `now`.
    pub fn diagnose(&self, case: &CaseRecord, now: NaiveDateTime) -> DiagnosticResult {
        let entry = self.catalog.entry(case.incident.incident_type);
        let occurred_at = case.incident.occurred_at_instant();
        let elapsed = ElapsedBucket::from_elapsed(occurred_at.map(|at| now - at));

        let estimate = estimate(&EstimateInput {
            base_rate: entry.base_rate,
            loss_amount: case.incident.loss_amount,
            elapsed,
            police_report_filed: case.progress.police_report_filed,
            institution_contacted: case.progress.institution_contacted,
        });

        let deadline = most_urgent(entry.windows, occurred_at, now);
        let pathways = assess_pathways(entry, case, elapsed, occurred_at, now);

        DiagnosticResult {
            incident_type: entry.incident_type,
            incident_label: entry.label(),
            probability: estimate.probability,
            category: estimate.category,
            category_label: estimate.category.label(),
            elapsed,
            components: estimate.components,
            deadline_description: deadline.description(),
            deadline,
            pathways,
            warnings: entry.warnings.to_vec(),
            disclaimer: DISCLAIMER,
        }
    }

    /// Start a live countdown over the case's statutory windows.
    pub fn live_countdown<C>(&self, case: &CaseRecord, clock: C) -> LiveCountdown
    where
        C: Fn() -> NaiveDateTime + Send + 'static,
    {
        let entry = self.catalog.entry(case.incident.incident_type);
        LiveCountdown::spawn(
            entry.windows.to_vec(),
            case.incident.occurred_at_instant(),
            LIVE_TICK,
            clock,
        )
    }
}

fn assess_pathways(
    entry: &CatalogEntry,
    case: &CaseRecord,
    elapsed: ElapsedBucket,
    occurred_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Vec<PathwayAssessment> {
    entry
        .pathways
        .iter()
        .map(|pathway| assess_pathway(pathway, case, elapsed, occurred_at, now))
        .collect()
}

fn assess_pathway(
    pathway: &RecoveryPathway,
    case: &CaseRecord,
    elapsed: ElapsedBucket,
    occurred_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> PathwayAssessment {
    let deadline = pathway
        .window
        .map(|window| deadline::countdown(occurred_at, window, now));
    let expired = deadline
        .as_ref()
        .and_then(DeadlineStatus::countdown)
        .is_some_and(DeadlineCountdown::is_expired);

    let probability = if expired {
        PROBABILITY_FLOOR
    } else {
        pathway_probability(
            pathway.approximate_success,
            elapsed,
            case.progress.police_report_filed,
            case.progress.institution_contacted,
        )
    };

    PathwayAssessment {
        key: pathway.key,
        name: pathway.name,
        probability,
        available: !expired,
        rationale: pathway.rationale,
        deadline,
    }
}
