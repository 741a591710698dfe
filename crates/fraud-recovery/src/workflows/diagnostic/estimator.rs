use chrono::Duration;
use serde::Serialize;

use crate::workflows::intake::MoneyAmount;

pub const PROBABILITY_FLOOR: u8 = 5;
pub const PROBABILITY_CEILING: u8 = 95;
const HIGH_THRESHOLD: u8 = 60;
const MEDIUM_THRESHOLD: u8 = 35;

const POLICE_REPORT_BONUS: i16 = 5;
const INSTITUTION_CONTACT_BONUS: i16 = 5;

/// Elapsed time since the incident, bucketed so the score never depends on raw seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElapsedBucket {
    Unknown,
    WithinDay,
    WithinThreeDays,
    WithinWeek,
    WithinMonth,
    WithinQuarter,
    BeyondQuarter,
}

impl ElapsedBucket {
    pub fn from_elapsed(elapsed: Option<Duration>) -> Self {
        let Some(elapsed) = elapsed else {
            return Self::Unknown;
        };
        let hours = elapsed.num_hours().max(0);
        match hours {
            0..=24 => Self::WithinDay,
            25..=72 => Self::WithinThreeDays,
            73..=168 => Self::WithinWeek,
            169..=720 => Self::WithinMonth,
            721..=2160 => Self::WithinQuarter,
            _ => Self::BeyondQuarter,
        }
    }

    pub const fn adjustment(self) -> i16 {
        match self {
            Self::Unknown => 0,
            Self::WithinDay => 4,
            Self::WithinThreeDays => 2,
            Self::WithinWeek => 0,
            Self::WithinMonth => -5,
            Self::WithinQuarter => -15,
            Self::BeyondQuarter => -35,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "date not informed",
            Self::WithinDay => "within 24 hours",
            Self::WithinThreeDays => "within 3 days",
            Self::WithinWeek => "within a week",
            Self::WithinMonth => "within a month",
            Self::WithinQuarter => "within 3 months",
            Self::BeyondQuarter => "more than 3 months ago",
        }
    }
}

/// Three-tier reading of the numeric estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryCategory {
    Low,
    Medium,
    High,
}

impl RecoveryCategory {
    pub const fn classify(probability: u8) -> Self {
        if probability >= HIGH_THRESHOLD {
            Self::High
        } else if probability >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    BaseRate,
    ElapsedTime,
    LossSize,
    PoliceReport,
    InstitutionContacted,
}

/// Discrete contribution to an estimate, kept so the figure can be explained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub score: i16,
    pub notes: String,
}

/// Facts the estimator consumes. Everything is already resolved; no lookups happen here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateInput {
    pub base_rate: u8,
    pub loss_amount: Option<MoneyAmount>,
    pub elapsed: ElapsedBucket,
    pub police_report_filed: bool,
    pub institution_contacted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryEstimate {
    pub probability: u8,
    pub category: RecoveryCategory,
    pub components: Vec<ScoreComponent>,
}

/// Score a case. Total over every input and always within the floor/ceiling band.
pub fn estimate(input: &EstimateInput) -> RecoveryEstimate {
    let mut components = Vec::with_capacity(5);

    components.push(ScoreComponent {
        factor: ScoreFactor::BaseRate,
        score: i16::from(input.base_rate),
        notes: format!("base recovery rate {}% for this incident type", input.base_rate),
    });

    components.push(ScoreComponent {
        factor: ScoreFactor::ElapsedTime,
        score: input.elapsed.adjustment(),
        notes: format!("incident reported {}", input.elapsed.label()),
    });

    let loss = input.loss_amount.unwrap_or_default();
    components.push(ScoreComponent {
        factor: ScoreFactor::LossSize,
        score: loss_adjustment(loss),
        notes: format!("loss of {loss}"),
    });

    components.extend(completion_components(
        input.police_report_filed,
        input.institution_contacted,
    ));

    let raw: i16 = components.iter().map(|component| component.score).sum();
    let probability = clamp_probability(raw);

    RecoveryEstimate {
        probability,
        category: RecoveryCategory::classify(probability),
        components,
    }
}

/// Sub-probability for one recovery pathway, sharing the time and completion adjustments.
pub fn pathway_probability(
    success_rate: u8,
    elapsed: ElapsedBucket,
    police_report_filed: bool,
    institution_contacted: bool,
) -> u8 {
    let completion: i16 = completion_components(police_report_filed, institution_contacted)
        .iter()
        .map(|component| component.score)
        .sum();
    clamp_probability(i16::from(success_rate) + elapsed.adjustment() + completion)
}

fn completion_components(
    police_report_filed: bool,
    institution_contacted: bool,
) -> Vec<ScoreComponent> {
    let mut components = Vec::new();
    if police_report_filed {
        components.push(ScoreComponent {
            factor: ScoreFactor::PoliceReport,
            score: POLICE_REPORT_BONUS,
            notes: "police report already filed".to_string(),
        });
    }
    if institution_contacted {
        components.push(ScoreComponent {
            factor: ScoreFactor::InstitutionContacted,
            score: INSTITUTION_CONTACT_BONUS,
            notes: "financial institution already notified".to_string(),
        });
    }
    components
}

fn loss_adjustment(loss: MoneyAmount) -> i16 {
    match loss.cents() {
        0..=100_000 => 3,
        100_001..=1_000_000 => 0,
        1_000_001..=5_000_000 => -5,
        _ => -10,
    }
}

fn clamp_probability(raw: i16) -> u8 {
    raw.clamp(i16::from(PROBABILITY_FLOOR), i16::from(PROBABILITY_CEILING)) as u8
}
