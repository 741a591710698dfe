use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Fixed statutory window counted from the moment of the incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatutoryWindow {
    pub key: &'static str,
    pub label: &'static str,
    pub hours: i64,
}

impl StatutoryWindow {
    pub fn length(&self) -> Duration {
        Duration::hours(self.hours)
    }
}

/// Window for contesting an instant transfer through the special refund mechanism.
pub const CONTESTATION_WINDOW: StatutoryWindow = StatutoryWindow {
    key: "contestation_72h",
    label: "72-hour contestation window",
    hours: 72,
};

/// Hard cutoff after which the refund mechanism no longer accepts requests.
pub const CONTESTATION_HARD_CUTOFF: StatutoryWindow = StatutoryWindow {
    key: "contestation_80d",
    label: "80-day hard cutoff",
    hours: 80 * 24,
};

/// Card networks accept disputes for a bounded period after the charge.
pub const CHARGEBACK_WINDOW: StatutoryWindow = StatutoryWindow {
    key: "chargeback_90d",
    label: "90-day card dispute window",
    hours: 90 * 24,
};

/// Urgency tier of a countdown. Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineTier {
    Normal,
    Attention,
    Critical,
    Expired,
}

impl DeadlineTier {
    pub fn classify(remaining: Duration) -> Self {
        if remaining < Duration::zero() {
            Self::Expired
        } else if remaining < Duration::hours(24) {
            Self::Critical
        } else if remaining <= Duration::hours(48) {
            Self::Attention
        } else {
            Self::Normal
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Attention => "Attention",
            Self::Critical => "Critical",
            Self::Expired => "Expired",
        }
    }
}

/// Snapshot of one window evaluated at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineCountdown {
    pub window: StatutoryWindow,
    pub deadline: NaiveDateTime,
    /// Signed seconds until the deadline; negative once expired.
    pub remaining_seconds: i64,
    pub tier: DeadlineTier,
}

impl DeadlineCountdown {
    pub fn remaining(&self) -> Duration {
        Duration::seconds(self.remaining_seconds)
    }

    pub fn is_expired(&self) -> bool {
        self.tier == DeadlineTier::Expired
    }

    pub fn description(&self) -> String {
        if self.remaining_seconds >= 0 {
            format!(
                "{}: {} remaining",
                self.window.label,
                format_span(self.remaining_seconds)
            )
        } else {
            format!(
                "{}: expired {} ago",
                self.window.label,
                format_span(-self.remaining_seconds)
            )
        }
    }

    /// `HH:MM:SS` clock for live displays; clamps to zero once expired.
    pub fn clock(&self) -> String {
        let seconds = self.remaining_seconds.max(0);
        format!(
            "{:02}:{:02}:{:02}",
            seconds / 3600,
            (seconds % 3600) / 60,
            seconds % 60
        )
    }
}

/// Outcome of a deadline computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeadlineStatus {
    NotApplicable,
    Active(DeadlineCountdown),
}

impl DeadlineStatus {
    pub fn countdown(&self) -> Option<&DeadlineCountdown> {
        match self {
            DeadlineStatus::NotApplicable => None,
            DeadlineStatus::Active(countdown) => Some(countdown),
        }
    }

    pub fn tier(&self) -> Option<DeadlineTier> {
        self.countdown().map(|countdown| countdown.tier)
    }

    pub fn description(&self) -> String {
        match self {
            DeadlineStatus::NotApplicable => {
                "No statutory deadline applies to this incident type".to_string()
            }
            DeadlineStatus::Active(countdown) => countdown.description(),
        }
    }
}

/// Evaluate `window` for an incident at `occurred_at` as seen from `now`.
///
/// Dates are not validated here; intake rejects malformed or future dates first.
pub fn countdown(
    occurred_at: Option<NaiveDateTime>,
    window: StatutoryWindow,
    now: NaiveDateTime,
) -> DeadlineStatus {
    let Some(occurred_at) = occurred_at else {
        return DeadlineStatus::NotApplicable;
    };

    let deadline = occurred_at + window.length();
    let remaining = deadline - now;
    DeadlineStatus::Active(DeadlineCountdown {
        window,
        deadline,
        remaining_seconds: remaining.num_seconds(),
        tier: DeadlineTier::classify(remaining),
    })
}

/// Pick the window that needs attention first.
///
/// Among open windows that is the one closing soonest. When all have closed, the
/// longest window is reported since it is the last cutoff that passed.
pub fn most_urgent(
    windows: &[StatutoryWindow],
    occurred_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> DeadlineStatus {
    let countdowns: Vec<DeadlineCountdown> = windows
        .iter()
        .filter_map(|window| match countdown(occurred_at, *window, now) {
            DeadlineStatus::Active(countdown) => Some(countdown),
            DeadlineStatus::NotApplicable => None,
        })
        .collect();

    let open = countdowns
        .iter()
        .filter(|countdown| !countdown.is_expired())
        .min_by_key(|countdown| countdown.remaining_seconds);
    let chosen = open.or_else(|| {
        countdowns
            .iter()
            .max_by_key(|countdown| countdown.window.hours)
    });

    match chosen {
        Some(countdown) => DeadlineStatus::Active(countdown.clone()),
        None => DeadlineStatus::NotApplicable,
    }
}

fn format_span(total_seconds: i64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    if total_seconds >= 3 * 86_400 {
        format!("{days} days")
    } else {
        format!("{}h {:02}m", days * 24 + hours, minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .expect("valid date")
            .and_hms_opt(hour, 0, 0)
            .expect("valid time")
    }

    #[test]
    fn missing_date_is_not_applicable() {
        let status = countdown(None, CONTESTATION_WINDOW, at(10, 12));
        assert_eq!(status, DeadlineStatus::NotApplicable);
        assert!(status.tier().is_none());
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(DeadlineTier::classify(Duration::hours(49)), DeadlineTier::Normal);
        assert_eq!(DeadlineTier::classify(Duration::hours(48)), DeadlineTier::Attention);
        assert_eq!(DeadlineTier::classify(Duration::hours(24)), DeadlineTier::Attention);
        assert_eq!(
            DeadlineTier::classify(Duration::hours(24) - Duration::seconds(1)),
            DeadlineTier::Critical
        );
        assert_eq!(DeadlineTier::classify(Duration::zero()), DeadlineTier::Critical);
        assert_eq!(
            DeadlineTier::classify(Duration::seconds(-1)),
            DeadlineTier::Expired
        );
    }

    #[test]
    fn tiering_never_regresses_as_time_passes() {
        let occurred = at(1, 8);
        let mut previous = DeadlineTier::Normal;
        for minutes in (0..=(96 * 60)).step_by(17) {
            let now = occurred + Duration::minutes(minutes);
            let tier = countdown(Some(occurred), CONTESTATION_WINDOW, now)
                .tier()
                .expect("active countdown");
            assert!(tier >= previous, "tier regressed at minute {minutes}");
            previous = tier;
        }
        assert_eq!(previous, DeadlineTier::Expired);
    }

    #[test]
    fn describes_remaining_and_elapsed_spans() {
        let occurred = at(10, 0);
        let status = countdown(Some(occurred), CONTESTATION_WINDOW, at(10, 10));
        assert_eq!(
            status.description(),
            "72-hour contestation window: 62h 00m remaining"
        );
        let countdown = status.countdown().expect("active");
        assert_eq!(countdown.clock(), "62:00:00");

        let late = super::countdown(
            Some(occurred),
            CONTESTATION_HARD_CUTOFF,
            occurred + Duration::days(100),
        );
        assert_eq!(late.description(), "80-day hard cutoff: expired 20 days ago");
    }

    #[test]
    fn most_urgent_prefers_the_soonest_open_window() {
        let occurred = at(1, 0);
        let windows = [CONTESTATION_WINDOW, CONTESTATION_HARD_CUTOFF];

        let fresh = most_urgent(&windows, Some(occurred), at(1, 10));
        assert_eq!(
            fresh.countdown().map(|c| c.window.key),
            Some("contestation_72h")
        );

        let after_window = most_urgent(&windows, Some(occurred), at(10, 0));
        assert_eq!(
            after_window.countdown().map(|c| c.window.key),
            Some("contestation_80d")
        );
        assert_eq!(after_window.tier(), Some(DeadlineTier::Normal));

        let long_gone = most_urgent(&windows, Some(occurred), occurred + Duration::days(100));
        assert_eq!(
            long_gone.countdown().map(|c| c.window.key),
            Some("contestation_80d")
        );
        assert_eq!(long_gone.tier(), Some(DeadlineTier::Expired));

        assert_eq!(
            most_urgent(&[], Some(occurred), at(1, 10)),
            DeadlineStatus::NotApplicable
        );
    }
}
