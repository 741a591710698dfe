use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::deadline::{most_urgent, DeadlineStatus, StatutoryWindow};

/// Default refresh period for live displays.
pub const LIVE_TICK: Duration = Duration::from_secs(1);

/// Recurring re-evaluation of a case's most urgent deadline.
///
/// The background task lives exactly as long as this handle: dropping it aborts the
/// task, so a torn-down view never leaves a timer running.
#[derive(Debug)]
pub struct LiveCountdown {
    receiver: watch::Receiver<DeadlineStatus>,
    task: JoinHandle<()>,
}

impl LiveCountdown {
    /// Start ticking every `period`. `clock` supplies "now" on each tick.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C>(
        windows: Vec<StatutoryWindow>,
        occurred_at: Option<NaiveDateTime>,
        period: Duration,
        clock: C,
    ) -> Self
    where
        C: Fn() -> NaiveDateTime + Send + 'static,
    {
        let initial = most_urgent(&windows, occurred_at, clock());
        let (sender, receiver) = watch::channel(initial);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial value is already published.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let status = most_urgent(&windows, occurred_at, clock());
                if sender.send(status).is_err() {
                    break;
                }
            }
        });

        Self { receiver, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<DeadlineStatus> {
        self.receiver.clone()
    }

    pub fn current(&self) -> DeadlineStatus {
        self.receiver.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for LiveCountdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::diagnostic::deadline::CONTESTATION_WINDOW;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    fn occurred() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .expect("valid date")
            .and_hms_opt(8, 0, 0)
            .expect("valid time")
    }

    #[tokio::test]
    async fn publishes_fresh_snapshots_on_each_tick() {
        let offset = Arc::new(AtomicI64::new(0));
        let clock_offset = Arc::clone(&offset);
        let countdown = LiveCountdown::spawn(
            vec![CONTESTATION_WINDOW],
            Some(occurred()),
            Duration::from_millis(10),
            move || occurred() + chrono::Duration::seconds(clock_offset.load(Ordering::SeqCst)),
        );

        let first = countdown.current();
        assert_eq!(
            first.countdown().map(|c| c.remaining_seconds),
            Some(72 * 3600)
        );

        offset.store(3600, Ordering::SeqCst);
        let mut receiver = countdown.subscribe();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                receiver.changed().await.expect("countdown running");
                let remaining = receiver.borrow().countdown().map(|c| c.remaining_seconds);
                if remaining == Some(71 * 3600) {
                    break;
                }
            }
        })
        .await
        .expect("tick observed");
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels_the_task() {
        let countdown = LiveCountdown::spawn(
            vec![CONTESTATION_WINDOW],
            Some(occurred()),
            Duration::from_millis(10),
            occurred,
        );
        let mut receiver = countdown.subscribe();
        assert!(countdown.is_running());
        drop(countdown);

        let closed = tokio::time::timeout(Duration::from_secs(2), async {
            while receiver.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok(), "sender should be dropped once the task is aborted");
    }

    #[tokio::test]
    async fn missing_date_reports_not_applicable() {
        let countdown = LiveCountdown::spawn(
            vec![CONTESTATION_WINDOW],
            None,
            LIVE_TICK,
            occurred,
        );
        assert_eq!(countdown.current(), DeadlineStatus::NotApplicable);
    }
}
