use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::domain::SessionId;
use super::gateway::PaymentGateway;
use super::repository::{DocumentMailer, RepositoryError, SessionRepository};
use super::service::{DeliveryError, DeliveryWorkflow, PollOutcome};

/// Poll loop that asks the processor for settlement until the session is paid.
///
/// The loop funnels results through [`DeliveryWorkflow::poll_payment`], so a positive
/// answer reaches the same confirmation path as the webhook. Dropping the handle stops
/// polling.
#[derive(Debug)]
pub struct PaymentWatcher {
    outcome: watch::Receiver<Option<PollOutcome>>,
    task: JoinHandle<()>,
}

impl PaymentWatcher {
    pub fn spawn<R, G, M, C>(
        workflow: Arc<DeliveryWorkflow<R, G, M>>,
        session_id: SessionId,
        interval: Duration,
        clock: C,
    ) -> Self
    where
        R: SessionRepository + 'static,
        G: PaymentGateway + 'static,
        M: DocumentMailer + 'static,
        C: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        let (sender, outcome) = watch::channel(None);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match workflow.poll_payment(&session_id, clock()).await {
                    Ok(PollOutcome::Pending) => {
                        sender.send_replace(Some(PollOutcome::Pending));
                    }
                    Ok(outcome) => {
                        debug!(session = %session_id, ?outcome, "payment watcher finished");
                        sender.send_replace(Some(outcome));
                        break;
                    }
                    Err(DeliveryError::Repository(RepositoryError::NotFound))
                    | Err(DeliveryError::Transition(_)) => {
                        warn!(session = %session_id, "payment watcher stopped: session cannot be polled");
                        break;
                    }
                    Err(err) => {
                        warn!(session = %session_id, error = %err, "payment poll failed, retrying");
                    }
                }
            }
        });

        Self { outcome, task }
    }

    /// Latest poll outcome; `None` until the first poll completes.
    pub fn subscribe(&self) -> watch::Receiver<Option<PollOutcome>> {
        self.outcome.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PaymentWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
