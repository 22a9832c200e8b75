use std::time::Duration;

use recs_core::{
    update, JobId, JobStatus, NoResults, PollEvent, PollPolicy, PollState, PollStep,
};
use recs_logging::{recs_debug, recs_info, recs_warn};
use tokio_util::sync::CancellationToken;

use crate::{
    ApiError, EngineEvent, FailureKind, PollProgress, ProgressSink, RecommendationsApi,
    POLL_TIMEOUT_MESSAGE,
};

/// How a polling sequence ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(JobStatus),
    NoResults(NoResults),
}

/// Drives the status endpoint until the job is terminal or the budget is spent.
pub struct Poller<'a> {
    api: &'a dyn RecommendationsApi,
    policy: PollPolicy,
}

impl<'a> Poller<'a> {
    pub fn new(api: &'a dyn RecommendationsApi, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub async fn poll(
        &self,
        job_id: &JobId,
        sink: &dyn ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<PollOutcome, ApiError> {
        let mut state = PollState::new();
        let mut delay = self.policy.initial_delay;

        loop {
            if !pause(delay, cancel).await {
                recs_info!(
                    "Polling for job {} cancelled after {} attempts",
                    job_id,
                    state.attempts()
                );
                return Err(ApiError::new(FailureKind::Cancelled, "polling cancelled"));
            }

            let attempt = state.attempts() + 1;
            let event = match self.api.job_status(job_id).await {
                Ok(status) => {
                    sink.emit(EngineEvent::Progress(PollProgress {
                        job_id: job_id.clone(),
                        attempt,
                        state: status.status,
                        percentage: status.progress_percentage,
                        message: status.progress_message.clone(),
                        transient: None,
                    }));
                    PollEvent::Observed(status)
                }
                Err(err) if err.is_transient() => {
                    recs_warn!(
                        "Status check {} for job {} failed transiently: {}",
                        attempt,
                        job_id,
                        err
                    );
                    let pending = JobStatus::pending(job_id);
                    sink.emit(EngineEvent::Progress(PollProgress {
                        job_id: job_id.clone(),
                        attempt,
                        state: pending.status,
                        percentage: None,
                        message: None,
                        transient: Some(err.kind.clone()),
                    }));
                    PollEvent::TransientFailure {
                        reason: err.to_string(),
                    }
                }
                Err(err) => return Err(err),
            };

            let (next, step) = update(&self.policy, state, event);
            state = next;

            match step {
                PollStep::Wait(next_delay) => {
                    recs_debug!(
                        "Job {} not finished after attempt {}, next check in {:?}",
                        job_id,
                        attempt,
                        next_delay
                    );
                    delay = next_delay;
                }
                PollStep::Completed(status) => {
                    recs_info!("Job {} completed after {} attempts", job_id, attempt);
                    return Ok(PollOutcome::Completed(status));
                }
                PollStep::NoResults(no_results) => {
                    recs_info!("Job {} found no matching properties", job_id);
                    return Ok(PollOutcome::NoResults(no_results));
                }
                PollStep::Failed { message } => {
                    recs_warn!("Job {} failed: {}", job_id, message);
                    return Err(ApiError::new(FailureKind::JobFailed, message));
                }
                PollStep::TimedOut { attempts } => {
                    recs_warn!("Job {} still running after {} attempts", job_id, attempts);
                    return Err(ApiError::new(
                        FailureKind::PollTimeout { attempts },
                        POLL_TIMEOUT_MESSAGE,
                    ));
                }
            }
        }
    }
}

/// Sleeps for `delay`. Returns false if cancelled first.
async fn pause(delay: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => {
            if token.is_cancelled() {
                return false;
            }
            tokio::select! {
                _ = tokio::time::sleep(delay) => true,
                _ = token.cancelled() => false,
            }
        }
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}
