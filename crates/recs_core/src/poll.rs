use std::time::Duration;

use crate::{classify_failure, FailureClass, JobState, JobStatus, NoResults};

/// Timing and budget of a status polling sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before the first status request.
    pub initial_delay: Duration,
    /// Wait between status requests while the job is running.
    pub interval: Duration,
    /// Total number of status requests, transient failures included.
    pub max_attempts: u32,
    /// Extra wait added per consecutive transient failure.
    pub backoff_step: Duration,
    /// Upper bound for the wait after transient failures.
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            interval: Duration::from_secs(5),
            max_attempts: 60,
            backoff_step: Duration::from_secs(1),
            max_interval: Duration::from_secs(15),
        }
    }
}

impl PollPolicy {
    /// Delay before the next request after `consecutive` transient failures in a row.
    pub fn delay_after_transient(&self, consecutive: u32) -> Duration {
        let grown = self
            .interval
            .saturating_add(self.backoff_step.saturating_mul(consecutive));
        grown.min(self.max_interval.max(self.interval))
    }
}

/// Something the poll loop observed for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// The status endpoint answered with a readable status.
    Observed(JobStatus),
    /// Network error, timeout or 5xx. Counts as still pending.
    TransientFailure { reason: String },
}

/// What the poll loop should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    /// Poll again after the given delay.
    Wait(Duration),
    Completed(JobStatus),
    NoResults(NoResults),
    Failed { message: String },
    TimedOut { attempts: u32 },
}

impl PollStep {
    pub fn is_final(&self) -> bool {
        !matches!(self, PollStep::Wait(_))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PollState {
    attempts: u32,
    consecutive_transient: u32,
    last_status: Option<JobStatus>,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn consecutive_transient(&self) -> u32 {
        self.consecutive_transient
    }

    /// Most recent status read from the service, if any.
    pub fn last_status(&self) -> Option<&JobStatus> {
        self.last_status.as_ref()
    }
}

/// Pure poll transition: applies one observation and decides the next step.
///
/// Terminal states are honored even on the last attempt; the budget only
/// turns a non-terminal observation into `TimedOut`.
pub fn update(
    policy: &PollPolicy,
    mut state: PollState,
    event: PollEvent,
) -> (PollState, PollStep) {
    state.attempts = state.attempts.saturating_add(1);

    let step = match event {
        PollEvent::Observed(status) => {
            state.consecutive_transient = 0;
            let step = match status.status {
                JobState::Completed => PollStep::Completed(status.clone()),
                JobState::Failed => match classify_failure(status.error.as_deref()) {
                    FailureClass::NoResults(no_results) => PollStep::NoResults(no_results),
                    FailureClass::Fatal(message) => PollStep::Failed { message },
                },
                JobState::Pending | JobState::Processing => {
                    wait_or_time_out(policy, &state, policy.interval)
                }
            };
            state.last_status = Some(status);
            step
        }
        PollEvent::TransientFailure { .. } => {
            state.consecutive_transient = state.consecutive_transient.saturating_add(1);
            let delay = policy.delay_after_transient(state.consecutive_transient);
            wait_or_time_out(policy, &state, delay)
        }
    };

    (state, step)
}

fn wait_or_time_out(policy: &PollPolicy, state: &PollState, delay: Duration) -> PollStep {
    if state.attempts >= policy.max_attempts {
        PollStep::TimedOut {
            attempts: state.attempts,
        }
    } else {
        PollStep::Wait(delay)
    }
}
