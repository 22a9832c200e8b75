use std::fmt;

use recs_core::{JobId, JobState};

/// Message shown when a job outlives the attempt budget.
pub const POLL_TIMEOUT_MESSAGE: &str =
    "Recommendation generation is taking longer than expected. Please try again later.";

#[derive(Debug, Clone, PartialEq)]
pub struct PollProgress {
    pub job_id: JobId,
    pub attempt: u32,
    pub state: JobState,
    pub percentage: Option<f64>,
    pub message: Option<String>,
    /// Set when this attempt failed transiently and `state` is a stand-in.
    pub transient: Option<FailureKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Submitted {
        job_id: JobId,
    },
    Progress(PollProgress),
    ResultFetched {
        job_id: JobId,
        record_count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    JobFailed,
    PollTimeout { attempts: u32 },
    Cancelled,
}

impl FailureKind {
    /// Failures the poller treats as "still pending".
    pub fn is_transient(&self) -> bool {
        match self {
            FailureKind::Timeout | FailureKind::Network => true,
            FailureKind::HttpStatus(code) => (500..=599).contains(code),
            _ => false,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "undecodable response"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::JobFailed => write!(f, "job failed"),
            FailureKind::PollTimeout { attempts } => {
                write!(f, "job still running after {attempts} status checks")
            }
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
