//! Recommendations core: job model, poll state machine and payload normalization.
mod endpoints;
mod job;
mod no_results;
mod normalize;
mod poll;
mod wire;

pub use endpoints::{EndpointError, Endpoints};
pub use job::{JobId, JobState, JobStatus};
pub use no_results::{
    classify_failure, FailureClass, NoResults, NO_PROPERTIES_FOUND, NO_PROPERTIES_PATTERN,
};
pub use normalize::{
    normalize_payload, normalize_records, RecommendationOutcome, RecommendationRecord,
};
pub use poll::{update, PollEvent, PollPolicy, PollState, PollStep};
pub use wire::{SavePropertyRequest, SubmitJobRequest, SubmitJobResponse};
