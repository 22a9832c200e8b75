//! Recommendations engine: HTTP client, status poller and result export.
mod auth;
mod client;
mod engine;
mod export;
mod poller;
mod types;

pub use auth::{EnvToken, NoToken, StaticToken, TokenProvider};
pub use client::{ClientSettings, ProgressSink, RecommendationsApi, ReqwestApi};
pub use engine::RecommendationEngine;
pub use export::{export_filename, export_outcome, ExportError, ExportSummary};
pub use poller::{PollOutcome, Poller};
pub use types::{ApiError, EngineEvent, FailureKind, PollProgress, POLL_TIMEOUT_MESSAGE};
