use std::future::Future;
use std::sync::Arc;

use recs_core::{
    normalize_records, JobId, PollPolicy, RecommendationOutcome, RecommendationRecord,
    SubmitJobRequest,
};
use recs_logging::recs_info;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientSettings, ProgressSink, RecommendationsApi, ReqwestApi};
use crate::poller::{PollOutcome, Poller};
use crate::{ApiError, EngineEvent, FailureKind, TokenProvider};

/// Submit, poll, fetch and normalize in one call.
pub struct RecommendationEngine {
    api: Arc<dyn RecommendationsApi>,
    policy: PollPolicy,
}

impl RecommendationEngine {
    pub fn new(api: Arc<dyn RecommendationsApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Engine over the HTTP client.
    pub fn connect(
        settings: ClientSettings,
        tokens: Arc<dyn TokenProvider>,
        policy: PollPolicy,
    ) -> Result<Self, ApiError> {
        let api = ReqwestApi::new(settings, tokens)?;
        Ok(Self::new(Arc::new(api), policy))
    }

    pub fn api(&self) -> &dyn RecommendationsApi {
        self.api.as_ref()
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub async fn get_recommendations(
        &self,
        profile_id: &str,
        enriched: bool,
        sink: &dyn ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<RecommendationOutcome, ApiError> {
        let request = SubmitJobRequest {
            profile_id: profile_id.to_string(),
            enriched,
        };
        let job_id = unless_cancelled(cancel, self.api.submit_job(&request)).await?;
        recs_info!(
            "Submitted recommendation job {} for profile {} (enriched={})",
            job_id,
            profile_id,
            enriched
        );
        sink.emit(EngineEvent::Submitted {
            job_id: job_id.clone(),
        });

        let poller = Poller::new(self.api.as_ref(), self.policy);
        match poller.poll(&job_id, sink, cancel).await? {
            PollOutcome::NoResults(no_results) => Ok(RecommendationOutcome::NoResults(no_results)),
            PollOutcome::Completed(_) => {
                let recommendations =
                    unless_cancelled(cancel, self.fetch_records(&job_id)).await?;
                sink.emit(EngineEvent::ResultFetched {
                    job_id,
                    record_count: recommendations.len(),
                });
                Ok(RecommendationOutcome::Recommendations { recommendations })
            }
        }
    }

    pub async fn get_enriched_recommendations(
        &self,
        profile_id: &str,
        sink: &dyn ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<RecommendationOutcome, ApiError> {
        self.get_recommendations(profile_id, true, sink, cancel).await
    }

    /// Fetches the result of a finished job and normalizes it.
    pub async fn fetch_records(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<RecommendationRecord>, ApiError> {
        let payload = self.api.job_result(job_id).await?;
        let records = normalize_records(&payload);
        recs_info!("Job {} returned {} recommendations", job_id, records.len());
        Ok(records)
    }
}

/// Runs `work` unless the token fires first.
async fn unless_cancelled<T>(
    cancel: Option<&CancellationToken>,
    work: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    match cancel {
        Some(token) => tokio::select! {
            result = work => result,
            _ = token.cancelled() => {
                Err(ApiError::new(FailureKind::Cancelled, "request cancelled"))
            }
        },
        None => work.await,
    }
}
