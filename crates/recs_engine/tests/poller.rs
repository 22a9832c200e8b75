use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use recs_core::{
    JobId, JobState, JobStatus, PollPolicy, RecommendationOutcome, SubmitJobRequest,
    NO_PROPERTIES_FOUND,
};
use recs_engine::{
    ApiError, EngineEvent, FailureKind, PollOutcome, Poller, ProgressSink, RecommendationEngine,
    RecommendationsApi,
};
use serde_json::{json, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// In-memory service: replays scripted status answers, then repeats `fallback`.
struct ScriptedApi {
    script: Mutex<VecDeque<Result<JobStatus, ApiError>>>,
    fallback: Result<JobStatus, ApiError>,
    result: Value,
    result_delay: Duration,
    status_calls: AtomicU32,
    result_calls: AtomicU32,
}

impl ScriptedApi {
    fn new(
        script: Vec<Result<JobStatus, ApiError>>,
        fallback: Result<JobStatus, ApiError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            result: json!({"recommendations": []}),
            result_delay: Duration::ZERO,
            status_calls: AtomicU32::new(0),
            result_calls: AtomicU32::new(0),
        }
    }

    fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    fn with_result_delay(mut self, delay: Duration) -> Self {
        self.result_delay = delay;
        self
    }

    fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecommendationsApi for ScriptedApi {
    async fn submit_job(&self, _request: &SubmitJobRequest) -> Result<JobId, ApiError> {
        Ok(JobId::new("job-1"))
    }

    async fn job_status(&self, _job_id: &JobId) -> Result<JobStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn job_result(&self, _job_id: &JobId) -> Result<Value, ApiError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.result_delay).await;
        Ok(self.result.clone())
    }

    async fn save_property(&self, _property_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn unsave_property(&self, _property_id: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn status(state: JobState) -> Result<JobStatus, ApiError> {
    Ok(JobStatus {
        job_id: Some(JobId::new("job-1")),
        status: state,
        progress_percentage: None,
        progress_message: None,
        error: None,
    })
}

fn failed(error: &str) -> Result<JobStatus, ApiError> {
    status(JobState::Failed).map(|s| JobStatus {
        error: Some(error.to_string()),
        ..s
    })
}

fn server_error() -> Result<JobStatus, ApiError> {
    Err(ApiError::new(FailureKind::HttpStatus(503), "Service Unavailable"))
}

fn network_error() -> Result<JobStatus, ApiError> {
    Err(ApiError::new(FailureKind::Network, "connection reset"))
}

fn job() -> JobId {
    JobId::new("job-1")
}

#[tokio::test(start_paused = true)]
async fn completed_job_is_returned_once_and_polling_stops() {
    let api = ScriptedApi::new(
        vec![
            status(JobState::Pending),
            status(JobState::Processing),
            status(JobState::Completed),
        ],
        status(JobState::Processing),
    );
    let sink = TestSink::default();
    let poller = Poller::new(&api, PollPolicy::default());

    let start = Instant::now();
    let outcome = poller.poll(&job(), &sink, None).await.unwrap();

    assert!(matches!(outcome, PollOutcome::Completed(ref s) if s.status == JobState::Completed));
    assert_eq!(api.status_calls(), 3);
    // 2s initial delay, then two 5s intervals.
    assert_eq!(start.elapsed(), Duration::from_secs(12));

    let attempts: Vec<u32> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::Progress(progress) => Some(progress.attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn never_finishing_job_stops_after_max_attempts() {
    let api = ScriptedApi::new(Vec::new(), status(JobState::Processing));
    let sink = TestSink::default();
    let poller = Poller::new(&api, PollPolicy::default());

    let err = poller.poll(&job(), &sink, None).await.unwrap_err();

    assert_eq!(err.kind, FailureKind::PollTimeout { attempts: 60 });
    assert!(err.message.contains("taking longer than expected"));
    assert_eq!(api.status_calls(), 60);
}

#[tokio::test(start_paused = true)]
async fn no_properties_failure_returns_structured_result() {
    let api = ScriptedApi::new(
        vec![failed("No properties match the search criteria")],
        status(JobState::Processing),
    );
    let poller = Poller::new(&api, PollPolicy::default());

    let outcome = poller.poll(&job(), &TestSink::default(), None).await.unwrap();
    match outcome {
        PollOutcome::NoResults(no_results) => {
            assert_eq!(no_results.error_type, NO_PROPERTIES_FOUND);
            assert!(!no_results.suggestions.is_empty());
        }
        other => panic!("expected NoResults, got {other:?}"),
    }
    assert_eq!(api.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn other_job_failure_is_an_error() {
    let api = ScriptedApi::new(vec![failed("Profile has no budget")], status(JobState::Processing));
    let poller = Poller::new(&api, PollPolicy::default());

    let err = poller.poll(&job(), &TestSink::default(), None).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::JobFailed);
    assert_eq!(err.message, "Profile has no budget");
}

#[tokio::test(start_paused = true)]
async fn transient_failures_do_not_end_polling() {
    let api = ScriptedApi::new(
        vec![
            server_error(),
            network_error(),
            Err(ApiError::new(FailureKind::Timeout, "timed out")),
            status(JobState::Processing),
            server_error(),
            status(JobState::Completed),
        ],
        status(JobState::Processing),
    );
    let sink = TestSink::default();
    let poller = Poller::new(&api, PollPolicy::default());

    let outcome = poller.poll(&job(), &sink, None).await.unwrap();
    assert!(matches!(outcome, PollOutcome::Completed(_)));
    assert_eq!(api.status_calls(), 6);

    let transient: Vec<Option<FailureKind>> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::Progress(progress) => Some(progress.transient),
            _ => None,
        })
        .collect();
    assert_eq!(
        transient,
        vec![
            Some(FailureKind::HttpStatus(503)),
            Some(FailureKind::Network),
            Some(FailureKind::Timeout),
            None,
            Some(FailureKind::HttpStatus(503)),
            None,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn persistent_server_errors_exhaust_the_budget() {
    let api = ScriptedApi::new(Vec::new(), server_error());
    let policy = PollPolicy {
        max_attempts: 5,
        ..PollPolicy::default()
    };
    let poller = Poller::new(&api, policy);

    let start = Instant::now();
    let err = poller.poll(&job(), &TestSink::default(), None).await.unwrap_err();

    assert_eq!(err.kind, FailureKind::PollTimeout { attempts: 5 });
    assert_eq!(api.status_calls(), 5);
    // 2s initial delay, then 6s, 7s, 8s, 9s of backoff.
    assert_eq!(start.elapsed(), Duration::from_secs(32));
}

#[tokio::test(start_paused = true)]
async fn client_errors_abort_polling() {
    let api = ScriptedApi::new(
        vec![Err(ApiError::new(FailureKind::HttpStatus(404), "Job not found"))],
        status(JobState::Processing),
    );
    let poller = Poller::new(&api, PollPolicy::default());

    let err = poller.poll(&job(), &TestSink::default(), None).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(api.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_polling() {
    let api = ScriptedApi::new(Vec::new(), status(JobState::Processing));
    let poller = Poller::new(&api, PollPolicy::default());
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(13)).await;
        canceller.cancel();
    });

    let err = poller
        .poll(&job(), &TestSink::default(), Some(&token))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
    // Checks at 2s, 7s and 12s; the 17s check never happens.
    assert_eq!(api.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn engine_fetches_and_normalizes_result() {
    let api = Arc::new(
        ScriptedApi::new(
            vec![status(JobState::Processing), status(JobState::Completed)],
            status(JobState::Processing),
        )
        .with_result(json!({"properties": [{"id": "p1"}, {"id": "p2"}]})),
    );
    let engine = RecommendationEngine::new(api.clone(), PollPolicy::default());
    let sink = TestSink::default();

    let outcome = engine
        .get_enriched_recommendations("profile-9", &sink, None)
        .await
        .unwrap();

    let ids: Vec<String> = outcome
        .records()
        .iter()
        .filter_map(|record| record.property_id())
        .collect();
    assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);
    assert_eq!(api.result_calls.load(Ordering::SeqCst), 1);

    let events = sink.take();
    assert_eq!(events.first(), Some(&EngineEvent::Submitted { job_id: job() }));
    assert_eq!(
        events.last(),
        Some(&EngineEvent::ResultFetched {
            job_id: job(),
            record_count: 2
        })
    );
}

#[tokio::test(start_paused = true)]
async fn engine_skips_result_fetch_when_nothing_matched() {
    let api = Arc::new(ScriptedApi::new(
        vec![failed("Job failed: No properties match the search criteria.")],
        status(JobState::Processing),
    ));
    let engine = RecommendationEngine::new(api.clone(), PollPolicy::default());

    let outcome = engine
        .get_recommendations("profile-9", false, &TestSink::default(), None)
        .await
        .unwrap();

    assert!(matches!(outcome, RecommendationOutcome::NoResults(_)));
    assert_eq!(api.result_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_also_stops_a_slow_result_fetch() {
    let api = Arc::new(
        ScriptedApi::new(vec![status(JobState::Completed)], status(JobState::Processing))
            .with_result_delay(Duration::from_secs(60)),
    );
    let engine = RecommendationEngine::new(api.clone(), PollPolicy::default());
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let err = engine
        .get_recommendations("profile-9", true, &TestSink::default(), Some(&token))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Cancelled);
    assert_eq!(api.result_calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}
