//! Plain-text rendering of jobs and recommendations.
//!
//! Results go to stdout; progress lines go to stderr.

use std::fmt::Write as _;

use recs_core::{JobStatus, NoResults, RecommendationOutcome, RecommendationRecord};
use recs_engine::{EngineEvent, PollProgress, ProgressSink};

/// Prints poll progress to stderr as it arrives.
pub struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn emit(&self, event: EngineEvent) {
        if let Some(line) = progress_line(&event) {
            eprintln!("{line}");
        }
    }
}

pub fn progress_line(event: &EngineEvent) -> Option<String> {
    match event {
        EngineEvent::Submitted { job_id } => Some(format!("Submitted job {job_id}")),
        EngineEvent::Progress(progress) => Some(poll_line(progress)),
        EngineEvent::ResultFetched {
            job_id,
            record_count,
        } => Some(format!("Job {job_id} finished with {record_count} recommendations")),
    }
}

fn poll_line(progress: &PollProgress) -> String {
    let mut line = format!("[{:>2}] {}", progress.attempt, progress.state);
    if let Some(kind) = &progress.transient {
        let _ = write!(line, " (retrying after {kind})");
        return line;
    }
    if let Some(percentage) = progress.percentage {
        let _ = write!(line, " {percentage:.0}%");
    }
    if let Some(message) = &progress.message {
        let _ = write!(line, " - {message}");
    }
    line
}

pub fn render_status(status: &JobStatus) -> String {
    let mut out = String::new();
    if let Some(job_id) = &status.job_id {
        let _ = writeln!(out, "Job:      {job_id}");
    }
    let _ = writeln!(out, "Status:   {}", status.status);
    if let Some(percentage) = status.progress_percentage {
        let _ = writeln!(out, "Progress: {percentage:.0}%");
    }
    if let Some(message) = &status.progress_message {
        let _ = writeln!(out, "Message:  {message}");
    }
    if let Some(error) = &status.error {
        let _ = writeln!(out, "Error:    {error}");
    }
    out
}

pub fn render_outcome(outcome: &RecommendationOutcome) -> String {
    match outcome {
        RecommendationOutcome::NoResults(no_results) => render_no_results(no_results),
        RecommendationOutcome::Recommendations { recommendations } => {
            render_records(recommendations)
        }
    }
}

pub fn render_records(records: &[RecommendationRecord]) -> String {
    if records.is_empty() {
        return "No recommendations.\n".to_string();
    }
    let mut out = String::new();
    for (index, record) in records.iter().enumerate() {
        render_record(&mut out, index + 1, record);
    }
    out
}

fn render_record(out: &mut String, position: usize, record: &RecommendationRecord) {
    let id = record.property_id().unwrap_or_else(|| "?".to_string());
    let title = ["title", "address", "name"]
        .iter()
        .find_map(|key| record.property_text(key));
    match title {
        Some(title) => {
            let _ = writeln!(out, "{position:>3}. {title} [{id}]");
        }
        None => {
            let _ = writeln!(out, "{position:>3}. [{id}]");
        }
    }
    if let Some(price) = record.property_text("price") {
        let _ = writeln!(out, "     price: {price}");
    }
    if let Some(confidence) = record.ai_confidence {
        let _ = writeln!(out, "     confidence: {:.0}%", confidence * 100.0);
    }
    if let Some(explanation) = &record.ai_explanation {
        let _ = writeln!(out, "     {explanation}");
    }
}

fn render_no_results(no_results: &NoResults) -> String {
    let mut out = format!("{}\n", no_results.message);
    for suggestion in &no_results.suggestions {
        let _ = writeln!(out, "  - {suggestion}");
    }
    out
}
