use serde::{Deserialize, Serialize};

use crate::RecommendationRecord;

/// Error text the service reports when the profile filters match nothing.
pub const NO_PROPERTIES_PATTERN: &str = "No properties match the search criteria";

pub const NO_PROPERTIES_FOUND: &str = "NO_PROPERTIES_FOUND";

const NO_PROPERTIES_MESSAGE: &str =
    "No properties match your search criteria. Try adjusting your preferences to see more results.";

const SUGGESTIONS: [&str; 4] = [
    "Expand your search area or add more preferred locations",
    "Increase your maximum budget",
    "Lower the minimum number of bedrooms or bathrooms",
    "Include more property types in your preferences",
];

/// Structured empty result returned in place of an error when a job found nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoResults {
    #[serde(rename = "errorType", alias = "error_type")]
    pub error_type: String,
    pub message: String,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<RecommendationRecord>,
    /// Raw error text reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl NoResults {
    pub fn new(server_message: Option<&str>) -> Self {
        Self {
            error_type: NO_PROPERTIES_FOUND.to_string(),
            message: NO_PROPERTIES_MESSAGE.to_string(),
            suggestions: SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            recommendations: Vec::new(),
            detail: server_message
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(ToOwned::to_owned),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureClass {
    NoResults(NoResults),
    Fatal(String),
}

/// Classifies the error text of a `failed` job.
pub fn classify_failure(error: Option<&str>) -> FailureClass {
    match error {
        Some(text) if text.contains(NO_PROPERTIES_PATTERN) => {
            FailureClass::NoResults(NoResults::new(Some(text)))
        }
        Some(text) if !text.trim().is_empty() => FailureClass::Fatal(text.trim().to_string()),
        _ => FailureClass::Fatal("job failed".to_string()),
    }
}
