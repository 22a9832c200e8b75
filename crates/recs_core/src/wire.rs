use serde::{Deserialize, Serialize};

use crate::JobId;

/// Body of `POST /api/recommendations/async/v2/async`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub profile_id: String,
    pub enriched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
}

/// Body of `POST /recommendations/save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePropertyRequest {
    pub property_id: String,
}
