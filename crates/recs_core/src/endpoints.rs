use url::Url;

use crate::JobId;

const ASYNC_JOBS: [&str; 5] = ["api", "recommendations", "async", "v2", "async"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    InvalidBaseUrl(String),
    /// Id that cannot stand as a single path segment.
    InvalidId(String),
}

impl std::fmt::Display for EndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointError::InvalidBaseUrl(reason) => write!(f, "invalid base url: {reason}"),
            EndpointError::InvalidId(id) => write!(f, "invalid id {id:?}"),
        }
    }
}

impl std::error::Error for EndpointError {}

/// Builds the REST endpoint URLs relative to a base URL.
///
/// A path prefix on the base (`https://host/prefix`) is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, EndpointError> {
        let base =
            Url::parse(base_url).map_err(|err| EndpointError::InvalidBaseUrl(err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(EndpointError::InvalidBaseUrl(format!(
                "{base_url} cannot carry a path"
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `POST /api/recommendations/async/v2/async`
    pub fn submit(&self) -> Url {
        self.join(&ASYNC_JOBS)
    }

    /// `GET /api/recommendations/async/v2/async/{jobId}/status`
    pub fn status(&self, job_id: &JobId) -> Result<Url, EndpointError> {
        self.job_path(job_id, "status")
    }

    /// `GET /api/recommendations/async/v2/async/{jobId}/result`
    pub fn result(&self, job_id: &JobId) -> Result<Url, EndpointError> {
        self.job_path(job_id, "result")
    }

    /// `POST /recommendations/save`
    pub fn save(&self) -> Url {
        self.join(&["recommendations", "save"])
    }

    /// `DELETE /recommendations/saved/{propertyId}`
    pub fn unsave(&self, property_id: &str) -> Result<Url, EndpointError> {
        let property_id = checked_id(property_id)?;
        Ok(self.join(&["recommendations", "saved", property_id]))
    }

    fn job_path(&self, job_id: &JobId, leaf: &str) -> Result<Url, EndpointError> {
        let mut segments: Vec<&str> = ASYNC_JOBS.to_vec();
        segments.push(checked_id(job_id.as_str())?);
        segments.push(leaf);
        Ok(self.join(&segments))
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`: the base can always carry path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// The url crate drops `.` and `..` segments and an empty one leaves `//`.
fn checked_id(id: &str) -> Result<&str, EndpointError> {
    match id {
        "" | "." | ".." => Err(EndpointError::InvalidId(id.to_string())),
        _ => Ok(id),
    }
}
