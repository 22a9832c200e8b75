use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NoResults;

/// A recommended property, optionally carrying AI-derived enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub property: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Value>,
    #[serde(default, alias = "confidence", skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
    #[serde(default, alias = "explanation", skip_serializing_if = "Option::is_none")]
    pub ai_explanation: Option<String>,
}

impl RecommendationRecord {
    /// Reads one item of a result list.
    ///
    /// Items with a `property` object are enriched records; anything else is a
    /// legacy flat property and is wrapped as-is.
    pub fn from_value(item: Value) -> Self {
        let enriched = item
            .get("property")
            .map(Value::is_object)
            .unwrap_or(false);
        if enriched {
            if let Ok(record) = Self::deserialize(&item) {
                return record;
            }
        }
        Self::legacy(item)
    }

    fn legacy(property: Value) -> Self {
        Self {
            property,
            enrichment: None,
            ai_confidence: None,
            ai_explanation: None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.enrichment.is_some() || self.ai_confidence.is_some() || self.ai_explanation.is_some()
    }

    /// Identifier used by the save/unsave endpoints.
    pub fn property_id(&self) -> Option<String> {
        ["id", "property_id", "_id"]
            .iter()
            .filter_map(|key| self.property.get(key))
            .find_map(scalar_to_string)
    }

    /// A property field rendered as text, if it is a string or number.
    pub fn property_text(&self, key: &str) -> Option<String> {
        self.property.get(key).and_then(scalar_to_string)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Picks the recommendation list out of a result payload.
///
/// `recommendations` wins over the legacy `properties`; a payload with
/// neither yields an empty list. Item order is preserved.
pub fn normalize_payload(payload: &Value) -> Vec<Value> {
    if let Value::Array(items) = payload {
        return items.clone();
    }
    ["recommendations", "properties"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

pub fn normalize_records(payload: &Value) -> Vec<RecommendationRecord> {
    normalize_payload(payload)
        .into_iter()
        .map(RecommendationRecord::from_value)
        .collect()
}

/// Final result of one recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecommendationOutcome {
    NoResults(NoResults),
    Recommendations {
        recommendations: Vec<RecommendationRecord>,
    },
}

impl RecommendationOutcome {
    pub fn records(&self) -> &[RecommendationRecord] {
        match self {
            RecommendationOutcome::Recommendations { recommendations } => recommendations,
            RecommendationOutcome::NoResults(no_results) => &no_results.recommendations,
        }
    }
}
