//! Enrichment records and the backend wire types
//!
//! The backend returns a collection of destination descriptions, each with
//! three environmental scores. The engine picks one uniformly at random per
//! render; there is no destination-to-record lookup yet.

use serde::{Deserialize, Serialize};

/// The three environmental scores attached to a destination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcoScores {
    pub energy_sources: f64,
    pub air_quality: f64,
    pub water_quality: f64,
}

/// A backend-supplied destination description plus its scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    #[serde(flatten)]
    pub scores: EcoScores,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub id: i64,
}

impl EnrichmentRecord {
    /// The substitute record used when the backend is unreachable or returns
    /// nothing selectable. Rendering proceeds with this instead of aborting.
    pub fn fallback() -> Self {
        Self {
            scores: EcoScores {
                energy_sources: 0.0,
                air_quality: 0.0,
                water_quality: 0.0,
            },
            content: "It seems like the backend is not running on localhost:8080 \
                      or is unreachable, please make sure that the backend is running"
                .to_string(),
            created_at: String::new(),
            id: 0,
        }
    }
}

/// Response shape of the destination fetch endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationResponse {
    pub destinations: Vec<EnrichmentRecord>,
    pub total: usize,
}

/// An observed raw search event persisted to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEvent {
    pub url: String,
    pub data: String,
}
