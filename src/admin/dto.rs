use serde::{Deserialize, Serialize};

use crate::guests::repo::Guest;
use crate::stats::AggregatedStats;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login result; a failed attempt is reported in-band, like the
/// submission path.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Full guest list plus the derived summary, recomputed per request.
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub guests: Vec<Guest>,
    #[serde(flatten)]
    pub stats: AggregatedStats,
}
