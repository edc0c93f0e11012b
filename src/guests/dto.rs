use serde::{Deserialize, Serialize};

/// Untrusted submission payload as sent by the RSVP form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveGuestRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attendance: Option<String>,
    #[serde(default)]
    pub companion: Option<String>,
    #[serde(default)]
    pub guest_food: Vec<String>,
    #[serde(default)]
    pub companion_food: Vec<String>,
    #[serde(default)]
    pub guest_drink: Vec<String>,
    #[serde(default)]
    pub companion_drink: Vec<String>,
    #[serde(default)]
    pub wishes: Option<String>,
}

/// In-band result for the submission path: the transport always gets a
/// well-formed 200 response, success or not.
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveGuestResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attending_count: Option<i64>,
}

impl SaveGuestResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            attending_count: None,
        }
    }
}

/// Public counters for `GET /api/stats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_guests: i64,
    pub attending_guests: i64,
    pub not_attending_guests: i64,
}
