use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::guests::dto::{SaveGuestRequest, SaveGuestResponse, StatsResponse};
use crate::guests::repo::Attendance;
use crate::guests::validate::normalize;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/save_guest", post(save_guest))
        .route("/api/stats", get(api_stats))
}

/// POST /save_guest. The transport always gets a well-formed 200 response;
/// validation and storage failures are reported in-band.
#[instrument(skip(state, payload))]
pub async fn save_guest(
    State(state): State<AppState>,
    payload: Result<Json<SaveGuestRequest>, JsonRejection>,
) -> Json<SaveGuestResponse> {
    // An unreadable body gets the same in-band treatment as any other
    // failure; the parser detail stays in the logs.
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "unreadable submission body");
            return Json(SaveGuestResponse::failure("Произошла непредвиденная ошибка"));
        }
    };

    let guest = match normalize(payload) {
        Ok(g) => g,
        Err(e) => {
            warn!(error = %e, "submission rejected");
            return Json(SaveGuestResponse::failure(e.user_message()));
        }
    };

    let id = match state.store.insert(&guest).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "saving guest response failed");
            return Json(SaveGuestResponse::failure(e.user_message()));
        }
    };

    let attending_count = match state.store.count(Some(Attendance::Yes)).await {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, id, "attendance count failed after insert");
            return Json(SaveGuestResponse::failure(e.user_message()));
        }
    };

    info!(id, attending_count, "guest response saved");
    Json(SaveGuestResponse {
        success: true,
        message: "Спасибо за ответ! Мы рады, что вы сможете разделить с нами этот день."
            .to_string(),
        attending_count: Some(attending_count),
    })
}

/// GET /api/stats — public counters.
#[instrument(skip(state))]
pub async fn api_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let total = state.store.count(None).await.map_err(db_error)?;
    let attending = state
        .store
        .count(Some(Attendance::Yes))
        .await
        .map_err(db_error)?;

    Ok(Json(StatsResponse {
        total_guests: total,
        attending_guests: attending,
        not_attending_guests: total - attending,
    }))
}

fn db_error(e: crate::error::AppError) -> (StatusCode, String) {
    error!(error = %e, "stats query failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Database error".into())
}
