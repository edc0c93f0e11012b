use axum::{
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use time::macros::format_description;
use tracing::{error, info, instrument, warn};

use crate::admin::dto::{DashboardResponse, LoginRequest, LoginResponse};
use crate::admin::session::{AdminSession, SessionKeys};
use crate::guests::repo::Guest;
use crate::state::AppState;
use crate::stats::aggregate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/export", get(export))
}

/// POST /admin/login — checks the externally supplied credentials and
/// issues a bearer token for the dashboard and export endpoints.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let admin = &state.config.admin;
    if payload.username != admin.username || payload.password != admin.password {
        warn!(username = %payload.username, "admin login rejected");
        return Ok(Json(LoginResponse {
            success: false,
            token: None,
            message: Some("Неверные данные для входа".to_string()),
        }));
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(&payload.username).map_err(|e| {
        error!(error = %e, "session sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(username = %payload.username, "admin logged in");
    Ok(Json(LoginResponse {
        success: true,
        token: Some(token),
        message: None,
    }))
}

/// GET /admin/dashboard — full guest list with the summary recomputed
/// from it on every call.
#[instrument(skip(state, _session))]
pub async fn dashboard(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<DashboardResponse>, (StatusCode, String)> {
    let guests = state.store.scan(None, None).await.map_err(|e| {
        error!(error = %e, "dashboard scan failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Ошибка базы данных. Пожалуйста, попробуйте позже.".to_string(),
        )
    })?;

    let stats = aggregate(&guests);
    Ok(Json(DashboardResponse { guests, stats }))
}

/// GET /admin/export — all responses as a CSV attachment, most recent
/// first. Column set and localization follow the existing exports.
#[instrument(skip(state, _session))]
pub async fn export(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let guests = state.store.scan(None, None).await.map_err(|e| {
        error!(error = %e, "export scan failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Ошибка базы данных при экспорте.".to_string(),
        )
    })?;

    let body = render_csv(&guests).map_err(|e| {
        error!(error = %e, "csv rendering failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Ошибка базы данных при экспорте.".to_string(),
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=wedding_guests.csv",
            ),
        ],
        body,
    ))
}

pub fn render_csv(guests: &[Guest]) -> anyhow::Result<String> {
    let date_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "ID",
        "Имя",
        "Присутствие",
        "Спутник",
        "Предпочтения в еде",
        "Предпочтения в напитках",
        "Пожелания",
        "Дата ответа",
    ])?;

    for guest in guests {
        writer.write_record([
            guest.id.to_string().as_str(),
            guest.name.as_str(),
            if guest.is_attending() { "Да" } else { "Нет" },
            guest.companion_name.as_deref().unwrap_or(""),
            guest.food_preference.as_deref().unwrap_or(""),
            guest.drink_preference.as_deref().unwrap_or(""),
            guest.wishes.as_deref().unwrap_or(""),
            guest.submission_date.format(&date_format)?.as_str(),
        ])?;
    }

    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}
