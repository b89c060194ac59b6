use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{Level, info, instrument};

use super::AppState;
use crate::{repositories::SettingsRepository, response::StatusJson};

#[derive(Serialize, Deserialize)]
pub struct LogLevel {
    level: String,
}

pub async fn log_level(State(settings): State<Arc<SettingsRepository>>) -> Json<LogLevel> {
    Json(LogLevel {
        level: settings.get_log_level().await,
    })
}

/// Change the log level, effective immediately and kept across restarts.
#[instrument(skip_all, fields(level = %body.level))]
pub async fn log_level_put(
    State(state): State<AppState>,
    Json(body): Json<LogLevel>,
) -> Result<StatusCode, StatusJson> {
    info!("got log level change request");

    let level = body
        .level
        .parse::<Level>()
        .map_err(|_| StatusJson(StatusCode::UNPROCESSABLE_ENTITY))?;

    state
        .settings
        .set_log_level(level.as_str().to_lowercase())
        .await?;
    state.log_level.set(level)?;

    Ok(StatusCode::NO_CONTENT)
}
