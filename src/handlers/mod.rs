#![allow(clippy::unused_async)]

use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode, response::IntoResponse};

use crate::{
    logging::LogLevel,
    repositories::{ProductRepository, RepoRepository, SettingsRepository},
    response::StatusJson,
    sync::LocalSync,
};

pub mod repo;
pub mod settings;

#[derive(Clone)]
pub struct AppState {
    pub repos: RepoRepository,
    pub products: ProductRepository,
    pub sync: LocalSync,
    pub settings: Arc<SettingsRepository>,
    pub log_level: Arc<LogLevel>,
}

impl AppState {
    pub fn new(
        repos: RepoRepository,
        products: ProductRepository,
        settings: SettingsRepository,
        log_level: LogLevel,
    ) -> Self {
        Self {
            sync: LocalSync::new(repos.clone(), products.clone()),
            repos,
            products,
            settings: Arc::new(settings),
            log_level: Arc::new(log_level),
        }
    }
}

impl FromRef<AppState> for RepoRepository {
    fn from_ref(input: &AppState) -> Self {
        input.repos.clone()
    }
}

impl FromRef<AppState> for Arc<SettingsRepository> {
    fn from_ref(input: &AppState) -> Self {
        Arc::clone(&input.settings)
    }
}

pub async fn handle_404() -> impl IntoResponse {
    StatusJson(StatusCode::NOT_FOUND)
}
