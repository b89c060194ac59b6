use std::time::Duration;

use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio::time;
use tracing::{info, instrument};

use super::AppState;
use crate::{
    models::{RepoSummary, RepositoryRecord},
    repositories::{RepoRepository, Stored},
    response::{Invalid, StatusJson},
    sheet::{RepoSheet, SheetView},
    validate::{self, Prefill, RepoForm, Validation},
};

const LONG_POLL: Duration = Duration::from_secs(30);

const NOT_FOUND: StatusJson = StatusJson(StatusCode::NOT_FOUND);
const CONFLICT: StatusJson = StatusJson(StatusCode::CONFLICT);

#[derive(Deserialize)]
pub struct BasePath {
    pub id: u64,
}

pub async fn list(State(repos): State<RepoRepository>) -> Json<Vec<RepoSummary>> {
    info!("got repo list request");

    Json(repos.list().await.iter().map(RepoSummary::from).collect())
}

#[instrument(skip_all, fields(id = path.id))]
pub async fn index(
    State(state): State<AppState>,
    Path(path): Path<BasePath>,
) -> Result<Json<SheetView>, StatusJson> {
    info!("got repo index request");

    let sheet = open_sheet(&state, path.id, false).await.ok_or(NOT_FOUND)?;

    Ok(Json(sheet.view()))
}

enum Change {
    Record(Option<RepositoryRecord>),
    AppCount(u64),
}

/// Wait for the next change of the repository or its app count, answering with `204 No Content`
/// if nothing changed in time.
#[instrument(skip_all, fields(id = path.id))]
pub async fn next(
    State(state): State<AppState>,
    Path(path): Path<BasePath>,
) -> Result<Response, StatusJson> {
    info!("got repo change request");

    let mut records = state.repos.subscribe(path.id).await;
    let mut counts = state.products.subscribe_count(path.id).await;

    let record = records.current().ok_or(NOT_FOUND)?;
    let mut sheet = RepoSheet::open(path.id, Some(record), counts.current(), false, None);

    let change = time::timeout(LONG_POLL, async {
        tokio::select! {
            Some(record) = records.next() => Some(Change::Record(record)),
            Some(count) = counts.next() => Some(Change::AppCount(count)),
            else => None,
        }
    })
    .await;

    match change {
        Err(_) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(None | Some(Change::Record(None))) => Err(NOT_FOUND),
        Ok(Some(Change::Record(record))) => {
            sheet.refresh(record);
            Ok(Json(sheet.view()).into_response())
        }
        Ok(Some(Change::AppCount(count))) => {
            sheet.set_app_count(count);
            Ok(Json(sheet.view()).into_response())
        }
    }
}

#[derive(Deserialize)]
pub struct Create {
    #[serde(flatten)]
    form: RepoForm,
    #[serde(default)]
    clipboard: Option<String>,
}

/// Add a new repository. Fields left empty are taken from a repository link in `clipboard`,
/// if there is one.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    Json(create): Json<Create>,
) -> Result<Response, StatusJson> {
    info!("got repo create request");

    let template = RepositoryRecord {
        enabled: true,
        ..RepositoryRecord::default()
    };
    let mut sheet = RepoSheet::open(0, Some(template), 0, true, create.clipboard.as_deref());
    sheet.set_form(overlay(sheet.form().clone(), create.form));

    let record = match save_sheet(&mut sheet)? {
        Ok(record) => record,
        Err(res) => return Ok(res),
    };

    let record = match state.repos.create_unique(record).await? {
        Stored::Saved(record) => record,
        Stored::AddressInUse(other) => return Ok(address_in_use(other)),
    };
    info!(id = record.id, address = %record.address, "created repository");

    let location = format!("/repos/{}", record.id);
    let sheet = RepoSheet::open(record.id, Some(record), 0, false, None);

    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(sheet.view()),
    )
        .into_response())
}

#[instrument(skip_all, fields(id = path.id))]
pub async fn update(
    State(state): State<AppState>,
    Path(path): Path<BasePath>,
    Json(form): Json<RepoForm>,
) -> Result<Response, StatusJson> {
    info!("got repo update request");

    let mut sheet = open_sheet(&state, path.id, true).await.ok_or(NOT_FOUND)?;
    sheet.set_form(form);

    update_sheet(&state, sheet).await
}

#[derive(Deserialize)]
pub struct Mirror {
    index: usize,
}

/// Switch the repository's address to one of its mirrors.
#[instrument(skip_all, fields(id = path.id))]
pub async fn mirror(
    State(state): State<AppState>,
    Path(path): Path<BasePath>,
    Json(mirror): Json<Mirror>,
) -> Result<Response, StatusJson> {
    info!(index = mirror.index, "got repo mirror request");

    let mut sheet = open_sheet(&state, path.id, true).await.ok_or(NOT_FOUND)?;
    if !sheet.select_mirror(mirror.index) {
        return Err(NOT_FOUND);
    }

    update_sheet(&state, sheet).await
}

#[derive(Deserialize)]
pub struct Enabled {
    enabled: bool,
}

#[instrument(skip_all, fields(id = path.id))]
pub async fn enabled(
    State(state): State<AppState>,
    Path(path): Path<BasePath>,
    Json(enabled): Json<Enabled>,
) -> Result<Json<SheetView>, StatusJson> {
    info!(enabled = enabled.enabled, "got repo enable request");

    let mut record = state.repos.get(path.id).await.ok_or(NOT_FOUND)?;
    record.enabled = enabled.enabled;

    if !state.repos.update(record.clone()).await? {
        return Err(NOT_FOUND);
    }

    let count = state.products.count(path.id).await;
    Ok(Json(
        RepoSheet::open(path.id, Some(record), count, false, None).view(),
    ))
}

#[instrument(skip_all, fields(id = path.id))]
pub async fn delete(
    State(state): State<AppState>,
    Path(path): Path<BasePath>,
) -> Result<StatusCode, StatusJson> {
    info!("got repo delete request");

    let sheet = open_sheet(&state, path.id, false).await.ok_or(NOT_FOUND)?;
    sheet
        .delete(&state.sync, || info!("repository sheet dismissed"))
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn validate(Json(form): Json<RepoForm>) -> Json<Validation> {
    Json(Validation::check(&form))
}

#[derive(Deserialize)]
pub struct Clipboard {
    text: String,
}

pub async fn prefill(Json(clipboard): Json<Clipboard>) -> Json<Option<Prefill>> {
    Json(validate::prefill(&clipboard.text))
}

async fn open_sheet(state: &AppState, id: u64, edit_mode: bool) -> Option<RepoSheet> {
    let record = state.repos.get(id).await?;
    let count = state.products.count(id).await;

    Some(RepoSheet::open(id, Some(record), count, edit_mode, None))
}

/// Save the sheet and produce the record to store, or the response to send instead if any field
/// is invalid.
fn save_sheet(
    sheet: &mut RepoSheet,
) -> Result<Result<RepositoryRecord, Response>, StatusJson> {
    if !sheet.can_save() {
        return Ok(Err(Invalid(sheet.validation()).into_response()));
    }

    let mut saved = None;
    sheet.save(|record| saved = record);
    let record = saved.ok_or_else(|| anyhow!("sheet without repository"))?;

    Ok(Ok(record))
}

async fn update_sheet(state: &AppState, mut sheet: RepoSheet) -> Result<Response, StatusJson> {
    let record = match save_sheet(&mut sheet)? {
        Ok(record) => record,
        Err(res) => return Ok(res),
    };

    let record = match state.repos.update_unique(record).await? {
        Some(Stored::Saved(record)) => record,
        Some(Stored::AddressInUse(other)) => return Ok(address_in_use(other)),
        None => return Err(NOT_FOUND),
    };

    sheet.refresh(Some(record));

    Ok(Json(sheet.view()).into_response())
}

fn address_in_use(other: u64) -> Response {
    info!(other, "address already in use");
    CONFLICT.into_response()
}

/// Replace the fields of `base` with all non-empty fields of `form`.
fn overlay(mut base: RepoForm, form: RepoForm) -> RepoForm {
    for (target, value) in [
        (&mut base.address, form.address),
        (&mut base.fingerprint, form.fingerprint),
        (&mut base.username, form.username),
        (&mut base.password, form.password),
    ] {
        if !value.is_empty() {
            *target = value;
        }
    }

    base
}
