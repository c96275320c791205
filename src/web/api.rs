use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use tracing::info;

use super::responses::{handle_error, handle_result, ok};
use super::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::BuildProgress;
use crate::query::FilterCriteria;

/// Listing filters as received on the query string
///
/// Numbers arrive as strings so malformed values can be rejected with a
/// validation error instead of a generic extractor failure. The aliases are
/// the form field names of the legacy HTML front-end.
#[derive(Debug, Default, Deserialize)]
pub struct ArtistQueryParams {
    pub search: Option<String>,
    #[serde(alias = "membres")]
    pub members: Option<String>,
    #[serde(alias = "date")]
    pub created_before: Option<String>,
    #[serde(alias = "date_album")]
    pub album_before: Option<String>,
}

impl ArtistQueryParams {
    pub fn into_criteria(self) -> AppResult<FilterCriteria> {
        Ok(FilterCriteria {
            member_count: parse_number("members", self.members.as_deref())?,
            created_on_or_before: parse_number("created_before", self.created_before.as_deref())?,
            first_album_on_or_before: parse_number("album_before", self.album_before.as_deref())?,
            text: self.search.filter(|s| !s.is_empty()),
        })
    }
}

/// Empty values count as absent, like an untouched form field
fn parse_number<T: std::str::FromStr>(field: &str, value: Option<&str>) -> AppResult<Option<T>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| {
                AppError::validation(format!(
                    "{} must be a whole number, got '{}'",
                    field, raw
                ))
            }),
    }
}

pub async fn list_artists(
    State(state): State<AppState>,
    Query(params): Query<ArtistQueryParams>,
) -> Response {
    let criteria = match params.into_criteria() {
        Ok(criteria) => criteria,
        Err(e) => return handle_error(e),
    };

    handle_result(state.query_service.search(&criteria).await)
}

pub async fn get_artist(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    match id.parse::<u32>() {
        Ok(id) => handle_result(state.query_service.get_artist(id).await),
        Err(_) => handle_error(AppError::not_found("artist", id)),
    }
}

pub async fn rebuild_snapshot(State(state): State<AppState>) -> Response {
    info!("Manual snapshot rebuild requested");
    handle_result(state.cache.rebuild().await.map_err(AppError::from))
}

pub async fn snapshot_status(State(state): State<AppState>) -> Response {
    ok(state.cache.status().await)
}

/// Tracked builds, most recent first
pub async fn build_progress(State(state): State<AppState>) -> Response {
    let mut progress: Vec<BuildProgress> = state
        .cache
        .state_manager()
        .get_all_progress()
        .await
        .into_values()
        .collect();
    progress.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    ok(progress)
}
