use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::DraftSettings;
use crate::dto::match_dto::{InitMatch, NextSetRequest, PreparingRequest, ReadyRequest, TotalRequest};
use crate::dto::turn_dto::{AdvanceRequest, TurnRequest};
use crate::error::StoreError;
use crate::services::champion_catalog::ChampionCatalogClient;
use crate::services::turn_timer::TurnWatchers;
use crate::services::{initializer, readiness, set_advancer, totals, turn_coordinator};
use crate::store::DraftStore;

/// 200 with the outcome, or a logged 500 when the store failed.
fn respond<T: Serialize>(match_id: &str, action: &str, result: Result<T, StoreError>) -> Response {
    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(StoreError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "Draft was not found.".to_string()).into_response()
        }
        Err(e) => {
            error!(match_id, "Failed to {}: {}", action, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {}.", action)).into_response()
        }
    }
}

/**
 * GET the whole draft document for a match.
 */
pub async fn get_draft<S: DraftStore>(
    Extension(store): Extension<Arc<S>>,
    Path(match_id): Path<String>,
) -> Response {
    match store.get(&match_id).await {
        Ok(Some(draft)) => (StatusCode::OK, Json(draft)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Draft was not found.".to_string()).into_response(),
        Err(e) => {
            error!(match_id, "Failed to load draft: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load draft.".to_string()).into_response()
        }
    }
}

/**
 * POST to create the match document on first touch.
 */
pub async fn init_match<S: DraftStore>(
    Extension(store): Extension<Arc<S>>,
    Extension(settings): Extension<Arc<DraftSettings>>,
    Extension(watchers): Extension<Arc<TurnWatchers>>,
    Extension(catalog): Extension<Arc<ChampionCatalogClient>>,
    Path(match_id): Path<String>,
    Json(payload): Json<InitMatch>,
) -> Response {
    info!(match_id, team_name = %payload.team_name, "Initializing match.");
    let result = initializer::initialize(
        &*store,
        &match_id,
        &payload.mode,
        &payload.team_name,
        &payload.opposite_team,
        payload.initial_side,
    )
    .await;

    if result.as_ref().is_ok_and(|outcome| *outcome != initializer::InitOutcome::SameTeamNames) {
        watch_turns(&store, &settings, &watchers, catalog, &match_id).await;
    }
    respond(&match_id, "initialize draft", result)
}

/// Readying up re-arms the turn timer for a match whose watcher went idle.
pub async fn mark_ready<S: DraftStore>(
    Extension(store): Extension<Arc<S>>,
    Extension(settings): Extension<Arc<DraftSettings>>,
    Extension(watchers): Extension<Arc<TurnWatchers>>,
    Extension(catalog): Extension<Arc<ChampionCatalogClient>>,
    Path(match_id): Path<String>,
    Json(payload): Json<ReadyRequest>,
) -> Response {
    let result =
        readiness::mark_ready(&*store, &match_id, &payload.team_name, payload.initial_side).await;
    if matches!(result, Ok(readiness::ReadyOutcome::Marked { .. })) {
        watch_turns(&store, &settings, &watchers, catalog, &match_id).await;
    }
    respond(&match_id, "mark team ready", result)
}

async fn watch_turns<S: DraftStore>(
    store: &Arc<S>,
    settings: &DraftSettings,
    watchers: &Arc<TurnWatchers>,
    catalog: Arc<ChampionCatalogClient>,
    match_id: &str,
) {
    if let Some(turn_time) = settings.turn_time {
        watchers
            .ensure(store.clone(), catalog, match_id, turn_time, settings.max_sets)
            .await;
    }
}

pub async fn start_set<S: DraftStore>(
    Extension(store): Extension<Arc<S>>,
    Path(match_id): Path<String>,
) -> Response {
    let result = readiness::set_started_at_if_needed(&*store, &match_id).await;
    respond(&match_id, "start set", result)
}

/**
 * POST a ban or pick for the step the client believes is current.
 */
pub async fn apply_turn<S: DraftStore>(
    Extension(store): Extension<Arc<S>>,
    Path(match_id): Path<String>,
    Json(payload): Json<TurnRequest>,
) -> Response {
    info!(
        match_id,
        team_name = %payload.team_name,
        champion = %payload.champion,
        action = %payload.action,
        expected_step = payload.expected_step,
        "Applying turn."
    );
    let result = turn_coordinator::apply_turn(
        &*store,
        &match_id,
        &payload.team_name,
        &payload.champion,
        payload.action,
        payload.expected_step,
    )
    .await;
    respond(&match_id, "apply turn", result)
}

pub async fn advance_step<S: DraftStore>(
    Extension(store): Extension<Arc<S>>,
    Path(match_id): Path<String>,
    Json(payload): Json<AdvanceRequest>,
) -> Response {
    let result = turn_coordinator::advance_step_only(&*store, &match_id, payload.expected_step).await;
    respond(&match_id, "advance step", result)
}

pub async fn toggle_preparing<S: DraftStore>(
    Extension(store): Extension<Arc<S>>,
    Path(match_id): Path<String>,
    Json(payload): Json<PreparingRequest>,
) -> Response {
    let result = readiness::toggle_preparing(&*store, &match_id, payload.value)
        .await
        .map(|changed| json!({ "changed": changed }));
    respond(&match_id, "toggle preparing flag", result)
}

/**
 * POST to open the next set once the current one is fully drafted.
 */
pub async fn create_next_set<S: DraftStore>(
    Extension(store): Extension<Arc<S>>,
    Extension(settings): Extension<Arc<DraftSettings>>,
    Path(match_id): Path<String>,
    Json(payload): Json<NextSetRequest>,
) -> Response {
    let result = set_advancer::create_next_set(
        &*store,
        &match_id,
        payload.winning_side,
        &payload.team_name,
        &payload.opposite_team,
        settings.max_sets,
    )
    .await;
    respond(&match_id, "create next set", result)
}

pub async fn commit_total<S: DraftStore>(
    Extension(store): Extension<Arc<S>>,
    Path(match_id): Path<String>,
    Json(payload): Json<TotalRequest>,
) -> Response {
    let result = totals::commit_total_if_needed(&*store, &match_id, &payload.team_name).await;
    respond(&match_id, "commit total", result)
}
