pub mod champions;
pub mod draft;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::config::DraftSettings;
use crate::services::champion_catalog::ChampionCatalogClient;
use crate::services::turn_timer::TurnWatchers;
use crate::services::websocket::websocket_handler;
use crate::store::DraftStore;

pub fn router<S: DraftStore>(
    store: Arc<S>,
    settings: Arc<DraftSettings>,
    catalog: Arc<ChampionCatalogClient>,
    watchers: Arc<TurnWatchers>,
) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/champions", get(champions::get_champions))
        .route("/matches/{match_id}", get(draft::get_draft::<S>))
        .route("/matches/{match_id}/init", post(draft::init_match::<S>))
        .route("/matches/{match_id}/ready", post(draft::mark_ready::<S>))
        .route("/matches/{match_id}/start", post(draft::start_set::<S>))
        .route("/matches/{match_id}/turn", post(draft::apply_turn::<S>))
        .route("/matches/{match_id}/advance", post(draft::advance_step::<S>))
        .route("/matches/{match_id}/preparing", post(draft::toggle_preparing::<S>))
        .route("/matches/{match_id}/next-set", post(draft::create_next_set::<S>))
        .route("/matches/{match_id}/total", post(draft::commit_total::<S>))
        .route("/matches/{match_id}/ws", get(websocket_handler::<S>))
        .layer(Extension(store))
        .layer(Extension(settings))
        .layer(Extension(catalog))
        .layer(Extension(watchers))
        .layer(CorsLayer::permissive())
}
