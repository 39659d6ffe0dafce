use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use tracing::{error, info};

use crate::services::champion_catalog::ChampionCatalogClient;

/**
 * GET the current champion catalog.
 */
pub async fn get_champions(
    Extension(catalog): Extension<Arc<ChampionCatalogClient>>,
) -> impl IntoResponse {
    info!("Fetching champions.");

    match catalog.fetch_champions().await {
        Ok(champions) => (StatusCode::OK, Json(champions)).into_response(),
        Err(e) => {
            error!("Champion catalog error: {}", e);
            (StatusCode::BAD_GATEWAY, "Could not load champions.".to_string()).into_response()
        }
    }
}
