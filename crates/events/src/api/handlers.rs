use axum::Json;
use axum::extract::State;
use store::EventQuery;
use tracing::debug;

use super::AppState;
use super::error::ApiError;
use super::models::{EventRequest, EventResponse};

/// Liveness only, never touches the database
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn get_events(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let query = EventQuery::from(request);
    debug!(
        "Querying events for {} (action: {:?}, limit: {})",
        query.project_key, query.action, query.limit
    );

    let events = state.store.query_events(&query).await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}
