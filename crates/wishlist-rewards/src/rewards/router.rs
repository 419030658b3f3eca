use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::domain::{AwardMetadata, AwardResult, BadgeAction, UserId};
use super::service::{RewardsService, RewardsServiceError, RewardsStore};

/// Body accepted by the action endpoint. `action` stays a raw tag so unknown
/// actions fail closed instead of being rejected.
#[derive(Debug, Deserialize)]
pub struct ActionEvent {
    pub action: String,
    #[serde(default)]
    pub metadata: Option<AwardMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub points: u64,
    pub level: u64,
}

/// Router builder exposing badge evaluation and level queries over HTTP.
pub fn rewards_router<S>(service: Arc<RewardsService<S>>) -> Router
where
    S: RewardsStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/rewards/users/:user_id/actions",
            post(action_handler::<S>),
        )
        .route("/api/v1/rewards/users/:user_id", get(summary_handler::<S>))
        .route("/api/v1/rewards/levels/:level", get(level_handler::<S>))
        .route("/api/v1/rewards/progress", get(progress_handler::<S>))
        .with_state(service)
}

pub(crate) async fn action_handler<S>(
    State(service): State<Arc<RewardsService<S>>>,
    Path(user_id): Path<String>,
    Json(event): Json<ActionEvent>,
) -> Response
where
    S: RewardsStore + 'static,
{
    let user_id = UserId(user_id);
    let results: Vec<AwardResult> = match event.action.parse::<BadgeAction>() {
        Ok(action) => service.check_and_award_badges(&user_id, action, event.metadata.as_ref()),
        Err(err) => {
            info!(user = %user_id, error = %err, "ignoring unknown action");
            Vec::new()
        }
    };
    (StatusCode::OK, Json(results)).into_response()
}

pub(crate) async fn summary_handler<S>(
    State(service): State<Arc<RewardsService<S>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: RewardsStore + 'static,
{
    match service.summary(&UserId(user_id)) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err @ RewardsServiceError::UnknownUser(_)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn level_handler<S>(
    State(service): State<Arc<RewardsService<S>>>,
    Path(level): Path<u64>,
) -> Response
where
    S: RewardsStore + 'static,
{
    let payload = json!({
        "level": level,
        "points_for_next_level": service.points_for_next_level(level),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn progress_handler<S>(
    State(service): State<Arc<RewardsService<S>>>,
    Query(query): Query<ProgressQuery>,
) -> Response
where
    S: RewardsStore + 'static,
{
    let payload = json!({
        "points": query.points,
        "level": query.level,
        "progress": service.level_progress(query.points, query.level),
    });
    (StatusCode::OK, Json(payload)).into_response()
}
