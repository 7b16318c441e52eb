use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::dispatch::{DispatchError, DispatchPolicy};
use super::domain::{Listing, ProfileId, RequirementProfile};
use super::evaluation::MatchResult;
use super::outreach::MessageDrafter;
use super::pipeline::{MatchPipeline, PairFailureView, RunContext};
use super::ranking::RankOptions;
use super::repository::{
    AlertRepository, MatchAlertView, NotificationGateway, RepositoryError,
};

/// Router builder exposing HTTP endpoints for evaluation and dispatch.
pub fn matching_router<R, N, D>(pipeline: Arc<MatchPipeline<R, N, D>>) -> Router
where
    R: AlertRepository + 'static,
    N: NotificationGateway + 'static,
    D: MessageDrafter + 'static,
{
    Router::new()
        .route("/api/v1/matching/evaluate", post(evaluate_handler::<R, N, D>))
        .route("/api/v1/matching/dispatch", post(dispatch_handler::<R, N, D>))
        .route(
            "/api/v1/matching/alerts/:profile_id",
            get(alerts_handler::<R, N, D>),
        )
        .with_state(pipeline)
}

/// Side-effect-free scoring probe.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub profile: RequirementProfile,
    pub listings: Vec<Listing>,
    #[serde(default)]
    pub options: RankOptionsPayload,
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RankOptionsPayload {
    pub min_score: Option<u8>,
    pub limit: Option<usize>,
    pub scan_limit: Option<usize>,
}

impl RankOptionsPayload {
    fn into_options(self) -> RankOptions {
        let defaults = RankOptions::default();
        RankOptions {
            min_score: self.min_score.unwrap_or(defaults.min_score),
            limit: self.limit.unwrap_or(defaults.limit),
            scan_limit: self.scan_limit.or(defaults.scan_limit),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationView {
    pub profile_id: ProfileId,
    pub considered: usize,
    pub matches: Vec<MatchResult>,
    pub failures: Vec<PairFailureView>,
}

pub(crate) async fn evaluate_handler<R, N, D>(
    State(pipeline): State<Arc<MatchPipeline<R, N, D>>>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response
where
    R: AlertRepository + 'static,
    N: NotificationGateway + 'static,
    D: MessageDrafter + 'static,
{
    let computed_at = request.now.unwrap_or_else(Utc::now);
    let options = request.options.into_options();
    match pipeline.rank(&request.profile, &request.listings, &options, computed_at) {
        Ok(outcome) => {
            let view = EvaluationView {
                profile_id: request.profile.id.clone(),
                considered: outcome.considered,
                matches: outcome.ranked,
                failures: outcome
                    .failures
                    .iter()
                    .map(|failure| PairFailureView {
                        listing_id: failure.listing_id.clone(),
                        error: failure.error.to_string(),
                    })
                    .collect(),
            };
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}

/// Which built-in threshold set a dispatch run uses.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchContext {
    Ingestion,
    Dashboard,
}

impl Default for DispatchContext {
    fn default() -> Self {
        DispatchContext::Ingestion
    }
}

impl DispatchContext {
    fn policy(self) -> DispatchPolicy {
        match self {
            DispatchContext::Ingestion => DispatchPolicy::ingestion(),
            DispatchContext::Dashboard => DispatchPolicy::dashboard(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub profile: RequirementProfile,
    pub listings: Vec<Listing>,
    #[serde(default)]
    pub context: DispatchContext,
    pub batch_id: Option<String>,
    pub now: Option<DateTime<Utc>>,
}

pub(crate) async fn dispatch_handler<R, N, D>(
    State(pipeline): State<Arc<MatchPipeline<R, N, D>>>,
    axum::Json(request): axum::Json<DispatchRequest>,
) -> Response
where
    R: AlertRepository + 'static,
    N: NotificationGateway + 'static,
    D: MessageDrafter + 'static,
{
    let now = request.now.unwrap_or_else(Utc::now);
    let batch = request
        .batch_id
        .unwrap_or_else(|| format!("run-{}", now.timestamp_millis()));
    let ctx = RunContext::new(batch, now);
    let policy = request.context.policy();
    match pipeline.run_for_profile(&request.profile, &request.listings, &policy, &ctx) {
        Ok(report) => {
            let view = report.summary_view();
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(DispatchError::Validation(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn alerts_handler<R, N, D>(
    State(pipeline): State<Arc<MatchPipeline<R, N, D>>>,
    Path(profile_id): Path<String>,
) -> Response
where
    R: AlertRepository + 'static,
    N: NotificationGateway + 'static,
    D: MessageDrafter + 'static,
{
    let id = ProfileId(profile_id);
    match pipeline.open_alerts(&id) {
        Ok(alerts) => {
            let views: Vec<MatchAlertView> =
                alerts.iter().map(|alert| alert.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(RepositoryError::NotFound) => {
            let payload = json!({
                "profile_id": id.0,
                "alerts": [],
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
