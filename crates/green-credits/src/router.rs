use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::engine::{
    ActivityPublisher, CreditsError, DeviceAnswers, GreenCreditsService, NewSubmission, NewUser,
    PersistenceAdapter, RedemptionId, RewardDraft, RewardId, SubmissionId, SubmissionStatus,
    UserId,
};

const DEFAULT_ACTIVITY_LIMIT: usize = 50;

type Shared<P, A> = State<Arc<GreenCreditsService<P, A>>>;

impl IntoResponse for CreditsError {
    fn into_response(self) -> Response {
        let status = match &self {
            CreditsError::NotFound { .. } => StatusCode::NOT_FOUND,
            CreditsError::InvalidTransition { .. } | CreditsError::AlreadyFinalized { .. } => {
                StatusCode::CONFLICT
            }
            CreditsError::TierLocked { .. }
            | CreditsError::OutOfStock { .. }
            | CreditsError::InsufficientCredits { .. }
            | CreditsError::InsufficientFunds { .. }
            | CreditsError::AccountSuspended(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CreditsError::Validation(_) | CreditsError::InvalidAmount { .. } => {
                StatusCode::BAD_REQUEST
            }
            CreditsError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "green credits request failed");
        }
        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(payload)).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, CreditsError>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub user_id: UserId,
    pub category: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub intent: String,
}

impl From<SubmissionRequest> for NewSubmission {
    fn from(value: SubmissionRequest) -> Self {
        Self {
            user_id: value.user_id,
            category: value.category,
            condition: value.condition,
            intent: value.intent,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectionRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BonusRequest {
    pub amount: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub user_id: UserId,
    pub reward_id: RewardId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusFilter {
    pub status: SubmissionStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

/// JSON routes over the credits engine, mounted under `/api/v1`.
pub fn credits_router<P, A>(service: Arc<GreenCreditsService<P, A>>) -> Router
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/users",
            get(list_users_handler::<P, A>).post(register_user_handler::<P, A>),
        )
        .route("/api/v1/users/:user_id", get(user_handler::<P, A>))
        .route(
            "/api/v1/users/:user_id/suspend",
            post(suspend_user_handler::<P, A>),
        )
        .route(
            "/api/v1/users/:user_id/reactivate",
            post(reactivate_user_handler::<P, A>),
        )
        .route("/api/v1/users/:user_id/bonus", post(bonus_handler::<P, A>))
        .route(
            "/api/v1/users/:user_id/summary",
            get(summary_handler::<P, A>),
        )
        .route(
            "/api/v1/users/:user_id/transactions",
            get(history_handler::<P, A>),
        )
        .route(
            "/api/v1/users/:user_id/submissions",
            get(user_submissions_handler::<P, A>),
        )
        .route(
            "/api/v1/users/:user_id/redemptions",
            get(user_redemptions_handler::<P, A>),
        )
        .route(
            "/api/v1/users/:user_id/rewards",
            get(available_rewards_handler::<P, A>),
        )
        .route(
            "/api/v1/recommendations",
            post(recommend_handler::<P, A>),
        )
        .route(
            "/api/v1/submissions",
            get(submissions_by_status_handler::<P, A>).post(create_submission_handler::<P, A>),
        )
        .route(
            "/api/v1/submissions/:submission_id",
            get(submission_handler::<P, A>),
        )
        .route(
            "/api/v1/submissions/:submission_id/drop",
            post(drop_handler::<P, A>),
        )
        .route(
            "/api/v1/submissions/:submission_id/verify",
            post(verify_handler::<P, A>),
        )
        .route(
            "/api/v1/submissions/:submission_id/reject",
            post(reject_submission_handler::<P, A>),
        )
        .route(
            "/api/v1/drop-off/:code",
            get(drop_off_lookup_handler::<P, A>),
        )
        .route(
            "/api/v1/rewards",
            get(list_rewards_handler::<P, A>).post(create_reward_handler::<P, A>),
        )
        .route(
            "/api/v1/rewards/:reward_id",
            get(reward_handler::<P, A>)
                .put(update_reward_handler::<P, A>)
                .delete(delete_reward_handler::<P, A>),
        )
        .route("/api/v1/redemptions", post(redeem_handler::<P, A>))
        .route(
            "/api/v1/redemptions/:redemption_id",
            get(redemption_handler::<P, A>),
        )
        .route(
            "/api/v1/redemptions/:redemption_id/approve",
            post(approve_redemption_handler::<P, A>),
        )
        .route(
            "/api/v1/redemptions/:redemption_id/reject",
            post(reject_redemption_handler::<P, A>),
        )
        .route(
            "/api/v1/redemptions/:redemption_id/fulfill",
            post(fulfill_redemption_handler::<P, A>),
        )
        .route(
            "/api/v1/redemptions/:redemption_id/cancel",
            post(cancel_redemption_handler::<P, A>),
        )
        .route("/api/v1/admin/overview", get(overview_handler::<P, A>))
        .route(
            "/api/v1/admin/redemptions",
            get(pending_redemptions_handler::<P, A>),
        )
        .route("/api/v1/admin/activity", get(activity_handler::<P, A>))
        .route(
            "/api/v1/admin/ledger/consistency",
            get(consistency_handler::<P, A>),
        )
        .with_state(service)
}

// ----- users -----

pub(crate) async fn register_user_handler<P, A>(
    State(service): Shared<P, A>,
    Json(request): Json<NewUser>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::CREATED, service.register_user(request))
}

pub(crate) async fn list_users_handler<P, A>(State(service): Shared<P, A>) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.list_users())
}

pub(crate) async fn user_handler<P, A>(
    State(service): Shared<P, A>,
    Path(user_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.user(&UserId(user_id)))
}

pub(crate) async fn suspend_user_handler<P, A>(
    State(service): Shared<P, A>,
    Path(user_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.suspend_user(&UserId(user_id)))
}

pub(crate) async fn reactivate_user_handler<P, A>(
    State(service): Shared<P, A>,
    Path(user_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.reactivate_user(&UserId(user_id)))
}

pub(crate) async fn bonus_handler<P, A>(
    State(service): Shared<P, A>,
    Path(user_id): Path<String>,
    Json(request): Json<BonusRequest>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    let result = service.grant_bonus(&UserId(user_id), request.amount, &request.description);
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn summary_handler<P, A>(
    State(service): Shared<P, A>,
    Path(user_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.user_summary(&UserId(user_id)))
}

pub(crate) async fn history_handler<P, A>(
    State(service): Shared<P, A>,
    Path(user_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.history(&UserId(user_id)))
}

pub(crate) async fn user_submissions_handler<P, A>(
    State(service): Shared<P, A>,
    Path(user_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.submissions_for(&UserId(user_id)))
}

pub(crate) async fn user_redemptions_handler<P, A>(
    State(service): Shared<P, A>,
    Path(user_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.redemptions_for(&UserId(user_id)))
}

pub(crate) async fn available_rewards_handler<P, A>(
    State(service): Shared<P, A>,
    Path(user_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.available_rewards(&UserId(user_id)))
}

// ----- submissions -----

pub(crate) async fn recommend_handler<P, A>(
    State(service): Shared<P, A>,
    Json(answers): Json<DeviceAnswers>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    (StatusCode::OK, Json(service.recommend(&answers))).into_response()
}

pub(crate) async fn create_submission_handler<P, A>(
    State(service): Shared<P, A>,
    Json(request): Json<SubmissionRequest>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::CREATED, service.create_submission(request.into()))
}

pub(crate) async fn submissions_by_status_handler<P, A>(
    State(service): Shared<P, A>,
    Query(filter): Query<StatusFilter>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.submissions_by_status(filter.status))
}

pub(crate) async fn submission_handler<P, A>(
    State(service): Shared<P, A>,
    Path(submission_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.submission(&SubmissionId(submission_id)))
}

pub(crate) async fn drop_handler<P, A>(
    State(service): Shared<P, A>,
    Path(submission_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.mark_dropped(&SubmissionId(submission_id)))
}

pub(crate) async fn verify_handler<P, A>(
    State(service): Shared<P, A>,
    Path(submission_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.verify_submission(&SubmissionId(submission_id)),
    )
}

pub(crate) async fn reject_submission_handler<P, A>(
    State(service): Shared<P, A>,
    Path(submission_id): Path<String>,
    Json(request): Json<RejectionRequest>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    let result = service.reject_submission(&SubmissionId(submission_id), &request.reason);
    respond(StatusCode::OK, result)
}

pub(crate) async fn drop_off_lookup_handler<P, A>(
    State(service): Shared<P, A>,
    Path(code): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.find_by_drop_off_code(&code))
}

// ----- rewards -----

pub(crate) async fn list_rewards_handler<P, A>(State(service): Shared<P, A>) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.list_rewards())
}

pub(crate) async fn create_reward_handler<P, A>(
    State(service): Shared<P, A>,
    Json(draft): Json<RewardDraft>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::CREATED, service.create_reward(draft))
}

pub(crate) async fn reward_handler<P, A>(
    State(service): Shared<P, A>,
    Path(reward_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.reward(&RewardId(reward_id)))
}

pub(crate) async fn update_reward_handler<P, A>(
    State(service): Shared<P, A>,
    Path(reward_id): Path<String>,
    Json(draft): Json<RewardDraft>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.update_reward(&RewardId(reward_id), draft))
}

pub(crate) async fn delete_reward_handler<P, A>(
    State(service): Shared<P, A>,
    Path(reward_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.delete_reward(&RewardId(reward_id)))
}

// ----- redemptions -----

pub(crate) async fn redeem_handler<P, A>(
    State(service): Shared<P, A>,
    Json(request): Json<RedeemRequest>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(
        StatusCode::CREATED,
        service.redeem(&request.user_id, &request.reward_id),
    )
}

pub(crate) async fn redemption_handler<P, A>(
    State(service): Shared<P, A>,
    Path(redemption_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.redemption(&RedemptionId(redemption_id)))
}

pub(crate) async fn approve_redemption_handler<P, A>(
    State(service): Shared<P, A>,
    Path(redemption_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.approve_redemption(&RedemptionId(redemption_id)),
    )
}

pub(crate) async fn reject_redemption_handler<P, A>(
    State(service): Shared<P, A>,
    Path(redemption_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.reject_redemption(&RedemptionId(redemption_id)),
    )
}

pub(crate) async fn fulfill_redemption_handler<P, A>(
    State(service): Shared<P, A>,
    Path(redemption_id): Path<String>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.fulfill_redemption(&RedemptionId(redemption_id)),
    )
}

pub(crate) async fn cancel_redemption_handler<P, A>(
    State(service): Shared<P, A>,
    Path(redemption_id): Path<String>,
    Json(request): Json<CancelRequest>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    let result = service.cancel_redemption(&request.user_id, &RedemptionId(redemption_id));
    respond(StatusCode::OK, result)
}

// ----- admin -----

pub(crate) async fn overview_handler<P, A>(State(service): Shared<P, A>) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.admin_overview())
}

pub(crate) async fn pending_redemptions_handler<P, A>(State(service): Shared<P, A>) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    respond(StatusCode::OK, service.pending_redemptions())
}

pub(crate) async fn activity_handler<P, A>(
    State(service): Shared<P, A>,
    Query(query): Query<ActivityQuery>,
) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    respond(StatusCode::OK, service.activity_log(limit))
}

pub(crate) async fn consistency_handler<P, A>(State(service): Shared<P, A>) -> Response
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    match service.verify_consistency() {
        Ok(drift) => {
            let payload = json!({
                "consistent": drift.is_empty(),
                "drift": drift,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}
