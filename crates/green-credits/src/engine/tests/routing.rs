use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::engine::{CreditsError, MemoryActivityFeed, MemoryAdapter, RedemptionType, Stock, Tier};
use crate::router::credits_router;

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes");
    let status = response.status();
    (status, read_json_body(response).await)
}

#[test]
fn error_kinds_map_to_status_codes() {
    use axum::response::IntoResponse;

    let cases = [
        (
            CreditsError::NotFound {
                entity: "user",
                id: "usr-1".to_string(),
            },
            StatusCode::NOT_FOUND,
        ),
        (
            CreditsError::AlreadyFinalized {
                entity: "submission",
                id: "sub-1".to_string(),
                status: "COMPLETED",
            },
            StatusCode::CONFLICT,
        ),
        (
            CreditsError::InsufficientCredits {
                required: 10,
                available: 5,
            },
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            CreditsError::Validation("bad".to_string()),
            StatusCode::BAD_REQUEST,
        ),
        (
            CreditsError::Store(crate::engine::StoreError::Unavailable("down".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (error, expected) in cases {
        assert_eq!(error.into_response().status(), expected);
    }
}

#[tokio::test]
async fn submission_flow_over_http() {
    let h = harness();
    let router = credits_router(h.service.clone());

    let (status, user) = call(
        &router,
        post_json(
            "/api/v1/users",
            json!({ "name": "Ada", "email": "Ada@Campus.example" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "ada@campus.example");
    assert_eq!(user["role"], "user");
    let user_id = user["id"].as_str().unwrap().to_string();

    let (status, submission) = call(
        &router,
        post_json(
            "/api/v1/submissions",
            json!({
                "userId": user_id,
                "category": "Laptop",
                "condition": BROKEN,
                "intent": RECYCLE_INTENT,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(submission["status"], "PENDING");
    assert_eq!(submission["creditsPending"], 40);
    assert!(submission.get("creditsAwarded").is_none());
    let submission_id = submission["id"].as_str().unwrap().to_string();
    let code = submission["dropOffCode"].as_str().unwrap().to_string();

    let (status, found) = call(&router, get(&format!("/api/v1/drop-off/{code}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], submission_id.as_str());

    let (status, body) = call(
        &router,
        post_json(
            &format!("/api/v1/submissions/{submission_id}/verify"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");

    let (status, _) = call(
        &router,
        post_json(
            &format!("/api/v1/submissions/{submission_id}/drop"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, dropped) = call(&router, get("/api/v1/submissions?status=DROPPED")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dropped.as_array().unwrap().len(), 1);

    let (status, completed) = call(
        &router,
        post_json(
            &format!("/api/v1/submissions/{submission_id}/verify"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "COMPLETED");
    assert_eq!(completed["creditsAwarded"], 40);

    let (status, summary) = call(&router, get(&format!("/api/v1/users/{user_id}/summary"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["points"], 40);
    assert_eq!(summary["tier"], "bronze");
    assert_eq!(summary["nextTier"]["pointsNeeded"], 460);

    let (status, history) = call(
        &router,
        get(&format!("/api/v1/users/{user_id}/transactions")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["type"], "earned");
    assert_eq!(history[0]["balance"], 40);
}

#[tokio::test]
async fn redemption_errors_surface_as_unprocessable() {
    let h = harness();
    let user = register(&h.service, "Mary");
    fund(&h.service, &user.id, 400);
    let reward = add_reward(
        &h.service,
        "Reusable bottle",
        100,
        Tier::Silver,
        Stock::Limited(1),
        RedemptionType::Instant,
    );
    let router = credits_router(h.service.clone());

    let (status, body) = call(
        &router,
        post_json(
            "/api/v1/redemptions",
            json!({ "userId": user.id, "rewardId": reward.id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "tier_locked");

    let (status, _) = call(
        &router,
        post_json(
            &format!("/api/v1/users/{}/bonus", user.id),
            json!({ "amount": 100, "description": "Volunteer day" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, redemption) = call(
        &router,
        post_json(
            "/api/v1/redemptions",
            json!({ "userId": user.id, "rewardId": reward.id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(redemption["status"], "approved");
    assert!(redemption["redemptionCode"]
        .as_str()
        .unwrap()
        .starts_with("ECO-"));

    let (status, reward_view) = call(&router, get(&format!("/api/v1/rewards/{}", reward.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reward_view["stock"], 0);

    let (status, body) = call(
        &router,
        post_json(
            &format!("/api/v1/users/{}/bonus", user.id),
            json!({ "amount": -5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_amount");
}

#[tokio::test]
async fn unknown_records_are_not_found() {
    let h = harness();
    let router = credits_router(h.service.clone());

    for uri in [
        "/api/v1/users/usr-000404",
        "/api/v1/submissions/sub-000404",
        "/api/v1/rewards/rwd-000404",
        "/api/v1/redemptions/rdm-000404",
        "/api/v1/drop-off/DRP-00000",
    ] {
        let (status, body) = call(&router, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["kind"], "not_found");
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }
}

#[tokio::test]
async fn reward_catalog_is_managed_over_http() {
    let h = harness();
    let router = credits_router(h.service.clone());

    let (status, created) = call(
        &router,
        post_json(
            "/api/v1/rewards",
            json!({
                "name": "Campus cafe voucher",
                "category": "campus_perk",
                "creditCost": 200,
                "minTier": "silver",
                "stock": "unlimited",
                "redemptionType": "requires_approval",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["stock"], "unlimited");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, listed) = call(&router, get("/api/v1/rewards")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = router
        .clone()
        .oneshot(
            Request::delete(format!("/api/v1/rewards/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, overview) = call(&router, get("/api/v1/admin/overview")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["rewardsInCatalog"], 0);

    let (status, activity) = call(&router, get("/api/v1/admin/activity?limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(activity[0]["action"], "reward.deleted");
}

#[tokio::test]
async fn handlers_can_be_called_directly() {
    let h = harness();
    let user = register(&h.service, "Alan");

    let response = crate::router::user_handler::<MemoryAdapter, MemoryActivityFeed>(
        State(h.service.clone()),
        Path(user.id.to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["name"], "Alan");

    let response = crate::router::consistency_handler::<MemoryAdapter, MemoryActivityFeed>(
        State(h.service.clone()),
    )
    .await;
    let payload = read_json_body(response).await;
    assert_eq!(payload["consistent"], true);
}
