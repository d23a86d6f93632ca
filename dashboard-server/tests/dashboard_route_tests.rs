mod test_helpers;

use dashboard_core::ProblemCatalog;
use dashboard_types::{Problem, ViewState};
use serde_json::json;
use test_helpers::*;

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let response = warp::test::request()
        .method("GET")
        .path("/health")
        .reply(&app)
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), "OK");
}

#[tokio::test]
async fn test_problems_endpoint() {
    let app = create_test_app().await;

    let response = warp::test::request()
        .method("GET")
        .path("/problems")
        .reply(&app)
        .await;

    assert_eq!(response.status(), 200);
    let problems: Vec<Problem> = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(problems.len(), ProblemCatalog::bundled().unwrap().len());

    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert!(body[0]["shortTitle"].is_string());
    assert!(body[0]["difficulty"].is_string());
}

#[tokio::test]
async fn test_dashboard_requires_authentication() {
    let app = create_dev_test_app().await;

    let response = warp::test::request()
        .method("GET")
        .path("/dashboard")
        .reply(&app)
        .await;

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["error"], "Authentication required");
    assert_eq!(body["redirect"], "/signin");
}

#[tokio::test]
async fn test_dashboard_rejects_invalid_token() {
    let app = create_test_app().await;

    let response = warp::test::request()
        .method("GET")
        .path("/dashboard")
        .header("authorization", "Bearer not-a-real-token")
        .reply(&app)
        .await;

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["error"], "Invalid authentication token");
}

#[tokio::test]
async fn test_dashboard_for_signed_in_user() {
    let app = create_dev_test_app().await;

    let response = warp::test::request()
        .method("GET")
        .path("/dashboard")
        .header(
            "authorization",
            format!("Bearer {}", dev_token("a@x.com", "Alice")),
        )
        .reply(&app)
        .await;

    assert_eq!(response.status(), 200);
    let state: ViewState = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(
        state,
        ViewState::Ready {
            name: "Alice".to_string(),
            your_score: 10,
            highest_score: 25,
            thread_ids: vec!["graphs".to_string(), "recursion".to_string()],
            deck_ids: vec!["big-o".to_string()],
        }
    );
}

#[tokio::test]
async fn test_dashboard_accepts_dev_jwt() {
    let app = create_dev_test_app().await;
    let token = dev_jwt(json!({ "sub": "u2", "email": "b@x.com" }));

    let response = warp::test::request()
        .method("GET")
        .path("/dashboard")
        .header("authorization", format!("Bearer {}", token))
        .reply(&app)
        .await;

    assert_eq!(response.status(), 200);
    let state: ViewState = serde_json::from_slice(response.body()).unwrap();
    match state {
        ViewState::Ready {
            name, your_score, ..
        } => {
            assert_eq!(name, "Bob");
            assert_eq!(your_score, 25);
        }
        other => panic!("Expected Ready, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dashboard_for_user_without_record() {
    let app = create_dev_test_app().await;

    let response = warp::test::request()
        .method("GET")
        .path("/dashboard")
        .header(
            "authorization",
            format!("Bearer {}", dev_token("ghost@x.com", "Ghost")),
        )
        .reply(&app)
        .await;

    assert_eq!(response.status(), 200);
    let state: ViewState = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(state, ViewState::error("User data not found."));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app().await;

    let response = warp::test::request()
        .method("OPTIONS")
        .path("/dashboard")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "authorization")
        .reply(&app)
        .await;

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_invalid_routes() {
    let app = create_test_app().await;

    let response = warp::test::request()
        .method("GET")
        .path("/nonexistent")
        .reply(&app)
        .await;

    assert_eq!(response.status(), 404);
}
