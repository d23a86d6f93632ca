#![allow(dead_code)]

use std::sync::Arc;

use base64::Engine;
use dashboard_core::{CARDS, Document, ProblemCatalog, THREADS, USERS};
use dashboard_persistence::{DocumentRepository, connection::connect_to_memory_database};
use dashboard_server::auth::AuthService;
use dashboard_server::websocket::DashboardContext;
use dashboard_server::{create_routes, dashboard_context};
use migration::{Migrator, MigratorTrait};
use serde_json::json;
use warp::Filter;

/// In-memory repository holding the two-user scenario plus a few threads and decks
pub async fn seeded_repository() -> Arc<DocumentRepository> {
    let db = connect_to_memory_database().await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let repo = DocumentRepository::new(db);

    let users = [
        ("u1", "a@x.com", "Alice", 10),
        ("u2", "b@x.com", "Bob", 25),
    ];
    for (id, email, name, score) in users {
        repo.put_document(
            USERS,
            Document::new(id, json!({ "email": email, "name": name, "score": score })),
        )
        .await
        .unwrap();
    }
    for thread in ["graphs", "recursion"] {
        repo.put_document(THREADS, Document::new(thread, json!({})))
            .await
            .unwrap();
    }
    repo.put_document(CARDS, Document::new("big-o", json!({ "cards": [] })))
        .await
        .unwrap();

    Arc::new(repo)
}

pub async fn create_test_context(auth_service: AuthService) -> DashboardContext {
    dashboard_context(
        Arc::new(auth_service),
        seeded_repository().await,
        ProblemCatalog::bundled().unwrap(),
        "/signin".to_string(),
    )
}

pub async fn create_dev_test_app()
-> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    create_routes(create_test_context(AuthService::new_dev_mode()).await)
}

pub async fn create_test_app()
-> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    create_routes(create_test_context(AuthService::new("learn-buddy-test".to_string())).await)
}

/// Dev-mode token in the `uid:email:name` form
pub fn dev_token(email: &str, name: &str) -> String {
    format!("uid-{}:{}:{}", name.to_lowercase(), email, name)
}

/// JWT with a bogus signature carrying the given claims, accepted only in dev mode
pub fn dev_jwt(claims: serde_json::Value) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = engine.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}
