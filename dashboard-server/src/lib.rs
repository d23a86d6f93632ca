use std::sync::Arc;
use std::time::Duration;
use warp::Filter;
use warp::http::StatusCode;

use crate::auth::AuthService;
use crate::websocket::DashboardContext;
use dashboard_core::{DocumentStore, ProblemCatalog, load_view_state};

pub mod auth;
pub mod config;
pub mod websocket;

pub const DEFAULT_AUTH_GRACE_PERIOD: Duration = Duration::from_secs(5);

pub fn create_routes(
    context: DashboardContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let context_filter = warp::any().map({
        let context = context.clone();
        move || context.clone()
    });

    let catalog_filter = warp::any().map({
        let catalog = context.catalog.clone();
        move || catalog.clone()
    });

    // Live dashboard session
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(context_filter.clone())
        .map(|ws: warp::ws::Ws, context: DashboardContext| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, context))
        });

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // One-shot dashboard snapshot for the bearer of the token
    let dashboard = warp::path("dashboard")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(context_filter.clone())
        .and_then(handle_dashboard_request);

    let problems = warp::path("problems")
        .and(warp::path::end())
        .and(warp::get())
        .and(catalog_filter)
        .and_then(handle_problems_request);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .or(dashboard)
        .or(problems)
        .with(cors)
        .with(warp::log("learn_buddy"))
}

/// Build the shared state the routes run on.
pub fn dashboard_context(
    auth_service: Arc<AuthService>,
    store: Arc<dyn DocumentStore>,
    catalog: ProblemCatalog,
    signin_path: String,
) -> DashboardContext {
    DashboardContext {
        session_manager: Arc::new(websocket::SessionManager::new()),
        auth_service,
        store,
        catalog: Arc::new(catalog),
        options: dashboard_core::DashboardOptions { signin_path },
        auth_grace_period: DEFAULT_AUTH_GRACE_PERIOD,
    }
}

fn unauthorized(message: &str, signin_path: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
            "redirect": signin_path,
        })),
        StatusCode::UNAUTHORIZED,
    )
}

async fn handle_dashboard_request(
    auth_header: Option<String>,
    context: DashboardContext,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signin_path = &context.options.signin_path;

    let Some(auth_header) = auth_header else {
        return Ok(unauthorized("Authentication required", signin_path));
    };
    let token = auth_header.strip_prefix("Bearer ").unwrap_or(&auth_header);

    let user = match context.auth_service.validate_token(token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Rejected dashboard request: {}", e);
            return Ok(unauthorized("Invalid authentication token", signin_path));
        }
    };

    let state = load_view_state(context.store.as_ref(), &user.email).await;
    Ok(warp::reply::with_status(
        warp::reply::json(&state),
        StatusCode::OK,
    ))
}

async fn handle_problems_request(
    catalog: Arc<ProblemCatalog>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&catalog.problems()))
}
