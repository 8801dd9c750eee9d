//! Snippetbox routes

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::{path::Path, time::Duration};
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, timeout::TimeoutLayer};

use crate::{
    csrf::prevent_csrf,
    handlers::{
        health_check, home, not_found, snippet_create, snippet_create_post, snippet_view,
        user_login, user_login_post, user_logout_post, user_signup, user_signup_post,
    },
    middleware::{authenticate, common_headers, log_request, recover_panic, require_authentication},
    session::load_and_save,
    state::AppState,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the application router
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    let protected_routes = Router::new()
        .route("/snippet/create", get(snippet_create).post(snippet_create_post))
        .route("/user/logout", post(user_logout_post))
        .route_layer(middleware::from_fn(require_authentication));

    // layers run bottom-up: session, then CSRF, then authentication
    let dynamic_routes = Router::new()
        .route("/", get(home))
        .route("/snippet/view/:id", get(snippet_view))
        .route("/user/signup", get(user_signup).post(user_signup_post))
        .route("/user/login", get(user_login).post(user_login_post))
        .merge(protected_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .route_layer(middleware::from_fn(prevent_csrf))
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            load_and_save,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(dynamic_routes)
        .fallback(not_found)
        .with_state(state)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(common_headers))
        .layer(middleware::from_fn(log_request))
        .layer(CatchPanicLayer::custom(recover_panic))
}
