// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, progress, rounds, submissions},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, rounds, progress, submissions, admin).
/// * Applies global middleware (Trace, CORS, rate limiting).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://localhost:5173".parse().unwrap(),
        "http://127.0.0.1:5173".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Generous enough for the client's round polling.
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10)
        .burst_size(50)
        .finish()
        .unwrap();

    let governor_conf = Arc::new(governor_conf);

    let auth_routes = Router::new().route("/login", post(auth::login));

    let round_routes = Router::new()
        // Full pools are admin-only; they contain every partition and the
        // buggy-code payloads.
        .merge(
            Router::new()
                .route("/", get(rounds::list_rounds))
                .layer(middleware::from_fn(admin_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        // Team-facing reads and the language selection.
        .merge(
            Router::new()
                .route("/for-team/{team}", get(rounds::rounds_for_team))
                .route("/allocate-language", post(rounds::allocate_language))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let progress_routes = Router::new()
        .route("/", post(progress::record_progress))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let submission_routes = Router::new()
        .route("/", post(submissions::submit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/teams", get(admin::list_teams).post(admin::register_team))
        .route("/teams/{username}", delete(admin::delete_team))
        .route("/award-xp", post(admin::award_xp))
        .route("/rounds", post(admin::create_round))
        .route("/rounds/{id}", delete(admin::delete_round))
        .route("/rounds/{id}/questions", post(admin::add_question))
        .route(
            "/rounds/{id}/questions/{question_id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route(
            "/allocations",
            get(admin::list_allocations).delete(admin::delete_all_allocations),
        )
        .route("/allocations/reset", post(admin::reset_allocations))
        .route(
            "/allocations/{team}/{round_id}",
            delete(admin::delete_allocation),
        )
        .route("/activities", get(admin::list_activities))
        .route("/submissions", get(submissions::list_submissions))
        .route("/submissions/{team}", get(submissions::team_submissions))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/rounds", round_routes)
        .nest("/api/progress", progress_routes)
        .nest("/api/submissions", submission_routes)
        .nest("/api/admin", admin_routes)
        .route("/api/leaderboard", get(progress::leaderboard))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(GovernorLayer::new(governor_conf))
        .with_state(state)
}
