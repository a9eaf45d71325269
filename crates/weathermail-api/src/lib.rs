pub mod auth;
pub mod error;
pub mod middleware;
pub mod pages;
pub mod reports;
pub mod subscriptions;
pub mod validation;
pub mod weather;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// All HTTP routes. Subscription and report routes sit behind
/// [`middleware::require_auth`]; pages check the session themselves so they
/// can redirect instead of answering 401.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(pages::home))
        .route("/auth", get(pages::auth_page))
        .route("/login", post(pages::login_form))
        .route("/signup", post(pages::signup_form))
        .route("/logout", get(pages::logout))
        .route("/subscribe-form", post(pages::subscribe_form))
        .route("/unsubscribe-form", post(pages::unsubscribe_form))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/weather/history/{city}", get(weather::history))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/api/subscribe", post(subscriptions::subscribe))
        .route("/api/unsubscribe", post(subscriptions::unsubscribe))
        .route("/api/subscriptions", get(subscriptions::list))
        .route("/api/reports/run", post(reports::run_now))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    public_routes.merge(protected_routes).with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
