pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod events;
pub mod index;
pub mod lists;
pub mod recurrence;
pub mod res;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

use axum::{extract::FromRef, routing::get, Router};
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};
use config::Config;
use service::Database;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(state.config.session_minutes)));

    Router::new()
        .route("/", get(index::index))
        .merge(auth::router())
        .nest("/e", events::router())
        .nest("/lists", lists::router())
        .fallback(index::not_found)
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}
