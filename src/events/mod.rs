//! Event listing, joining and creation.

pub mod address;
pub mod board;
pub mod card;
pub mod form;
mod list;
mod new;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::board))
        .route("/mine", get(list::mine))
        .route("/{id}/join", post(list::join))
        .route("/new", get(new::new_event_page).post(new::create_event))
        .route("/new/suggest", get(new::suggest))
        .route("/new/invite", post(new::invite))
        .route("/new/dismiss", post(new::dismiss))
        .route("/new/repeat", post(new::repeat))
}
