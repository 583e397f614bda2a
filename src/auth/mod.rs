mod login;
mod logout;
mod register;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/register", post(register::register))
        .route("/logout", get(logout::logout))
}
