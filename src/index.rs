use axum::{debug_handler, response::{Redirect, Response}};
use tower_sessions::Session;

use crate::{res, session::USER_EMAIL, AppResult};

#[debug_handler]
pub async fn index(session: Session) -> AppResult<Redirect> {
    if session.get::<String>(USER_EMAIL).await?.is_some() {
        Ok(Redirect::to("/e"))
    } else {
        Ok(Redirect::to("/login"))
    }
}

#[debug_handler]
pub async fn not_found() -> AppResult<Response> {
    res::sorry("page")
}
