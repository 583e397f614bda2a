use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    Form,
};
use chrono::Local;
use serde::Deserialize;

use crate::{
    appresult::DataError,
    service::Database,
    session::CurrentUser,
    AppResult, AppState,
};

use super::{
    board::{EventBoard, EventFilter},
    card::{render_board, render_mine},
};

#[derive(Deserialize)]
pub(crate) struct BoardQuery {
    filter: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct JoinForm {
    series_id: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn board(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    Query(BoardQuery { filter }): Query<BoardQuery>,
) -> AppResult<Response> {
    let board = EventBoard::load(&db, EventFilter::from_key(filter.as_deref())).await;
    let today = Local::now().date_naive();

    Ok(Html(render_board(&board, today, &email)).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn mine(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
) -> AppResult<Response> {
    let (events, error) = match db.get_event_by_email(&email).await {
        Ok(events) => (events, None),
        Err(DataError::NotFound(_)) => (Vec::new(), None),
        Err(err) => (Vec::new(), Some(err.to_string())),
    };

    Ok(Html(render_mine(&events, error.as_deref(), &email)).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn join(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    Path(id): Path<String>,
    Form(JoinForm { series_id }): Form<JoinForm>,
) -> AppResult<Response> {
    let mut board = EventBoard::default();
    let joined = board.join(&db, &email, &id, series_id.as_deref()).await;
    let today = Local::now().date_naive();

    // the board is already refetched and on the joined filter
    match joined {
        Ok(report) => {
            tracing::debug!(%email, %id, ?report, "joined from board");
            Ok(Html(render_board(&board, today, &email)).into_response())
        }
        Err(err) => Ok((err.status(), Html(render_board(&board, today, &email))).into_response()),
    }
}
