use axum::{
    debug_handler,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    config::Config,
    recurrence::Repeat,
    service::Database,
    session::{CurrentUser, EVENT_DRAFT},
    AppResult, AppState,
};

use super::{
    card::render_form,
    form::{EventFields, EventForm},
};

#[derive(Deserialize)]
pub(crate) struct SuggestQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
pub(crate) struct InviteForm {
    email: String,
}

#[derive(Deserialize)]
pub(crate) struct RepeatForm {
    repeat: Repeat,
}

/// The visitor's form in progress, loaded fresh on first use.
async fn draft(db: &Database, session: &Session, email: &str) -> AppResult<EventForm> {
    match session.get::<EventForm>(EVENT_DRAFT).await? {
        Some(form) if form.owner == email => return Ok(form),
        Some(_) => {
            session.remove::<EventForm>(EVENT_DRAFT).await?;
        }
        None => {}
    }

    let form = EventForm::load(db, email).await;
    // a failed load is retried on the next visit
    if form.error.is_none() {
        session.insert(EVENT_DRAFT, &form).await?;
    }
    Ok(form)
}

fn page(status: StatusCode, form: &EventForm) -> Response {
    (status, Html(render_form(form))).into_response()
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_event_page(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    session: Session,
) -> AppResult<Response> {
    let mut form = EventForm::load(&db, &email).await;
    if let Some(previous) = session.get::<EventForm>(EVENT_DRAFT).await? {
        form.carry_over(previous);
    }
    // a failed load is retried on the next visit
    if form.error.is_none() {
        session.insert(EVENT_DRAFT, &form).await?;
    }
    Ok(page(StatusCode::OK, &form))
}

#[debug_handler(state = AppState)]
pub(crate) async fn suggest(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    session: Session,
    Query(SuggestQuery { q }): Query<SuggestQuery>,
) -> AppResult<Response> {
    let mut form = draft(&db, &session, &email).await?;
    form.on_invite_input(&q);
    session.insert(EVENT_DRAFT, &form).await?;

    Ok(page(StatusCode::OK, &form))
}

#[debug_handler(state = AppState)]
pub(crate) async fn invite(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    session: Session,
    Form(InviteForm { email: invitee }): Form<InviteForm>,
) -> AppResult<Response> {
    let mut form = draft(&db, &session, &email).await?;
    let picked = form.select_suggestion(&invitee);
    if let Err(err) = &picked {
        form.error = Some(err.to_string());
    }
    session.insert(EVENT_DRAFT, &form).await?;

    match picked {
        Ok(()) => Ok(Redirect::to("/e/new").into_response()),
        // the page reloads contacts, so show the banner now
        Err(err) => Ok(page(err.status(), &form)),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn dismiss(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    session: Session,
) -> AppResult<Response> {
    let mut form = draft(&db, &session, &email).await?;
    form.dismiss_suggestions();
    session.insert(EVENT_DRAFT, &form).await?;

    Ok(Redirect::to("/e/new").into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn repeat(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    session: Session,
    Form(RepeatForm { repeat }): Form<RepeatForm>,
) -> AppResult<Response> {
    let mut form = draft(&db, &session, &email).await?;
    form.set_repeat(repeat);
    session.insert(EVENT_DRAFT, &form).await?;

    Ok(Redirect::to("/e/new").into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_event(
    State(db): State<Database>,
    State(config): State<Config>,
    CurrentUser { email }: CurrentUser,
    session: Session,
    Form(fields): Form<EventFields>,
) -> AppResult<Response> {
    let mut form = draft(&db, &session, &email).await?;

    if let Err(err) = form.submit(&email, fields, config.max_series_instances) {
        session.insert(EVENT_DRAFT, &form).await?;
        return Ok(page(err.status(), &form));
    }

    match form.flush(&db).await {
        Ok(ids) => {
            tracing::info!(%email, events = ids.len(), "created from form");
            session.remove::<EventForm>(EVENT_DRAFT).await?;
            Ok(Redirect::to("/e/mine").into_response())
        }
        Err(err) => {
            session.insert(EVENT_DRAFT, &form).await?;
            Ok(page(err.status(), &form))
        }
    }
}
