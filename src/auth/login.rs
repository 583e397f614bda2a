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
    appresult::DataError,
    include_res,
    res::{escape_html, fill},
    service::Database,
    session::{safe_return_url, USER_EMAIL},
    AppResult, AppState,
};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    email: String,
    return_url: Option<String>,
}

pub(crate) fn login_html(status: StatusCode, return_url: Option<&str>, error: &str) -> Response {
    let page = fill(
        include_res!(str, "/pages/login.html"),
        &[
            ("return_url", escape_html(safe_return_url(return_url)).as_str()),
            ("error", escape_html(error).as_str()),
        ],
    );
    (status, Html(page)).into_response()
}

/// Starts a fresh session for `email`. Nothing from the previous visitor's
/// session survives.
pub(crate) async fn sign_in(session: &Session, email: &str, return_url: Option<&str>) -> AppResult<Response> {
    session.clear().await;
    session.cycle_id().await?;
    session.insert(USER_EMAIL, email).await?;
    tracing::info!(email, "signed in");
    Ok(Redirect::to(safe_return_url(return_url)).into_response())
}

#[debug_handler]
pub(crate) async fn login_page(Query(LoginQuery { return_url }): Query<LoginQuery>) -> impl IntoResponse {
    login_html(StatusCode::OK, return_url.as_deref(), "")
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db): State<Database>,
    session: Session,
    Form(LoginForm { email, return_url }): Form<LoginForm>,
) -> AppResult<Response> {
    let email = email.trim();

    match db.get_user_details(email).await {
        Ok(_) => sign_in(&session, email, return_url.as_deref()).await,
        Err(DataError::NotFound(_)) => Ok(login_html(
            StatusCode::UNAUTHORIZED,
            return_url.as_deref(),
            "No account uses that email",
        )),
        Err(err) => Err(err.into()),
    }
}
