use axum::{debug_handler, extract::State, response::Response, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{appresult::DataError, db::User, service::Database, AppResult, AppState};

use super::login::{login_html, sign_in};

#[derive(Deserialize)]
pub(crate) struct RegisterForm {
    username: String,
    email: String,
    phone: String,
    #[serde(default)]
    photo: String,
    return_url: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db): State<Database>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let photo = form.photo.trim();
    let user = User {
        username: form.username.trim().to_owned(),
        email: form.email.trim().to_owned(),
        phone: form.phone.trim().to_owned(),
        photo: (!photo.is_empty()).then(|| photo.to_owned()),
    };

    match db.register_user(&user).await {
        Ok(()) => sign_in(&session, &user.email, form.return_url.as_deref()).await,
        Err(err @ (DataError::Conflict(_) | DataError::Invalid(_))) => {
            Ok(login_html(err.status(), form.return_url.as_deref(), &err.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}
