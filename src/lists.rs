//! JSON endpoints for the signed-in user's contact lists.

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    appresult::{DataError, DataResult},
    db::ContactList,
    service::Database,
    session::CurrentUser,
    AppResult, AppState,
};

#[derive(Serialize)]
struct ListView {
    id: String,
    #[serde(flatten)]
    list: ContactList,
}

#[derive(Deserialize)]
pub(crate) struct NewList {
    #[serde(default)]
    name: String,
    #[serde(default)]
    contacts: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(lists).post(add_list))
        .route("/{id}", get(list).put(update_list).delete(delete_list))
}

/// Lists owned by someone else are reported as missing.
async fn owned(db: &Database, id: &str, email: &str) -> DataResult<ContactList> {
    let list = db.get_list_by_id(id).await?;
    if list.owner != email {
        return Err(DataError::NotFound(format!("contact list {id}")));
    }
    Ok(list)
}

#[debug_handler(state = AppState)]
async fn lists(State(db): State<Database>, CurrentUser { email }: CurrentUser) -> AppResult<Response> {
    let lists = match db.get_user_contact_lists(&email).await {
        Ok(lists) => lists,
        Err(DataError::NotFound(_)) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let views: Vec<ListView> = lists.into_iter().map(|(id, list)| ListView { id, list }).collect();
    Ok(Json(views).into_response())
}

#[debug_handler(state = AppState)]
async fn add_list(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    Json(NewList { name, contacts }): Json<NewList>,
) -> AppResult<Response> {
    let list = ContactList { owner: email, name, contacts };
    let id = db.add_list(&list).await?;
    Ok((StatusCode::CREATED, Json(ListView { id, list })).into_response())
}

#[debug_handler(state = AppState)]
async fn list(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let list = owned(&db, &id, &email).await?;
    Ok(Json(ListView { id, list }).into_response())
}

#[debug_handler(state = AppState)]
async fn update_list(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    Path(id): Path<String>,
    Json(mut fields): Json<Map<String, Value>>,
) -> AppResult<Response> {
    owned(&db, &id, &email).await?;
    // ownership can't be handed over
    fields.remove("owner");
    db.update_list(&id, fields).await?;

    let list = db.get_list_by_id(&id).await?;
    Ok(Json(ListView { id, list }).into_response())
}

#[debug_handler(state = AppState)]
async fn delete_list(
    State(db): State<Database>,
    CurrentUser { email }: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    owned(&db, &id, &email).await?;
    db.delete_list(&id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
