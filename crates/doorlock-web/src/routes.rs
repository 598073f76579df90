use crate::error::WebError;
use crate::{views, AppState};
use axum::extract::{Multipart, Path, State};
use axum::response::{Html, Redirect};
use doorlock_core::{enroll, store};
use std::sync::Arc;

pub async fn index() -> Html<String> {
    Html(views::register_form())
}

/// `POST /register` — multipart `name` + `image`.
pub async fn register(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Redirect, WebError> {
    let mut name: Option<String> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("name") => name = Some(field.text().await?),
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                upload = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (Some(name), Some((file_name, bytes))) = (name, upload) else {
        return Err(WebError::BadRequest("name and image are required".into()));
    };

    let dir = state.known_faces_dir.clone();
    let user = state
        .db
        .call(move |conn| Ok(enroll::register(conn, &dir, &name, &file_name, &bytes)))
        .await??;

    tracing::info!(id = user.id, file = %user.image_path, "registered via web");
    Ok(Redirect::to("/"))
}

pub async fn logs(State(state): State<Arc<AppState>>) -> Result<Html<String>, WebError> {
    let entries = state.db.call(|conn| Ok(store::list_logs(conn)?)).await?;
    Ok(Html(views::logs(&entries)))
}

pub async fn users(State(state): State<Arc<AppState>>) -> Result<Html<String>, WebError> {
    let users = state.db.call(|conn| Ok(store::list_users(conn)?)).await?;
    Ok(Html(views::users(&users)))
}

/// `POST /delete_user/{id}` — unknown ids are a no-op.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Redirect, WebError> {
    let dir = state.known_faces_dir.clone();
    state
        .db
        .call(move |conn| Ok(enroll::remove(conn, &dir, id)))
        .await??;
    Ok(Redirect::to("/users"))
}
