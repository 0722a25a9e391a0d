use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use bytes::Bytes;
use tracing::{info, instrument};

use crate::{
    auth::session::{flash_cookie, SessionUser},
    error::AppError,
    state::AppState,
    upload::services::{read_table, save_upload},
    views,
};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", get(upload_form).post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

async fn upload_form(SessionUser(_): SessionUser) -> Html<String> {
    Html(views::upload_page(None))
}

/// Pull the `file` field out of a multipart body. Distinguishes "no file
/// part at all" from "part present but no filename", both of which reject
/// before anything touches disk.
pub(crate) async fn extract_file(multipart: &mut Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("multipart read: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(AppError::NoFileSelected);
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("multipart body: {e}")))?;
        return Ok((filename, bytes));
    }
    Err(AppError::NoFileSelected)
}

#[instrument(skip(state, jar, multipart))]
async fn upload(
    State(state): State<AppState>,
    SessionUser(email): SessionUser,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let saved = async {
        let (filename, bytes) = extract_file(&mut multipart).await?;
        let path = save_upload(&state.config.upload_dir, &filename, bytes).await?;
        let table = read_table(&path)?;
        Ok::<_, AppError>((path, table))
    }
    .await;

    match saved {
        Ok((path, table)) => {
            info!(
                email = %email,
                path = %path.display(),
                rows = table.n_rows(),
                "file uploaded and parsed"
            );
            let jar = jar.add(flash_cookie(&format!(
                "File successfully uploaded and processed ({} rows)",
                table.n_rows()
            )));
            Ok((jar, Redirect::to("/dashboard")).into_response())
        }
        // user-correctable conditions re-render the form
        Err(
            err @ (AppError::NoFileSelected
            | AppError::DisallowedFileType
            | AppError::FeatureSchema(_)),
        ) => Ok(Html(views::upload_page(Some(&err.user_message()))).into_response()),
        Err(err) => Err(err),
    }
}
