use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::session::SessionUser,
    error::AppError,
    predict::dto::SingleForm,
    state::AppState,
    table::Cell,
    upload::{
        handlers::extract_file,
        services::{read_table, save_upload},
    },
    views,
};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/single_prediction",
            get(single_prediction_form).post(single_prediction),
        )
        .route(
            "/bulk_prediction",
            get(bulk_prediction_form).post(bulk_prediction),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

async fn single_prediction_form(SessionUser(_): SessionUser) -> Html<String> {
    Html(views::single_prediction_page(None, None))
}

#[instrument(skip(state, form))]
async fn single_prediction(
    State(state): State<AppState>,
    SessionUser(email): SessionUser,
    Form(form): Form<SingleForm>,
) -> Result<Response, AppError> {
    let predicted = form
        .into_table()
        .and_then(|table| state.engine.predict_one(&table));

    match predicted {
        Ok(value) => {
            info!(email = %email, prediction = value, "single prediction served");
            Ok(Html(views::single_prediction_page(Some(value), None)).into_response())
        }
        Err(err @ (AppError::InputParse { .. } | AppError::FeatureSchema(_))) => Ok(Html(
            views::single_prediction_page(None, Some(&err.user_message())),
        )
        .into_response()),
        Err(err) => Err(err),
    }
}

async fn bulk_prediction_form(SessionUser(_): SessionUser) -> Html<String> {
    Html(views::bulk_prediction_page(None, None))
}

#[instrument(skip(state, multipart))]
async fn bulk_prediction(
    State(state): State<AppState>,
    SessionUser(email): SessionUser,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let predicted = async {
        let (filename, bytes) = extract_file(&mut multipart).await?;
        let path = save_upload(&state.config.upload_dir, &filename, bytes).await?;
        let table = read_table(&path)?;
        let predictions = state.engine.predict_table(&table)?;
        let augmented = table.with_column(
            "Prediction",
            predictions.into_iter().map(Cell::Float).collect(),
        );
        Ok::<_, AppError>(augmented)
    }
    .await;

    match predicted {
        Ok(table) => {
            info!(email = %email, rows = table.n_rows(), "bulk prediction served");
            Ok(Html(views::bulk_prediction_page(Some(&table), None)).into_response())
        }
        Err(
            err @ (AppError::NoFileSelected
            | AppError::DisallowedFileType
            | AppError::FeatureSchema(_)),
        ) => Ok(Html(views::bulk_prediction_page(None, Some(&err.user_message()))).into_response()),
        Err(err) => Err(err),
    }
}
