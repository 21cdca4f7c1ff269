//! HTTP routes and handlers

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use fashionlens_classifiers::StageResult;
use fashionlens_core::Category;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{status_for, AppError};
use crate::state::AppState;
use crate::templates;
use crate::upload::{secure_filename, store};

const NO_FILE_PART: &str = "No file part";
const NO_SELECTED_FILE: &str = "No selected file";
const TYPE_NOT_ALLOWED: &str = "File type not allowed";

pub async fn health() -> &'static str {
    "OK"
}

pub async fn index() -> Html<String> {
    Html(templates::index(None))
}

/// A file taken from the `file` multipart field
struct Upload {
    filename: String,
    data: Vec<u8>,
}

/// Read the `file` field, skipping any others
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Upload>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?.to_vec();
        return Ok(Some(Upload { filename, data }));
    }
    Ok(None)
}

fn rejected(message: &str) -> Response {
    warn!(reason = message, "Upload rejected");
    (StatusCode::BAD_REQUEST, Html(templates::index(Some(message)))).into_response()
}

/// Store an uploaded image and redirect to its results page
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_file_field(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return rejected(NO_FILE_PART),
        Err(err) => return rejected(&err.to_string()),
    };

    if upload.filename.is_empty() {
        return rejected(NO_SELECTED_FILE);
    }
    if !state.config.allows(&upload.filename) {
        return rejected(TYPE_NOT_ALLOWED);
    }
    let Some(name) = secure_filename(&upload.filename) else {
        return rejected(NO_SELECTED_FILE);
    };

    match store(&state.config.upload_dir, &name, &upload.data).await {
        Ok(_) => {
            info!(name = %name, bytes = upload.data.len(), "Upload stored");
            Redirect::to(&format!("/results/{}", name)).into_response()
        }
        Err(err) => {
            error!(name = %name, error = %err, "Failed to store upload");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(templates::results_error("The upload could not be saved.")),
            )
                .into_response()
        }
    }
}

/// Classify a stored upload and render the label next to the image
pub async fn results(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    // Only names produced by the upload handler can exist in the upload dir
    if secure_filename(&name).as_deref() != Some(name.as_str()) {
        return (
            StatusCode::NOT_FOUND,
            Html(templates::results_error("No such upload.")),
        )
            .into_response();
    }

    let path = state.upload_path(&name);
    let result = match state.classify_file(path).await {
        Ok(result) => result,
        Err(err) => {
            error!(name = %name, error = %err, "Classification task failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(templates::results_error("Classification failed.")),
            )
                .into_response();
        }
    };

    match result {
        Ok(result) => Html(templates::results(&name, &result.label())).into_response(),
        Err(err) if err.is_input_error() => {
            warn!(name = %name, error = %err, "Stored upload is not a usable image");
            (
                status_for(&err),
                Html(templates::results_error(&err.to_string())),
            )
                .into_response()
        }
        Err(err) => {
            error!(name = %name, error = %err, "Classification failed");
            (
                status_for(&err),
                Html(templates::results_error("Classification failed.")),
            )
                .into_response()
        }
    }
}

/// JSON body returned by the classification API
#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub category: Category,
    pub subtype: Option<String>,
    pub brand: String,
    pub label: String,
    pub stages: Vec<StageResult>,
    pub total_latency_us: u64,
}

/// Classify an uploaded image without storing it
pub async fn classify(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ClassifyResponse>, AppError> {
    let upload = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| AppError::InvalidRequest(NO_FILE_PART.to_string()))?;

    if upload.data.is_empty() {
        return Err(AppError::InvalidRequest(NO_SELECTED_FILE.to_string()));
    }
    if !upload.filename.is_empty() && !state.config.allows(&upload.filename) {
        return Err(AppError::InvalidRequest(TYPE_NOT_ALLOWED.to_string()));
    }

    let result = state.classify_bytes(upload.data).await??;
    let label = result.label();

    Ok(Json(ClassifyResponse {
        category: result.prediction.category,
        subtype: result.prediction.subtype,
        brand: result.prediction.brand,
        label,
        stages: result.stages,
        total_latency_us: result.total_latency_us,
    }))
}
