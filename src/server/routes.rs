//! Request handlers.

use super::error::{ApiError, BodyFormat};
use super::AppState;
use crate::output::{PipelineOutput, UploadedAsset};
use crate::pipeline::ingest::validate_filename;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::path::Path as FsPath;
use tracing::warn;

const UPLOAD_FORM: &str = r#"<!doctype html>
<title>Upload Image</title>
<h1>Upload Image</h1>
<form action="/" method="post" enctype="multipart/form-data">
    <input type="file" name="file" required>
    <input type="submit" value="Upload">
</form>
"#;

pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(upload_form).post(upload_from_form))
        .route("/upload", post(upload_api))
        .route("/download/image/{name}", get(download_image))
        .route("/download/pdf/{name}", get(download_pdf))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

// ── Upload ───────────────────────────────────────────────────────────────

async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

async fn upload_from_form(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, ApiError> {
    let output = run_upload(&state, multipart, BodyFormat::Text).await?;
    let image = escape_html(&output.image_name());
    let pdf = escape_html(&output.pdf_name());
    Ok(Html(format!(
        "<h2>Upload Successful!</h2>\n\
         <p>Download your files:</p>\n\
         <a href='/download/image/{image}' target='_blank'>Download Processed Image</a><br>\n\
         <a href='/download/pdf/{pdf}' target='_blank'>Download PDF</a><br>\n\
         <a href='/'>Upload another file</a>\n"
    )))
}

async fn upload_api(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let output = run_upload(&state, multipart, BodyFormat::Json).await?;
    Ok(Json(json!({
        "message": "File processed successfully",
        "download_image": format!("/download/image/{}", output.image_name()),
        "download_pdf": format!("/download/pdf/{}", output.pdf_name()),
    })))
}

async fn run_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
    format: BodyFormat,
) -> Result<PipelineOutput, ApiError> {
    // A body that is not multipart at all carries no file field either.
    let upload = match multipart {
        Ok(multipart) => read_file_field(multipart, format).await?,
        Err(rejection) => {
            warn!("Upload without a multipart body: {rejection}");
            None
        }
    };
    state
        .pipeline
        .process_async(upload)
        .await
        .map_err(|e| ApiError::from_pipeline(&e, format))
}

/// First `file` field of the form, if any.
async fn read_file_field(
    mut multipart: Multipart,
    format: BodyFormat,
) -> Result<Option<UploadedAsset>, ApiError> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        warn!("Malformed multipart body: {e}");
        ApiError::new(e.status(), e.body_text(), format)
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(malformed)?;
        return Ok(Some(UploadedAsset::new(filename, bytes.to_vec())));
    }
    Ok(None)
}

// ── Download ─────────────────────────────────────────────────────────────

async fn download_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    serve_artifact(&state.pipeline.config().processed_dir, &name).await
}

async fn download_pdf(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    serve_artifact(&state.pipeline.config().pdf_dir, &name).await
}

async fn serve_artifact(dir: &FsPath, name: &str) -> Result<Response, ApiError> {
    if validate_filename(name).is_err() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Invalid file name",
            BodyFormat::Text,
        ));
    }

    let path = dir.join(name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::new(StatusCode::NOT_FOUND, "Not Found", BodyFormat::Text));
        }
        Err(e) => {
            warn!("Failed to read {}: {e}", path.display());
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                BodyFormat::Text,
            ));
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.essence_str().to_string())], bytes).into_response())
}

// ── Health ───────────────────────────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "stamp2pdf"
    }))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
