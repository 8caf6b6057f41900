//! Upload, one-off classification and free-text analysis endpoints.

use super::error::ApiError;
use crate::classifier::ImageInput;
use crate::pipeline::{StoredPhoto, UploadPipeline, UploadRequest, UploadedImage};
use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, FromRequest, Multipart, Request, State},
    http::header,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

const IMAGE_FIELDS: [&str; 2] = ["images", "image"];

#[derive(Serialize)]
pub(super) struct UploadResponse {
    status: &'static str,
    album_id: String,
    photos: Vec<StoredPhoto>,
}

#[derive(Serialize)]
pub(super) struct ClassifyResponse {
    status: &'static str,
    category: String,
}

#[derive(Deserialize)]
struct ClassifyBody {
    /// Base64 image, optionally as a `data:` URL.
    image: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct AnalyzeBody {
    text: Option<String>,
}

#[derive(Serialize)]
pub(super) struct AnalyzeResponse {
    status: &'static str,
    response: String,
}

pub(super) async fn upload(
    State(pipeline): State<UploadPipeline>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;

    let mut album_id = String::new();
    let mut title = None;
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "id" => album_id = field.text().await?,
            "title" => title = Some(field.text().await?),
            name if IMAGE_FIELDS.contains(&name) => {
                let file_name = field.file_name().map(String::from);
                let bytes = field.bytes().await?;
                images.push(UploadedImage {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            other => debug!("Ignoring unexpected multipart field '{}'", other),
        }
    }

    let album_id = album_id.trim().to_string();
    let photos = pipeline
        .process(UploadRequest {
            album_id: album_id.clone(),
            title,
            images,
        })
        .await?;

    Ok(Json(UploadResponse {
        status: "success",
        album_id,
        photos,
    }))
}

/// Accepts either a multipart `image` file or a JSON body with a base64 `image`.
pub(super) async fn classify(
    State(pipeline): State<UploadPipeline>,
    request: Request,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let bytes = if is_multipart {
        let mut multipart = Multipart::from_request(request, &()).await?;
        let mut image = None;
        while let Some(field) = multipart.next_field().await? {
            if field.name().is_some_and(|n| IMAGE_FIELDS.contains(&n)) {
                image = Some(field.bytes().await?.to_vec());
                break;
            }
        }
        image
    } else {
        let Json(body) = Json::<ClassifyBody>::from_request(request, &()).await?;
        body.image.map(|data| decode_base64_image(&data)).transpose()?
    };

    let bytes = bytes
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No image provided".to_string()))?;

    let classification = pipeline
        .classify_only(&ImageInput::from_bytes(bytes))
        .await?;

    Ok(Json(ClassifyResponse {
        status: "success",
        category: classification.category,
    }))
}

pub(super) async fn analyze(
    State(pipeline): State<UploadPipeline>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(body) = body?;
    let text = body
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No text provided".to_string()))?;

    let response = pipeline.classifier().analyze_text(&text).await?;

    Ok(Json(AnalyzeResponse {
        status: "success",
        response,
    }))
}

fn decode_base64_image(data: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => data,
    };
    BASE64
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 image: {}", e)))
}
