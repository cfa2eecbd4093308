use crate::api::error::AppError;
use crate::api::handlers::videos::{VideoResponse, find_owned_video};
use crate::entities::videos;
use crate::utils::auth::Claims;
use crate::utils::assets::new_asset_name;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use futures::TryStreamExt;
use sea_orm::{ActiveModelTrait, Set};
use tokio_util::io::StreamReader;

/// Thumbnail formats accepted for direct disk storage
const THUMBNAIL_TYPES: &[&str] = &["image/jpeg", "image/png"];

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

#[utoipa::path(
    post,
    path = "/api/videos/{id}/media",
    params(
        ("id" = String, Path, description = "Video id")
    ),
    request_body(content = Multipart, description = "MP4 video upload"),
    responses(
        (status = 200, description = "Video processed and published", body = VideoResponse),
        (status = 400, description = "Missing or unsupported video payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Video belongs to another user"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn upload_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    // Ownership is checked before any of the body is consumed
    let video = find_owned_video(&state.db, &id, &claims.sub).await?;
    let mut record = Some(video);
    let mut updated: Option<videos::Model> = None;

    // Use a result to capture errors so we can consume the multipart stream if needed
    let result: Result<Json<VideoResponse>, AppError> = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "video"
                && let Some(video) = record.take()
            {
                let media_type = field
                    .content_type()
                    .ok_or_else(|| {
                        AppError::BadRequest("Missing Content-Type for video file".to_string())
                    })?
                    .to_string();

                let body_with_io_error = field.map_err(std::io::Error::other);
                let reader = StreamReader::new(body_with_io_error);

                updated = Some(
                    state
                        .upload_service
                        .process_video(video, &media_type, reader)
                        .await?,
                );
            }
        }

        let updated = updated.ok_or(AppError::BadRequest("No video file provided".to_string()))?;

        Ok(Json(updated.into()))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Consume the remaining multipart stream to avoid a TCP reset on the client
            tracing::warn!("Video upload failed early: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/videos/{id}/thumbnail",
    params(
        ("id" = String, Path, description = "Video id")
    ),
    request_body(content = Multipart, description = "JPEG or PNG thumbnail upload"),
    responses(
        (status = 200, description = "Thumbnail stored", body = VideoResponse),
        (status = 400, description = "Missing or unsupported thumbnail payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Video belongs to another user"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn upload_thumbnail(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    let video = find_owned_video(&state.db, &id, &claims.sub).await?;
    let mut record = Some(video);
    let mut updated: Option<videos::Model> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "thumbnail"
            && let Some(video) = record.take()
        {
            let media_type = field
                .content_type()
                .ok_or_else(|| {
                    AppError::BadRequest("Missing Content-Type for thumbnail".to_string())
                })?
                .to_string();
            let mime: mime::Mime = media_type.parse().map_err(|_| {
                AppError::BadRequest(format!("Unsupported media type: {}", media_type))
            })?;
            if !THUMBNAIL_TYPES.contains(&mime.essence_str()) {
                return Err(AppError::BadRequest(format!(
                    "Unsupported media type: {}",
                    mime.essence_str()
                )));
            }

            let data = field.bytes().await.map_err(multipart_error)?;
            if data.len() > state.config.max_thumbnail_size {
                return Err(AppError::PayloadTooLarge(
                    "Thumbnail exceeds the maximum allowed size".to_string(),
                ));
            }

            let file_name = new_asset_name(mime.essence_str());
            let path = std::path::Path::new(&state.config.assets_root).join(&file_name);
            tokio::fs::write(&path, &data)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to store thumbnail: {}", e)))?;

            let thumbnail_url = format!("{}/assets/{}", state.config.public_base_url, file_name);

            let mut active: videos::ActiveModel = video.into();
            active.thumbnail_url = Set(Some(thumbnail_url));
            active.updated_at = Set(Some(chrono::Utc::now()));
            updated = Some(active.update(&state.db).await?);
        }
    }

    let updated =
        updated.ok_or(AppError::BadRequest("No thumbnail found in request".to_string()))?;

    Ok(Json(updated.into()))
}
