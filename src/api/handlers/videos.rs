use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct VideoResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<videos::Model> for VideoResponse {
    fn from(v: videos::Model) -> Self {
        Self {
            id: v.id,
            user_id: v.user_id,
            title: v.title,
            description: v.description,
            thumbnail_url: v.thumbnail_url,
            video_url: v.video_url,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

/// Fetch a video record and verify the caller owns it
pub(crate) async fn find_owned_video(
    db: &DatabaseConnection,
    video_id: &str,
    user_id: &str,
) -> Result<videos::Model, AppError> {
    let video = Videos::find_by_id(video_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    if video.user_id != user_id {
        return Err(AppError::Forbidden(
            "You do not own this video".to_string(),
        ));
    }

    Ok(video)
}

#[utoipa::path(
    post,
    path = "/api/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Video record created", body = VideoResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn create_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoResponse>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let now = chrono::Utc::now();
    let video = videos::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(claims.sub),
        title: Set(payload.title),
        description: Set(payload.description),
        thumbnail_url: Set(None),
        video_url: Set(None),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
    };

    let video = video.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(video.into())))
}

#[utoipa::path(
    get,
    path = "/api/videos",
    responses(
        (status = 200, description = "Videos owned by the caller", body = [VideoResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn list_videos(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let videos = Videos::find()
        .filter(videos::Column::UserId.eq(&claims.sub))
        .order_by_desc(videos::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(videos.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    params(
        ("id" = String, Path, description = "Video id")
    ),
    responses(
        (status = 200, description = "Video record", body = VideoResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Video belongs to another user"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn get_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<VideoResponse>, AppError> {
    let video = find_owned_video(&state.db, &id, &claims.sub).await?;
    Ok(Json(video.into()))
}

#[utoipa::path(
    delete,
    path = "/api/videos/{id}",
    params(
        ("id" = String, Path, description = "Video id")
    ),
    responses(
        (status = 204, description = "Video record deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Video belongs to another user"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn delete_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let video = find_owned_video(&state.db, &id, &claims.sub).await?;
    video.delete(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}
