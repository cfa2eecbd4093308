use crate::config::AppConfig;
use crate::entities::videos;
use crate::services::media::{MediaToolError, MediaToolRunner, classify_aspect};
use crate::services::storage::StorageService;
use crate::utils::assets::new_asset_name;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::AsyncRead;

/// The only container/codec combination the pipeline accepts
const VIDEO_MP4: &str = "video/mp4";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("could not stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error(transparent)]
    Media(#[from] MediaToolError),

    #[error("could not publish video: {0}")]
    Publish(#[source] anyhow::Error),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

/// Runs the upload pipeline: stage, probe, classify, remux, publish,
/// record. Local working copies never outlive the call.
pub struct VideoUploadService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    tools: Arc<dyn MediaToolRunner>,
    config: AppConfig,
}

impl VideoUploadService {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        tools: Arc<dyn MediaToolRunner>,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            storage,
            tools,
            config,
        }
    }

    /// Process a video body for an already-authorized record and return the
    /// updated record. The staged copy and the remuxed copy are deleted on
    /// every exit path, success or failure.
    pub async fn process_video<R>(
        &self,
        video: videos::Model,
        media_type: &str,
        mut body: R,
    ) -> Result<videos::Model, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        // 1. Validate the declared media type, ignoring parameters
        let mime: mime::Mime = media_type
            .parse()
            .map_err(|_| UploadError::UnsupportedMediaType(media_type.to_string()))?;
        if mime.essence_str() != VIDEO_MP4 {
            return Err(UploadError::UnsupportedMediaType(
                mime.essence_str().to_string(),
            ));
        }

        // 2. Stage the body on local disk so the media tools can seek it
        let staged = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".mp4")
            .tempfile_in(&self.config.assets_root)
            .map_err(UploadError::Staging)?;
        let (file, staged_path) = staged.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let written = tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(UploadError::Staging)?;
        file.sync_all().await.map_err(UploadError::Staging)?;
        drop(file);

        tracing::info!("Staged {} bytes for video {}", written, video.id);

        // 3. Classify orientation from the first stream's geometry
        let probe = self.tools.probe(&staged_path).await?;
        let class = classify_aspect(probe.width, probe.height);

        // 4. Remux for progressive playback
        let processed = self.tools.remux_faststart(&staged_path).await?;
        let processed = TempPath::from_path(processed);

        // 5. Publish under a fresh unguessable key
        let key = format!("{}/{}", class.as_str(), new_asset_name(mime.essence_str()));
        self.storage
            .put_object_from_path(&key, &processed, mime.essence_str())
            .await
            .map_err(UploadError::Publish)?;

        let url = format!("{}/{}", self.config.cdn_base_url, key);
        tracing::info!(
            "Published video {} as {} ({}x{}, {})",
            video.id,
            key,
            probe.width,
            probe.height,
            class.as_str()
        );

        // 6. Record the published location
        let mut active: videos::ActiveModel = video.into();
        active.video_url = Set(Some(url));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&self.db).await?;

        Ok(updated)
    }
}
