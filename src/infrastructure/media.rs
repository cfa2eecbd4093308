use crate::services::media::{FfmpegToolRunner, MediaToolRunner};
use std::sync::Arc;
use tracing::info;

pub async fn setup_media_tools() -> Arc<dyn MediaToolRunner> {
    let tools = Arc::new(FfmpegToolRunner);

    if tools.health_check().await {
        info!("🎬 ffmpeg/ffprobe found on PATH");
    } else {
        tracing::warn!("⚠️  ffmpeg/ffprobe not found! Video uploads will fail until installed.");
    }

    tools
}
