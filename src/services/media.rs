use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Orientation class of a video, used as the storage key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectClass {
    /// Close to 16:9
    Landscape,
    /// Close to 9:16
    Portrait,
    /// Everything else
    Other,
}

impl AspectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

/// Tolerance window around the canonical ratios
const ASPECT_TOLERANCE: f64 = 0.1;

/// Classify pixel dimensions by aspect ratio. A zero height makes the
/// ratio non-finite, which lands in `Other`.
pub fn classify_aspect(width: i64, height: i64) -> AspectClass {
    let ratio = width as f64 / height as f64;
    if (ratio - 16.0 / 9.0).abs() < ASPECT_TOLERANCE {
        AspectClass::Landscape
    } else if (ratio - 9.0 / 16.0).abs() < ASPECT_TOLERANCE {
        AspectClass::Portrait
    } else {
        AspectClass::Other
    }
}

/// Geometry of the first stream reported by the prober
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub width: i64,
    pub height: i64,
}

#[derive(Error, Debug)]
pub enum MediaToolError {
    #[error("{tool} is not installed or not on PATH")]
    ToolUnavailable {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("ffprobe failed: {stderr}")]
    ProbeFailed { stderr: String },

    #[error("unreadable ffprobe output: {0}")]
    InvalidProbeOutput(#[from] serde_json::Error),

    #[error("media file has no streams")]
    NoStreamsFound,

    #[error("ffmpeg failed: {stderr}")]
    RemuxFailed { stderr: String },

    #[error("remuxed output could not be read")]
    OutputMissing(#[source] std::io::Error),

    #[error("remuxed output is empty")]
    OutputEmpty,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Trait for the external media tooling the upload pipeline shells out to
#[async_trait]
pub trait MediaToolRunner: Send + Sync {
    /// Read the geometry of a media file's first stream
    async fn probe(&self, path: &Path) -> Result<ProbeResult, MediaToolError>;

    /// Rewrite a file for progressive playback (moov atom up front) and
    /// return the path of the rewritten copy
    async fn remux_faststart(&self, path: &Path) -> Result<PathBuf, MediaToolError>;

    /// Check that the underlying tools are available
    async fn health_check(&self) -> bool;
}

/// Production runner shelling out to ffprobe/ffmpeg
pub struct FfmpegToolRunner;

#[async_trait]
impl MediaToolRunner for FfmpegToolRunner {
    async fn probe(&self, path: &Path) -> Result<ProbeResult, MediaToolError> {
        let output = Command::new("ffprobe")
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .arg(path)
            .output()
            .await
            .map_err(|e| spawn_error("ffprobe", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::error!("ffprobe failed on {:?}: {}", path, stderr);
            return Err(MediaToolError::ProbeFailed { stderr });
        }

        parse_probe_output(&output.stdout)
    }

    async fn remux_faststart(&self, path: &Path) -> Result<PathBuf, MediaToolError> {
        let out_path = processing_output_path(path);

        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(path)
            .arg("-c")
            .arg("copy")
            .arg("-movflags")
            .arg("faststart")
            .arg("-f")
            .arg("mp4")
            .arg(&out_path)
            .output()
            .await
            .map_err(|e| spawn_error("ffmpeg", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::error!("ffmpeg failed on {:?}: {}", path, stderr);
            // ffmpeg may have left a partial output behind
            let _ = tokio::fs::remove_file(&out_path).await;
            return Err(MediaToolError::RemuxFailed { stderr });
        }

        validate_remux_output(&out_path).await?;

        Ok(out_path)
    }

    async fn health_check(&self) -> bool {
        for tool in ["ffprobe", "ffmpeg"] {
            let available = Command::new(tool)
                .arg("-version")
                .output()
                .await
                .map(|out| out.status.success())
                .unwrap_or(false);
            if !available {
                return false;
            }
        }
        true
    }
}

fn spawn_error(tool: &'static str, e: std::io::Error) -> MediaToolError {
    if e.kind() == std::io::ErrorKind::NotFound {
        MediaToolError::ToolUnavailable { tool, source: e }
    } else {
        MediaToolError::Io(e)
    }
}

/// Sibling path the remuxed copy is written to
fn processing_output_path(path: &Path) -> PathBuf {
    let mut out: OsString = path.as_os_str().to_owned();
    out.push(".processing");
    PathBuf::from(out)
}

/// A remux that exits zero must still have produced a non-empty file.
/// An empty output is deleted here so failed runs leave nothing behind.
async fn validate_remux_output(path: &Path) -> Result<(), MediaToolError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(MediaToolError::OutputMissing)?;
    if meta.len() == 0 {
        let _ = tokio::fs::remove_file(path).await;
        return Err(MediaToolError::OutputEmpty);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

/// Streams without geometry (audio, data) decode as 0x0
#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    width: i64,
    #[serde(default)]
    height: i64,
}

fn parse_probe_output(stdout: &[u8]) -> Result<ProbeResult, MediaToolError> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;
    let stream = probe.streams.first().ok_or(MediaToolError::NoStreamsFound)?;

    Ok(ProbeResult {
        width: stream.width,
        height: stream.height,
    })
}
