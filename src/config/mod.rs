use std::env;

/// Runtime configuration for the video backend
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum video upload size in bytes (default: 1 GB)
    pub max_video_size: usize,

    /// Maximum thumbnail upload size in bytes (default: 10 MB)
    pub max_thumbnail_size: usize,

    /// Local directory for staged uploads and thumbnail files (default: "./assets")
    pub assets_root: String,

    /// Base URL prepended to object keys when building published video URLs
    pub cdn_base_url: String,

    /// Base URL of this server, used for locally served thumbnail URLs
    pub public_base_url: String,

    /// JWT Secret Key (Required)
    pub jwt_secret: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_video_size: 1 << 30,      // 1 GB
            max_thumbnail_size: 10 << 20, // 10 MB
            assets_root: "./assets".to_string(),
            cdn_base_url: "http://localhost:9000/uploads".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            jwt_secret: "secret".to_string(),
            // More secure default: localhost only instead of wildcard
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_video_size: env::var("MAX_VIDEO_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_video_size),

            max_thumbnail_size: env::var("MAX_THUMBNAIL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_thumbnail_size),

            assets_root: env::var("ASSETS_ROOT").unwrap_or(default.assets_root),

            cdn_base_url: env::var("CDN_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.cdn_base_url),

            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.public_base_url),

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()), // Fallback for dev convenience, strictly enforced in production method

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (relaxed limits, local endpoints)
    pub fn development() -> Self {
        Self {
            max_video_size: 1 << 30,
            max_thumbnail_size: 10 << 20,
            assets_root: "./assets".to_string(),
            cdn_base_url: "http://localhost:9000/uploads".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            jwt_secret: "secret".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }

    /// Create config for production (strict security)
    pub fn production() -> Self {
        let default = Self::default();
        Self {
            max_video_size: env::var("MAX_VIDEO_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_video_size),
            max_thumbnail_size: env::var("MAX_THUMBNAIL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_thumbnail_size),
            assets_root: env::var("ASSETS_ROOT").unwrap_or(default.assets_root),
            cdn_base_url: env::var("CDN_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .expect("CRITICAL: CDN_BASE_URL must be set"),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .expect("CRITICAL: PUBLIC_BASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("CRITICAL: JWT_SECRET must be set"),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }
}
