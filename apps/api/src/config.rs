use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if the model credential is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Directory where uploaded resumes are stored.
    pub upload_dir: PathBuf,
    /// Directory where rasterized page images are written.
    pub image_dir: PathBuf,
    /// Fixed path overwritten with the most recent parsed model response.
    pub result_path: PathBuf,
    /// Rasterization resolution in dots per inch.
    pub render_dpi: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            upload_dir: env_path("UPLOAD_DIR", "uploads"),
            image_dir: env_path("IMAGE_DIR", "pdf_images"),
            result_path: env_path("RESULT_PATH", "result.json"),
            render_dpi: std::env::var("RENDER_DPI")
                .unwrap_or_else(|_| crate::rasterizer::DEFAULT_DPI.to_string())
                .parse::<u32>()
                .context("RENDER_DPI must be a positive integer")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .into()
}
