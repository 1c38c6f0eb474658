//! Writes the gallery-dl configuration the extractor reads at startup.

use crate::error::ConfigError;
use serde::Serialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_DIR: &str = "~/.config/gallery-dl";

#[derive(Debug, Serialize)]
struct GalleryDlConfig<'a> {
    extractor: Extractors<'a>,
}

#[derive(Debug, Serialize)]
struct Extractors<'a> {
    twitter: TwitterExtractor<'a>,
}

#[derive(Debug, Serialize)]
struct TwitterExtractor<'a> {
    cookies: TwitterCookies<'a>,
}

#[derive(Debug, Serialize)]
struct TwitterCookies<'a> {
    auth_token: &'a str,
}

/// Default location, `~/.config/gallery-dl/config.json`.
pub fn default_config_path() -> PathBuf {
    Path::new(shellexpand::tilde(DEFAULT_CONFIG_DIR).as_ref()).join("config.json")
}

/// Write the config carrying the Twitter `auth_token` cookie to `path`,
/// creating parent directories as needed.
pub fn write_config(path: &Path, auth_token: &str) -> Result<(), ConfigError> {
    let config = GalleryDlConfig {
        extractor: Extractors {
            twitter: TwitterExtractor {
                cookies: TwitterCookies { auth_token },
            },
        },
    };
    let body = serde_json::to_string_pretty(&config)?;

    let io_error = |source: std::io::Error| ConfigError::ExtractorConfig {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, body).map_err(io_error)?;

    tracing::info!("Wrote gallery-dl config to {}", path.display());
    Ok(())
}
