use super::cmd::{stderr_tail, RemuxRunner};
use crate::domain::media::{MediaFile, Segment};
use crate::error::{Result, TransferError};
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Cuts a file that exceeds a size ceiling into time-bounded segments.
pub struct SizeChunker<'a, R: ?Sized> {
    runner: &'a R,
}

impl<'a, R: RemuxRunner + ?Sized> SizeChunker<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Split `file` into segments of roughly `ceiling` bytes.
    ///
    /// A file already within the ceiling comes back unchanged as the only
    /// segment. The cut is duration based, so individual segments may still
    /// land slightly above the ceiling.
    pub async fn split(&self, file: &MediaFile, ceiling: u64) -> Result<Vec<Segment>> {
        let size = file.size().await?;
        if size <= ceiling {
            return Ok(vec![Segment::new(file.clone(), 0)]);
        }

        let duration = self.probe_duration(file.path()).await?;
        let segment_count = size.div_ceil(ceiling);
        let segment_duration = duration / segment_count as f64;

        let (dir, stem) = split_location(file.path());
        let pattern = dir.join(format!("{}_%03d.mp4", stem));

        tracing::info!(
            "Splitting {} ({} bytes, {:.2}s) into {} segments of {:.2}s",
            file.path().display(),
            size,
            duration,
            segment_count,
            segment_duration
        );

        let output = self
            .runner
            .split_segments(file.path(), segment_duration, &pattern)
            .await
            .map_err(|e| TransferError::Split {
                path: file.path().to_path_buf(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let message = stderr_tail(&output);
            tracing::error!("ffmpeg segment failed for {}: {}", file.path().display(), message);
            return Err(TransferError::Split {
                path: file.path().to_path_buf(),
                message,
            });
        }

        let segments = collect_segments(&dir, &stem).await?;
        if segments.is_empty() {
            return Err(TransferError::Split {
                path: file.path().to_path_buf(),
                message: "no segments were produced".to_string(),
            });
        }

        tracing::debug!("Produced {} segments", segments.len());
        Ok(segments)
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let probe_error = |message: String| TransferError::Probe {
            path: path.to_path_buf(),
            message,
        };

        let output = self
            .runner
            .probe_duration(path)
            .await
            .map_err(|e| probe_error(e.to_string()))?;

        if !output.status.success() {
            return Err(probe_error(stderr_tail(&output)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let raw = stdout.trim();
        match raw.parse::<f64>() {
            Ok(duration) if duration.is_finite() && duration > 0.0 => Ok(duration),
            _ => Err(probe_error(format!("unusable duration {:?}", raw))),
        }
    }
}

fn split_location(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("video"));
    (dir, stem)
}

/// Segments written next to the source, ordered by their zero-padded suffix.
async fn collect_segments(dir: &Path, stem: &str) -> Result<Vec<Segment>> {
    let re = Regex::new(&format!(r"^{}_(\d{{3,}})\.mp4$", regex::escape(stem)))
        .map_err(|e| TransferError::Split {
            path: dir.join(stem),
            message: e.to_string(),
        })?;

    let mut names = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if re.is_match(&name) {
            names.push(name);
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(index, name)| Segment::new(MediaFile::new(dir.join(name)), index))
        .collect())
}
