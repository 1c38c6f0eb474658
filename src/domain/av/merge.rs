use super::cmd::{stderr_tail, RemuxRunner};
use crate::domain::media::{MediaFile, Segment};
use crate::error::{Result, TransferError};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Joins consecutive segments back into one file without re-encoding.
pub struct ChunkMerger<'a, R: ?Sized> {
    runner: &'a R,
}

impl<'a, R: RemuxRunner + ?Sized> ChunkMerger<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Concatenate `segments`, in the given order, into `destination`.
    ///
    /// A single segment is returned as is and no remux runs.
    pub async fn merge(&self, segments: &[Segment], destination: &Path) -> Result<MediaFile> {
        let merge_error = |message: String| TransferError::Merge {
            destination: destination.to_path_buf(),
            message,
        };

        match segments {
            [] => return Err(merge_error("no segments to merge".to_string())),
            [only] => return Ok(only.file.clone()),
            _ => {}
        }

        let manifest_path = manifest_path(destination);
        fs::write(&manifest_path, concat_manifest(segments)).await?;

        tracing::info!(
            "Merging {} segments into {}",
            segments.len(),
            destination.display()
        );
        let result = self.runner.concat(&manifest_path, destination).await;

        if let Err(e) = fs::remove_file(&manifest_path).await {
            tracing::warn!("Could not remove {}: {}", manifest_path.display(), e);
        }

        let output = result.map_err(|e| merge_error(e.to_string()))?;
        if !output.status.success() {
            let message = stderr_tail(&output);
            tracing::error!("ffmpeg concat failed for {}: {}", destination.display(), message);
            return Err(merge_error(message));
        }

        Ok(MediaFile::new(destination))
    }
}

fn manifest_path(destination: &Path) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("merged"));
    destination.with_file_name(format!("{}.concat.txt", stem))
}

/// ffmpeg concat demuxer list, one `file '<path>'` line per segment.
fn concat_manifest(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| {
            let path = segment.path().to_string_lossy();
            format!("file '{}'\n", path.replace('\'', r"'\''"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::av::cmd::test_support::mock_output;
    use crate::domain::av::cmd::MockRemuxRunner;

    fn segments_in(dir: &Path, count: usize) -> Vec<Segment> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("video_{:03}.mp4", i));
                std::fs::write(&path, b"seg").unwrap();
                Segment::new(MediaFile::new(path), i)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_single_segment_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let segments = segments_in(dir.path(), 1);
        let destination = dir.path().join("merged_0.mp4");

        let mut runner = MockRemuxRunner::new();
        runner.expect_concat().times(0);

        let merged = ChunkMerger::new(&runner)
            .merge(&segments, &destination)
            .await
            .unwrap();

        assert_eq!(merged, segments[0].file);
        assert!(!destination.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_manifest_lists_segments_in_order_and_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let segments = segments_in(dir.path(), 3);
        let destination = dir.path().join("merged_0.mp4");
        let expected: String = segments
            .iter()
            .map(|s| format!("file '{}'\n", s.path().display()))
            .collect();

        let mut runner = MockRemuxRunner::new();
        runner
            .expect_concat()
            .times(1)
            .returning(move |manifest, output| {
                assert_eq!(std::fs::read_to_string(manifest).unwrap(), expected);
                std::fs::write(output, b"merged").unwrap();
                mock_output("", "", true)
            });

        let merged = ChunkMerger::new(&runner)
            .merge(&segments, &destination)
            .await
            .unwrap();

        assert_eq!(merged.path(), destination);
        assert!(!dir.path().join("merged_0.concat.txt").exists());
    }

    #[tokio::test]
    async fn test_failed_concat_is_merge_error() {
        let dir = tempfile::tempdir().unwrap();
        let segments = segments_in(dir.path(), 2);
        let destination = dir.path().join("merged_0.mp4");

        let mut runner = MockRemuxRunner::new();
        runner
            .expect_concat()
            .returning(|_, _| mock_output("", "Impossible to open", false));

        let result = ChunkMerger::new(&runner).merge(&segments, &destination).await;
        assert!(matches!(result, Err(TransferError::Merge { .. })));
        assert!(!dir.path().join("merged_0.concat.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_input_is_merge_error() {
        let runner = MockRemuxRunner::new();
        let result = ChunkMerger::new(&runner)
            .merge(&[], Path::new("/tmp/merged.mp4"))
            .await;
        assert!(matches!(result, Err(TransferError::Merge { .. })));
    }

    #[test]
    fn test_manifest_escapes_quotes() {
        let segments = vec![Segment::new(MediaFile::new("/tmp/it's.mp4"), 0)];
        assert_eq!(concat_manifest(&segments), "file '/tmp/it'\\''s.mp4'\n");
    }
}
