use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command as TokioCommand;

/// Stream-copy remux operations used to cut and rejoin media files.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemuxRunner: Send + Sync {
    /// Print the container duration, in seconds, on stdout.
    async fn probe_duration(&self, media_path: &Path) -> io::Result<Output>;

    /// Cut `input` into independent mp4 files of about `segment_time` seconds,
    /// named after the printf-style `output_pattern`.
    async fn split_segments(
        &self,
        input: &Path,
        segment_time: f64,
        output_pattern: &Path,
    ) -> io::Result<Output>;

    /// Join the files listed in a concat manifest into `output`.
    async fn concat(&self, manifest: &Path, output: &Path) -> io::Result<Output>;
}

/// Runs the real `ffmpeg` / `ffprobe` binaries.
#[derive(Clone, Debug)]
pub struct RealRemuxRunner {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for RealRemuxRunner {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl RealRemuxRunner {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl RemuxRunner for RealRemuxRunner {
    async fn probe_duration(&self, media_path: &Path) -> io::Result<Output> {
        TokioCommand::new(&self.ffprobe)
            .arg("-v").arg("error")
            .arg("-show_entries").arg("format=duration")
            .arg("-of").arg("default=noprint_wrappers=1:nokey=1")
            .arg(media_path)
            .stdin(Stdio::null())
            .output()
            .await
    }

    async fn split_segments(
        &self,
        input: &Path,
        segment_time: f64,
        output_pattern: &Path,
    ) -> io::Result<Output> {
        TokioCommand::new(&self.ffmpeg)
            .arg("-i").arg(input)
            .arg("-c").arg("copy")
            .arg("-f").arg("segment")
            .arg("-segment_time").arg(segment_time.to_string())
            .arg("-reset_timestamps").arg("1")
            .arg("-segment_format").arg("mp4")
            .arg("-max_muxing_queue_size").arg("1024")
            .arg(output_pattern)
            .stdin(Stdio::null())
            .output()
            .await
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> io::Result<Output> {
        TokioCommand::new(&self.ffmpeg)
            .arg("-f").arg("concat")
            .arg("-safe").arg("0")
            .arg("-i").arg(manifest)
            .arg("-c").arg("copy")
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .await
    }
}

/// Last non-empty stderr lines of a failed run, for error messages.
pub(crate) fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        format!("exited with {}", output.status)
    } else {
        tail
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::mock_output;
    use super::*;

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = (1..=8).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let output = mock_output("", &stderr, false).unwrap();
        assert_eq!(stderr_tail(&output), "line 4\nline 5\nline 6\nline 7\nline 8");
    }

    #[test]
    fn test_stderr_tail_falls_back_to_status() {
        let output = mock_output("", "  \n", false).unwrap();
        assert!(stderr_tail(&output).starts_with("exited with"));
    }
}
