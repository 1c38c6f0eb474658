//! Drives the gallery-dl extractor for one link.

use crate::domain::link::LinkPattern;
use crate::domain::media::MediaFile;
use crate::error::{Result, TransferError};
use crate::ports::chat::ProgressSink;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Preferred container, then the fallbacks tried in order.
const PRIMARY_EXTENSION: &str = "mp4";
const FALLBACK_EXTENSIONS: [&str; 3] = ["mkv", "webm", "mov"];

/// How long readers get to reach end-of-stream once the extractor is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Severity marker embedded in an extractor output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn classify(line: &str, fallback: Severity) -> Severity {
        let lower = line.to_lowercase();
        if lower.contains("[debug]") {
            Severity::Debug
        } else if lower.contains("[error]") {
            Severity::Error
        } else if lower.contains("[warning]") {
            Severity::Warning
        } else {
            fallback
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    fn label(self) -> &'static str {
        match self {
            OutputStream::Stdout => "gallery-dl",
            OutputStream::Stderr => "gallery-dl stderr",
        }
    }

    fn fallback(self) -> Severity {
        match self {
            OutputStream::Stdout => Severity::Info,
            OutputStream::Stderr => Severity::Error,
        }
    }
}

/// Runs the extractor against a link and finds the file it produced.
#[derive(Debug, Clone)]
pub struct Fetcher {
    program: PathBuf,
    leading_args: Vec<OsString>,
    timeout: Duration,
    links: LinkPattern,
}

impl Fetcher {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            timeout,
            links: LinkPattern::new(),
        }
    }

    /// Arguments placed before the extractor's own flags, e.g. a script path
    /// when `program` is an interpreter.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Download the video behind `url` into `workspace`.
    ///
    /// Both output readers have finished when this returns, whatever the
    /// outcome, and a timed-out extractor has been killed and reaped.
    pub async fn fetch(
        &self,
        url: &str,
        workspace: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<MediaFile> {
        let Some(link) = self.links.find(url) else {
            tracing::warn!("Unsupported link: {}", url);
            return Err(TransferError::UnsupportedUrl(url.to_string()));
        };
        let link_url = link.url();

        if let Err(e) = progress.update("🔍 Fetching video info from Twitter...").await {
            tracing::warn!("Could not update status: {}", e);
        }
        tracing::info!("Downloading status {} from {}", link.status_id, link_url);

        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg("-D")
            .arg(workspace)
            .arg("--verbose")
            .arg(&link_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        tracing::debug!("Running {:?}", command.as_std());

        let mut child = command.spawn().map_err(|e| TransferError::Subprocess {
            code: None,
            stderr: format!("could not start {}: {}", self.program.display(), e),
        })?;

        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(drain(out, OutputStream::Stdout)));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(drain(err, OutputStream::Stderr)));

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let outcome: Result<ExitStatus> = match waited {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(e)) => {
                terminate(&mut child).await;
                Err(TransferError::Io(e))
            }
            Err(_) => {
                tracing::error!(
                    "gallery-dl timed out after {}s, terminating",
                    self.timeout.as_secs()
                );
                terminate(&mut child).await;
                Err(TransferError::Timeout(self.timeout))
            }
        };

        let (_, stderr_lines) = tokio::join!(finish_drain(stdout_task), finish_drain(stderr_task));

        let status = outcome?;
        if !status.success() {
            let stderr = stderr_lines.join("\n").trim().to_string();
            tracing::error!("gallery-dl exited with {}: {}", status, stderr);
            return Err(TransferError::Subprocess {
                code: status.code(),
                stderr,
            });
        }

        locate_output(workspace).await
    }
}

async fn terminate(child: &mut tokio::process::Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("Could not kill gallery-dl: {}", e);
    }
}

/// Read `reader` to end-of-stream, logging each line at its marked severity.
/// Returns the stderr lines that are not debug chatter.
async fn drain<R: AsyncRead + Unpin>(reader: R, stream: OutputStream) -> Vec<String> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut captured = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim();
                if line.is_empty() {
                    continue;
                }
                let severity = Severity::classify(line, stream.fallback());
                emit(stream, line, severity);
                if matches!(stream, OutputStream::Stderr) && severity != Severity::Debug {
                    captured.push(line.to_string());
                }
            }
            Err(e) => {
                tracing::warn!("Reading {} failed: {}", stream.label(), e);
                break;
            }
        }
    }
    captured
}

fn emit(stream: OutputStream, line: &str, severity: Severity) {
    let label = stream.label();
    match severity {
        Severity::Debug => tracing::debug!("{}: {}", label, line),
        Severity::Info => tracing::info!("{}: {}", label, line),
        Severity::Warning => tracing::warn!("{}: {}", label, line),
        Severity::Error => tracing::error!("{}: {}", label, line),
    }
}

async fn finish_drain(task: Option<JoinHandle<Vec<String>>>) -> Vec<String> {
    let Some(mut handle) = task else {
        return Vec::new();
    };
    match tokio::time::timeout(DRAIN_GRACE, &mut handle).await {
        Ok(Ok(lines)) => lines,
        Ok(Err(e)) => {
            tracing::warn!("Output reader failed: {}", e);
            Vec::new()
        }
        Err(_) => {
            tracing::warn!("Output still open after extractor exit, abandoning reader");
            handle.abort();
            let _ = handle.await;
            Vec::new()
        }
    }
}

/// Find the downloaded video in `dir`.
///
/// `.mp4` files win; otherwise the first fallback extension with any match.
/// Among several candidates the newest by creation time is picked, ties
/// going to the lexically greatest path. Other files are left alone.
pub async fn locate_output(dir: &Path) -> Result<MediaFile> {
    let mut files: Vec<(PathBuf, SystemTime)> = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((entry.path(), created));
    }

    for extension in std::iter::once(PRIMARY_EXTENSION).chain(FALLBACK_EXTENSIONS) {
        let candidates: Vec<(PathBuf, SystemTime)> = files
            .iter()
            .filter(|(path, _)| path.extension().is_some_and(|ext| ext == extension))
            .cloned()
            .collect();

        tracing::info!("Found {} .{} files in {}", candidates.len(), extension, dir.display());
        if let Some(path) = newest(candidates) {
            tracing::info!("Selected video file {}", path.display());
            return Ok(MediaFile::new(path));
        }
    }

    let names: Vec<String> = files
        .iter()
        .filter_map(|(path, _)| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    tracing::error!("No video file in {}; directory holds {:?}", dir.display(), names);
    Err(TransferError::NoOutput(dir.to_path_buf()))
}

fn newest(candidates: Vec<(PathBuf, SystemTime)>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(path, _)| path)
}
