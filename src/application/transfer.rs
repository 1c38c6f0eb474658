use crate::config::TransferLimits;
use crate::domain::av::{ChunkPlanner, RemuxRunner, SizeChunker};
use crate::domain::fetch::Fetcher;
use crate::domain::media::DeliverablePart;
use crate::domain::session::TransferSession;
use crate::error::Result;
use crate::ports::chat::{PartSender, ProgressSink};
use std::path::PathBuf;

/// Outcome of a transfer whose pipeline ran to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub total_parts: usize,
    pub delivered: usize,
    /// Ordinals of parts that could not be sent
    pub failed: Vec<usize>,
}

/// Fetches a linked video and delivers it in platform-sized parts.
pub struct TransferService<R> {
    fetcher: Fetcher,
    runner: R,
    limits: TransferLimits,
    scratch_root: Option<PathBuf>,
}

impl<R> TransferService<R>
where
    R: RemuxRunner,
{
    pub fn new(fetcher: Fetcher, runner: R, limits: TransferLimits) -> Self {
        Self {
            fetcher,
            runner,
            limits,
            scratch_root: None,
        }
    }

    /// Create request workspaces under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    /// Run one request end to end.
    ///
    /// A fatal error is logged, shown to the user once through `progress`,
    /// and returned. The request workspace is gone when this returns.
    pub async fn transfer(
        &self,
        url: &str,
        progress: &dyn ProgressSink,
        sender: &dyn PartSender,
    ) -> Result<TransferReport> {
        let result = match TransferSession::create(self.scratch_root.as_deref()) {
            Ok(session) => {
                tracing::info!("Workspace {} for {}", session.path().display(), url);
                let result = self.run(url, &session, progress, sender).await;
                if let Err(e) = session.close() {
                    tracing::warn!("Could not remove workspace: {}", e);
                }
                result
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::error!("Transfer of {} failed: {}", url, e);
            status(progress, &e.user_message()).await;
        }
        result
    }

    async fn run(
        &self,
        url: &str,
        session: &TransferSession,
        progress: &dyn ProgressSink,
        sender: &dyn PartSender,
    ) -> Result<TransferReport> {
        let media = self.fetcher.fetch(url, session.path(), progress).await?;

        status(progress, "Processing video...").await;
        let size = media.size().await?;
        tracing::info!("Video {} is {} bytes", media.path().display(), size);

        let parts = if size <= self.limits.delivery_ceiling {
            status(progress, "Sending video...").await;
            vec![DeliverablePart::new(media, 1, 1)]
        } else {
            status(progress, "Video is large, splitting...").await;
            let segments = SizeChunker::new(&self.runner)
                .split(&media, self.limits.split_threshold)
                .await?;
            let parts = ChunkPlanner::new(&self.runner)
                .plan(&segments, self.limits.delivery_ceiling, session.path())
                .await?;
            status(progress, &format!("Sending video ({} parts)...", parts.len())).await;
            parts
        };

        let report = self.deliver(&parts, sender).await;
        status(progress, "Video delivered!").await;
        Ok(report)
    }

    /// Send parts one after another; a failed part is reported and skipped.
    async fn deliver(&self, parts: &[DeliverablePart], sender: &dyn PartSender) -> TransferReport {
        let mut report = TransferReport {
            total_parts: parts.len(),
            delivered: 0,
            failed: Vec::new(),
        };

        for (i, part) in parts.iter().enumerate() {
            if i > 0 && !self.limits.part_delay.is_zero() {
                tokio::time::sleep(self.limits.part_delay).await;
            }

            match sender.send_part(part).await {
                Ok(()) => {
                    tracing::info!("Sent part {}/{}", part.ordinal, part.total);
                    report.delivered += 1;
                }
                Err(e) => {
                    tracing::error!("Error sending video part {}: {}", part.ordinal, e);
                    report.failed.push(part.ordinal);
                    let notice = format!("Failed to send video part {}, please try again", part.ordinal);
                    if let Err(e) = sender.notify(&notice).await {
                        tracing::warn!("Could not report failed part {}: {}", part.ordinal, e);
                    }
                }
            }
        }
        report
    }
}

async fn status(progress: &dyn ProgressSink, text: &str) {
    if let Err(e) = progress.update(text).await {
        tracing::warn!("Could not update status to {:?}: {}", text, e);
    }
}
