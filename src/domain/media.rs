use std::path::{Path, PathBuf};
use tokio::fs;

/// A media file on scratch storage.
///
/// The size is never cached: every stage asks the filesystem again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    path: PathBuf,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current byte size, measured from storage.
    pub async fn size(&self) -> std::io::Result<u64> {
        Ok(fs::metadata(&self.path).await?.len())
    }
}

/// One time-bounded slice of a source file. `index` gives playback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub file: MediaFile,
    pub index: usize,
}

impl Segment {
    pub fn new(file: MediaFile, index: usize) -> Self {
        Self { file, index }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// A file ready to be sent, labelled with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverablePart {
    pub file: MediaFile,
    pub ordinal: usize,
    pub total: usize,
}

impl DeliverablePart {
    pub fn new(file: MediaFile, ordinal: usize, total: usize) -> Self {
        Self {
            file,
            ordinal,
            total,
        }
    }

    /// Caption attached to the video message.
    pub fn caption(&self) -> String {
        if self.total == 1 {
            String::from("Your video is ready")
        } else {
            format!("Video part {}/{}", self.ordinal, self.total)
        }
    }

    pub fn file_name(&self) -> String {
        self.file
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("part_{}.mp4", self.ordinal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_size_is_remeasured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"abc").unwrap();

        let media = MediaFile::new(&path);
        assert_eq!(media.size().await.unwrap(), 3);

        std::fs::write(&path, b"abcdef").unwrap();
        assert_eq!(media.size().await.unwrap(), 6);
    }

    #[test]
    fn test_captions() {
        let single = DeliverablePart::new(MediaFile::new("/tmp/a.mp4"), 1, 1);
        assert_eq!(single.caption(), "Your video is ready");

        let part = DeliverablePart::new(MediaFile::new("/tmp/b.mp4"), 2, 3);
        assert_eq!(part.caption(), "Video part 2/3");
        assert_eq!(part.file_name(), "b.mp4");
    }
}
