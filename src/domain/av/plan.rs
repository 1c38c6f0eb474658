use super::cmd::RemuxRunner;
use super::merge::ChunkMerger;
use crate::domain::media::{DeliverablePart, MediaFile, Segment};
use crate::error::Result;
use std::ops::Range;
use std::path::Path;

/// Greedy left-to-right grouping of consecutive sizes under `ceiling`.
///
/// Returns index ranges into `sizes`. Order is never changed and a single
/// item larger than the ceiling becomes a group of its own.
pub fn group_by_ceiling(sizes: &[u64], ceiling: u64) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut accumulated: u64 = 0;

    for (i, &size) in sizes.iter().enumerate() {
        if accumulated.saturating_add(size) <= ceiling {
            accumulated += size;
        } else {
            if i > start {
                groups.push(start..i);
            }
            start = i;
            accumulated = size;
        }
    }
    if start < sizes.len() {
        groups.push(start..sizes.len());
    }
    groups
}

/// Packs segments back together to send as few attachments as possible.
pub struct ChunkPlanner<'a, R: ?Sized> {
    merger: ChunkMerger<'a, R>,
}

impl<'a, R: RemuxRunner + ?Sized> ChunkPlanner<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            merger: ChunkMerger::new(runner),
        }
    }

    /// Turn ordered segments into numbered parts, merging neighbours that
    /// fit together under `ceiling`. Merged files are written to `out_dir`.
    pub async fn plan(
        &self,
        segments: &[Segment],
        ceiling: u64,
        out_dir: &Path,
    ) -> Result<Vec<DeliverablePart>> {
        let mut sizes = Vec::with_capacity(segments.len());
        for segment in segments {
            sizes.push(segment.file.size().await?);
        }

        let groups = group_by_ceiling(&sizes, ceiling);
        let mut files: Vec<MediaFile> = Vec::with_capacity(groups.len());
        for group in groups {
            let members = &segments[group.clone()];
            let destination = out_dir.join(format!("merged_{}.mp4", files.len()));
            let file = self.merger.merge(members, &destination).await?;

            let group_size: u64 = sizes[group].iter().sum();
            if members.len() == 1 && group_size > ceiling {
                tracing::warn!(
                    "Segment {} is {} bytes, above the {} byte ceiling; sending as is",
                    members[0].path().display(),
                    group_size,
                    ceiling
                );
            }
            files.push(file);
        }

        let total = files.len();
        tracing::info!("Planned {} parts from {} segments", total, segments.len());
        Ok(files
            .into_iter()
            .enumerate()
            .map(|(i, file)| DeliverablePart::new(file, i + 1, total))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::av::cmd::test_support::mock_output;
    use crate::domain::av::cmd::MockRemuxRunner;
    use std::fs::File;

    const MIB: u64 = 1024 * 1024;

    fn sparse_segments(dir: &Path, sizes: &[u64]) -> Vec<Segment> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                let path = dir.join(format!("video_{:03}.mp4", i));
                File::create(&path).unwrap().set_len(len).unwrap();
                Segment::new(MediaFile::new(path), i)
            })
            .collect()
    }

    #[test]
    fn test_groups_pack_greedily() {
        assert_eq!(group_by_ceiling(&[10, 10, 10, 30, 5], 30), vec![0..3, 3..4, 4..5]);
        assert_eq!(group_by_ceiling(&[20, 20, 20], 40), vec![0..2, 2..3]);
        assert_eq!(group_by_ceiling(&[40, 40, 40], 40), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn test_groups_keep_order_and_cover_everything() {
        let sizes = [7, 3, 9, 1, 1, 8, 2, 6, 4, 5];
        let groups = group_by_ceiling(&sizes, 10);
        let flattened: Vec<usize> = groups.iter().cloned().flatten().collect();
        assert_eq!(flattened, (0..sizes.len()).collect::<Vec<_>>());
        for group in &groups {
            assert!(sizes[group.clone()].iter().sum::<u64>() <= 10);
        }
    }

    #[test]
    fn test_oversized_item_stands_alone() {
        assert_eq!(group_by_ceiling(&[50, 10, 60, 10], 48), vec![0..1, 1..2, 2..3, 3..4]);
        assert_eq!(group_by_ceiling(&[60], 48), vec![0..1]);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_ceiling(&[], 48).is_empty());
    }

    #[tokio::test]
    async fn test_equal_segments_over_half_ceiling_stay_separate() {
        let dir = tempfile::tempdir().unwrap();
        let size = 150 * MIB / 4;
        let segments = sparse_segments(dir.path(), &[size; 4]);

        let mut runner = MockRemuxRunner::new();
        runner.expect_concat().times(0);

        let parts = ChunkPlanner::new(&runner)
            .plan(&segments, 48 * MIB, dir.path())
            .await
            .unwrap();

        assert_eq!(parts.len(), 4);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.ordinal, i + 1);
            assert_eq!(part.total, 4);
            assert_eq!(part.file, segments[i].file);
        }
    }

    #[tokio::test]
    async fn test_small_neighbours_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let segments = sparse_segments(dir.path(), &[20 * MIB, 20 * MIB, 30 * MIB, 10 * MIB]);
        let expected_first = format!(
            "file '{}'\nfile '{}'\n",
            segments[0].path().display(),
            segments[1].path().display()
        );

        let mut runner = MockRemuxRunner::new();
        let mut calls = 0;
        runner.expect_concat().times(2).returning(move |manifest, output| {
            let listed = std::fs::read_to_string(manifest).unwrap();
            if calls == 0 {
                assert_eq!(listed, expected_first);
                assert!(output.ends_with("merged_0.mp4"));
            } else {
                assert!(output.ends_with("merged_1.mp4"));
            }
            calls += 1;
            File::create(output).unwrap().set_len(40 * MIB).unwrap();
            mock_output("", "", true)
        });

        let parts = ChunkPlanner::new(&runner)
            .plan(&segments, 48 * MIB, dir.path())
            .await
            .unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].file.path(), dir.path().join("merged_0.mp4"));
        assert_eq!(parts[1].file.path(), dir.path().join("merged_1.mp4"));
        assert!(parts.iter().all(|p| p.total == 2));
    }

    #[tokio::test]
    async fn test_oversized_segment_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let segments = sparse_segments(dir.path(), &[50 * MIB, 10 * MIB]);

        let mut runner = MockRemuxRunner::new();
        runner.expect_concat().times(0);

        let parts = ChunkPlanner::new(&runner)
            .plan(&segments, 48 * MIB, dir.path())
            .await
            .unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].file, segments[0].file);
        assert_eq!(parts[1].file, segments[1].file);
    }
}
