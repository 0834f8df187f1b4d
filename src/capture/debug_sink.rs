use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::RgbaImage;
use tracing::debug;

use crate::error::CaptureError;

/// Persists one PNG per successful capture into a local directory.
pub struct DebugSink {
    dir: PathBuf,
    max_files: Option<usize>,
}

impl DebugSink {
    pub fn new(dir: impl Into<PathBuf>, max_files: Option<usize>) -> Self {
        Self {
            dir: dir.into(),
            max_files,
        }
    }

    pub fn store(
        &self,
        monitor_index: usize,
        captured_at: DateTime<Utc>,
        seq: u64,
        frame: &RgbaImage,
    ) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(file_name(monitor_index, captured_at, seq));
        frame.save(&path)?;
        self.prune()?;
        Ok(path)
    }

    // Drops the oldest snapshots once the retention cap is exceeded. The
    // timestamp+seq naming makes lexicographic order chronological.
    fn prune(&self) -> Result<(), CaptureError> {
        let Some(max_files) = self.max_files else {
            return Ok(());
        };
        let mut entries: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_snapshot(p))
            .collect();
        if entries.len() <= max_files {
            return Ok(());
        }
        entries.sort();
        for stale in &entries[..entries.len() - max_files] {
            debug!("Pruning debug screenshot {}", stale.display());
            fs::remove_file(stale)?;
        }
        Ok(())
    }
}

pub fn file_name(monitor_index: usize, captured_at: DateTime<Utc>, seq: u64) -> String {
    format!(
        "screenshot_monitor{}_{}_{:04}.png",
        monitor_index,
        captured_at.format("%Y%m%d_%H%M%S"),
        seq
    )
}

fn is_snapshot(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("screenshot_monitor") && n.ends_with(".png"))
        .unwrap_or(false)
}
