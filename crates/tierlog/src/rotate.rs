//! Rotating, append-mode file sink.
//!
//! The active file is written in append mode so a restart continues where
//! the previous run stopped. When a write would push the active file past
//! the size limit, the file is renamed to a timestamped backup and a fresh
//! active file is created. Retention prunes backups by count and by age.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use parking_lot::Mutex;

use crate::sink::Sink;

/// Rotation and retention policy for a file sink.
///
/// A zero value disables the corresponding rule.
#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    /// Maximum size of the active file in bytes before rotation.
    pub max_size: u64,
    /// Number of rotated backups to keep; pruned oldest first.
    pub max_backups: usize,
    /// Backups older than this many days are removed.
    pub max_age_days: u64,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size: 10 * 1024 * 1024, // 10 MB
            max_backups: 0,
            max_age_days: 0,
        }
    }
}

impl RotationPolicy {
    /// Sets the maximum active-file size in megabytes.
    #[must_use]
    pub const fn with_max_size_mb(mut self, megabytes: u64) -> Self {
        self.max_size = megabytes * 1024 * 1024;
        self
    }

    /// Sets the number of backups to keep.
    #[must_use]
    pub const fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    /// Sets the maximum backup age in days.
    #[must_use]
    pub const fn with_max_age_days(mut self, days: u64) -> Self {
        self.max_age_days = days;
        self
    }
}

/// Open-file state; `file` is `None` once the sink has been closed.
struct FileState {
    file: Option<File>,
    size: u64,
}

/// File sink with size-based rotation and backup retention.
pub struct RotatingFileSink {
    name: String,
    path: PathBuf,
    policy: RotationPolicy,
    state: Mutex<FileState>,
    /// Disambiguates backups rotated within the same millisecond.
    backup_seq: AtomicU64,
}

impl RotatingFileSink {
    /// Opens the sink, creating the file if missing and appending otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or inspected.
    pub fn open(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        policy: RotationPolicy,
    ) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            name: name.into(),
            path,
            policy,
            state: Mutex::new(FileState {
                file: Some(file),
                size,
            }),
            backup_seq: AtomicU64::new(0),
        })
    }

    /// Returns the active file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lists this sink's backup files with their modification times.
    fn backups(&self) -> io::Result<Vec<(PathBuf, SystemTime)>> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut backups = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !is_backup_of(&file_name, &stem, &ext) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            backups.push((entry.path(), modified));
        }
        backups.sort_by_key(|(_, modified)| *modified);
        Ok(backups)
    }

    /// Renames the active file to a backup and starts a fresh one.
    fn rotate_locked(&self, state: &mut FileState) -> io::Result<()> {
        let backup = self.backup_path();
        fs::rename(&self.path, &backup)?;
        // The old handle now refers to the backup; drop it before reopening.
        state.file = None;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        state.file = Some(file);
        state.size = 0;

        if let Err(err) = self.prune_backups() {
            tracing::debug!(
                path = %self.path.display(),
                error = %err,
                "backup pruning failed"
            );
        }
        Ok(())
    }

    fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let seq = self.backup_seq.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!("{stem}.{timestamp}-{seq:04}.{ext}"))
    }

    /// Applies the age and count retention rules to existing backups.
    fn prune_backups(&self) -> io::Result<()> {
        if self.policy.max_backups == 0 && self.policy.max_age_days == 0 {
            return Ok(());
        }

        let mut backups = self.backups()?;

        if self.policy.max_age_days > 0 {
            let cutoff = SystemTime::now()
                .checked_sub(Duration::from_secs(self.policy.max_age_days * 24 * 60 * 60));
            if let Some(cutoff) = cutoff {
                backups.retain(|(path, modified)| {
                    if *modified < cutoff {
                        let _ = fs::remove_file(path);
                        false
                    } else {
                        true
                    }
                });
            }
        }

        if self.policy.max_backups > 0 && backups.len() > self.policy.max_backups {
            let excess = backups.len() - self.policy.max_backups;
            for (path, _) in backups.drain(..excess) {
                let _ = fs::remove_file(&path);
            }
        }

        Ok(())
    }
}

/// Recognizes `<stem>.<timestamp>-<seq>.<ext>` names produced by rotation.
///
/// The tag check keeps sinks sharing a directory from pruning each other's
/// files (`svc.log` backups must not match `svc.critical.log`).
fn is_backup_of(file_name: &str, stem: &str, ext: &str) -> bool {
    let Some(rest) = file_name.strip_prefix(stem) else {
        return false;
    };
    let Some(rest) = rest.strip_prefix('.') else {
        return false;
    };
    let Some(tag) = rest.strip_suffix(ext).and_then(|r| r.strip_suffix('.')) else {
        return false;
    };

    // Tag layout: YYYYMMDD_HHMMSS_mmm-NNNN
    let parts: Vec<&str> = tag.split(['_', '-']).collect();
    parts.len() == 4
        && parts
            .iter()
            .zip([8usize, 6, 3, 4])
            .all(|(part, len)| part.len() == len && part.bytes().all(|b| b.is_ascii_digit()))
}

impl Sink for RotatingFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();

        let needs_rotation = self.policy.max_size > 0
            && state.size > 0
            && state.size + bytes.len() as u64 > self.policy.max_size;
        if needs_rotation {
            self.rotate_locked(&mut state)?;
        }

        let Some(file) = state.file.as_mut() else {
            return Err(io::Error::other("sink closed"));
        };
        file.write_all(bytes)?;
        state.size += bytes.len() as u64;
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        let state = self.state.lock();
        match state.file.as_ref() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }

    fn close(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        match state.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }
}
