//! Size-bounded log file with numbered backup segments.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only log file rotated once it would grow past `max_bytes`.
///
/// Rotation shifts `log.1 .. log.N-1` up by one, renames the live file to
/// `log.1`, and drops whatever was in `log.N`. With zero backups the live file
/// is truncated instead. A `max_bytes` of zero disables rotation. The file is
/// opened by [`RotatingFile::probe`] or the first write, whichever comes
/// first, and reopened after each rotation. A handle opened before the
/// process forks is inherited by the detached server.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: Option<File>,
    written: u64,
}

impl RotatingFile {
    /// Creates a writer for `path` without opening it.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> Self {
        Self {
            path: path.into(),
            max_bytes,
            backups,
            file: None,
            written: 0,
        }
    }

    /// Opens the live file for appending, creating missing parent
    /// directories, so an unwritable log path fails before the server starts.
    pub fn probe(&mut self) -> io::Result<()> {
        self.live().map(|_| ())
    }

    fn live(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.written = file.metadata()?.len();
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file unavailable"))
    }

    fn needs_rotation(&self, incoming: usize) -> bool {
        let incoming = u64::try_from(incoming).unwrap_or(u64::MAX);
        self.max_bytes > 0
            && self.written > 0
            && self.written.saturating_add(incoming) > self.max_bytes
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        if self.backups == 0 {
            File::create(&self.path)?;
        } else {
            remove_if_present(&self.segment(self.backups))?;
            for index in (1..self.backups).rev() {
                rename_if_present(&self.segment(index), &self.segment(index + 1))?;
            }
            rename_if_present(&self.path, &self.segment(1))?;
        }
        self.written = 0;
        Ok(())
    }

    fn segment(&self, index: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.live()?;
        if self.needs_rotation(buf.len()) {
            self.rotate()?;
        }
        let written = self.live()?.write(buf)?;
        self.written = self
            .written
            .saturating_add(u64::try_from(written).unwrap_or(u64::MAX));
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}

fn rename_if_present(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}
