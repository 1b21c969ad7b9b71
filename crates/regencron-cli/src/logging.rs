//! Logging sinks for the `regencron` binary.
//!
//! Log lines go to stderr when it is an interactive terminal, and to a
//! size-rotated logfile when one is configured. Unattended runs with no
//! logfile keep stderr quiet below the error the entry point prints.

use std::fs::{self, File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const MAX_LOG_FILE_SIZE: u64 = 500 * 1024 * 1024;
const LOG_FILE_BACKUPS: usize = 1;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber. Called once, after the config is
/// validated and the effective debug level is known.
pub fn init(debug: bool, logfile: Option<&Path>) -> Result<()> {
    let file_layer = match logfile {
        Some(path) => {
            let writer = RollingLogWriter::open(path.to_path_buf())
                .with_context(|| format!("failed to open logfile {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(log_filter(debug)),
            )
        }
        None => None,
    };

    let console_layer = if io::stderr().is_terminal() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time()
                .with_filter(log_filter(debug)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();
    INITIALIZED.store(true, Ordering::Release);
    Ok(())
}

/// Whether [`init`] has run. Errors raised before that (config problems)
/// must be reported on stderr directly, since `tracing` drops them.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

fn log_filter(debug: bool) -> EnvFilter {
    let default = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

// ---------------------------------------------------------------------------
// Size-rotated logfile writer
// ---------------------------------------------------------------------------

struct RollingFile {
    path: PathBuf,
    max_size: u64,
    backups: usize,
    file: Option<File>,
    current_size: u64,
}

impl RollingFile {
    fn new(path: PathBuf, max_size: u64, backups: usize) -> io::Result<Self> {
        let mut rolling = Self {
            path,
            max_size,
            backups,
            file: None,
            current_size: 0,
        };
        let (file, size) = rolling.open_current_file()?;
        rolling.file = Some(file);
        rolling.current_size = size;
        if rolling.current_size > rolling.max_size {
            rolling.rotate()?;
        }
        Ok(rolling)
    }

    fn open_current_file(&self) -> io::Result<(File, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let size = file.metadata()?.len();
        Ok((file, size))
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        if self.backups > 0 {
            let oldest = self.backup_path(self.backups);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for index in (1..self.backups).rev() {
                let src = self.backup_path(index);
                if src.exists() {
                    fs::rename(&src, self.backup_path(index + 1))?;
                }
            }
            if self.path.exists() {
                fs::rename(&self.path, self.backup_path(1))?;
            }
        }

        let (file, size) = self.open_current_file()?;
        self.file = Some(file);
        self.current_size = size;
        Ok(())
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.current_size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file unavailable"))?;
        let bytes = file.write(buf)?;
        self.current_size += bytes as u64;
        Ok(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

#[derive(Clone)]
struct RollingLogWriter {
    inner: Arc<Mutex<RollingFile>>,
}

impl RollingLogWriter {
    fn open(path: PathBuf) -> io::Result<Self> {
        let rolling = RollingFile::new(path, MAX_LOG_FILE_SIZE, LOG_FILE_BACKUPS)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(rolling)),
        })
    }
}

struct RollingLogGuard {
    inner: Arc<Mutex<RollingFile>>,
}

impl<'a> MakeWriter<'a> for RollingLogWriter {
    type Writer = RollingLogGuard;

    fn make_writer(&'a self) -> Self::Writer {
        RollingLogGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for RollingLogGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?;
        guard.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
