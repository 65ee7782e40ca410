use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogConfig;

const FILE_FILTER: &str = "debug,hyper=info,hyper_util=info,reqwest=info,rustls=info";

/// Target for events whose text the operator already sees as plain output
/// (per-snapshot outcomes, the final abort). They go to the log file only.
pub const FILE_ONLY_TARGET: &str = "slb::audit";

/// Append-only log file that rolls over to `<path>.1 .. <path>.N` once it
/// would grow past `max_bytes`. `max_bytes == 0` disables rollover.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self { path, file, written, max_bytes, backups })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut s: OsString = self.path.as_os_str().to_owned();
        s.push(format!(".{n}"));
        PathBuf::from(s)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.backups == 0 {
            self.file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        } else {
            let oldest = self.backup_path(self.backups);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for n in (1..self.backups).rev() {
                let from = self.backup_path(n);
                if from.exists() {
                    fs::rename(&from, self.backup_path(n + 1))?;
                }
            }
            fs::rename(&self.path, self.backup_path(1))?;
            self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        }
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.max_bytes > 0 && self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// `error-log.<local timestamp>.log` inside `dir`.
pub fn log_file_name() -> String {
    format!("error-log.{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber: a debug-level file log plus a console
/// layer on stderr (warn unless `RUST_LOG` says otherwise). Returns the
/// log file path.
pub fn init_logging(cfg: &LogConfig) -> Result<PathBuf> {
    let dir = cfg.dir_path();
    fs::create_dir_all(&dir).with_context(|| format!("create log dir {}", dir.display()))?;
    let path = dir.join(log_file_name());
    let file = RotatingFile::open(&path, cfg.max_bytes, cfg.backups)
        .with_context(|| format!("open log file {}", path.display()))?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .with_filter(EnvFilter::new(FILE_FILTER));
    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(console_filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(path)
}

/// Console-only logging for when the log directory is unusable.
pub fn init_console_only() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false).with_filter(console_filter()))
        .try_init();
}

fn console_filter() -> EnvFilter {
    console_filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

/// `RUST_LOG` (or `warn`) with [`FILE_ONLY_TARGET`] switched off.
fn console_filter_from(directives: Option<&str>) -> EnvFilter {
    let base = directives.map(str::trim).filter(|d| !d.is_empty()).unwrap_or("warn");
    EnvFilter::try_new(format!("{base},{FILE_ONLY_TARGET}=off"))
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{FILE_ONLY_TARGET}=off")))
}
