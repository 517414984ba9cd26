//! Audit log persistence
//!
//! Events are appended as JSON lines. When the file grows past
//! `max_file_size` it is renamed to `<path>.1` (replacing any previous
//! rotation) and a fresh file is started.

use miniwaf_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration for the audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Write the audit log at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path of the active log file
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Maximum file size before rotation (bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Flush to disk after this many events
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_path(),
            max_file_size: default_max_file_size(),
            flush_interval: default_flush_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_path() -> PathBuf {
    PathBuf::from("waf.log")
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024 // 100MB
}

fn default_flush_interval() -> usize {
    1
}

/// An event as stored in the audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEvent {
    /// Unique event ID
    pub id: String,

    #[serde(flatten)]
    pub event: Event,
}

impl PersistedEvent {
    pub fn new(event: Event) -> Self {
        Self {
            id: format!("evt_{}", uuid::Uuid::new_v4()),
            event,
        }
    }
}

/// Appends events to the audit file, rotating by size
pub struct AuditWriter {
    config: AuditConfig,
    current_file: Option<BufWriter<File>>,
    current_size: u64,
    events_since_flush: usize,
}

impl AuditWriter {
    /// Open (or create) the audit file
    pub fn new(config: AuditConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = Self {
            config,
            current_file: None,
            current_size: 0,
            events_since_flush: 0,
        };

        writer.open_file()?;
        Ok(writer)
    }

    /// Append one event
    pub fn write_event(&mut self, event: &PersistedEvent) -> std::io::Result<()> {
        if self.current_size >= self.config.max_file_size {
            self.rotate()?;
        }

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        if let Some(ref mut writer) = self.current_file {
            writer.write_all(&line)?;
            self.current_size += line.len() as u64;
            self.events_since_flush += 1;

            if self.events_since_flush >= self.config.flush_interval {
                writer.flush()?;
                self.events_since_flush = 0;
            }
        }

        Ok(())
    }

    /// Force flush to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
            self.events_since_flush = 0;
        }
        Ok(())
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;

        let rotated = rotated_path(&self.config.path);
        if let Err(e) = std::fs::rename(&self.config.path, &rotated) {
            warn!("Failed to rotate audit file: {}", e);
        } else {
            info!("Rotated audit file to: {:?}", rotated);
        }

        self.open_file()
    }

    fn open_file(&mut self) -> std::io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)?;

        self.current_size = file.metadata()?.len();
        self.current_file = Some(BufWriter::new(file));
        self.events_since_flush = 0;

        Ok(())
    }
}

/// `<path>.1`
pub fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

/// Read every event from an audit file, skipping lines that do not parse
pub fn read_events(path: impl AsRef<Path>) -> std::io::Result<Vec<PersistedEvent>> {
    let file = File::open(path)?;
    let mut events = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(event) => events.push(event),
            Err(e) => warn!("Skipping malformed audit line: {}", e),
        }
    }

    Ok(events)
}
