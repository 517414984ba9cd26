//! Audit service: hands events to a background writer thread

use miniwaf_core::{Event, EventSink};
use parking_lot::Mutex;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::persistence::{AuditConfig, AuditWriter, PersistedEvent};

/// Commands sent to the background writer
enum AuditCommand {
    /// Record an event
    Record(Box<PersistedEvent>),

    /// Flush to disk
    Flush,

    /// Drain and stop
    Shutdown,
}

/// Audit log sink.
///
/// `emit` only enqueues, so inspections never wait on disk I/O.
pub struct AuditService {
    sender: mpsc::UnboundedSender<AuditCommand>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AuditService {
    /// Open the audit file and start the writer thread
    pub fn new(config: AuditConfig) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();

        // Open eagerly so a bad path fails startup rather than the first write
        let writer = AuditWriter::new(config.clone())?;

        let handle = std::thread::Builder::new()
            .name("miniwaf-audit".to_string())
            .spawn(move || run_writer(writer, receiver))?;

        info!("Audit service started with file: {:?}", config.path);

        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Record an event asynchronously
    pub fn record(&self, event: PersistedEvent) {
        if let Err(e) = self.sender.send(AuditCommand::Record(Box::new(event))) {
            warn!("Failed to send audit event: {}", e);
        }
    }

    /// Ask the writer to flush pending events to disk
    pub fn flush(&self) {
        if let Err(e) = self.sender.send(AuditCommand::Flush) {
            warn!("Failed to send flush command: {}", e);
        }
    }

    /// Write out everything queued so far and stop the writer thread.
    ///
    /// Blocks until the writer exits. Later events are dropped.
    pub fn shutdown(&self) {
        let _ = self.sender.send(AuditCommand::Shutdown);
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!("Audit writer thread panicked");
            }
        }
    }
}

impl EventSink for AuditService {
    fn emit(&self, event: &Event) {
        self.record(PersistedEvent::new(event.clone()));
    }
}

impl Drop for AuditService {
    fn drop(&mut self) {
        let _ = self.sender.send(AuditCommand::Shutdown);
    }
}

fn run_writer(mut writer: AuditWriter, mut receiver: mpsc::UnboundedReceiver<AuditCommand>) {
    while let Some(cmd) = receiver.blocking_recv() {
        match cmd {
            AuditCommand::Record(event) => {
                if let Err(e) = writer.write_event(event.as_ref()) {
                    error!("Failed to write audit event: {}", e);
                }
            }
            AuditCommand::Flush => {
                if let Err(e) = writer.flush() {
                    error!("Failed to flush audit writer: {}", e);
                }
            }
            AuditCommand::Shutdown => {
                debug!("Audit writer shutting down");
                break;
            }
        }
    }

    if let Err(e) = writer.flush() {
        error!("Failed to flush audit writer: {}", e);
    }
}
