//! Synchronized fan-out point for all run output.
//!
//! Every line produced during a run passes through [`LogHub::print`]: it is
//! kept in a bounded [`MessageBuffer`], persisted to the transcript (unless it
//! is a progress redraw), and forwarded to at most one live [`LogObserver`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, warn};

use crate::buffer::{MessageBuffer, is_overwrite};
use crate::errors::HarnessError;

/// Live consumer of hub output, typically a display.
///
/// Callbacks may arrive from any thread or task and are made while the hub
/// lock is held, so an observer must not call back into the hub. Marshaling to
/// a UI thread is the observer's business.
pub trait LogObserver: Send + Sync {
    /// One new message, in print order.
    fn on_message(&self, message: &str);

    /// Whole-buffer snapshot, delivered once when the observer is attached.
    fn on_messages(&self, snapshot: MessageBuffer);

    /// A closed observer is treated as absent and dropped from the hub.
    fn is_closed(&self) -> bool {
        false
    }
}

struct HubState {
    messages: MessageBuffer,
    transcript: Option<Box<dyn Write + Send>>,
    transcript_error: Option<std::io::Error>,
    observer: Option<Weak<dyn LogObserver>>,
}

impl HubState {
    fn print(&mut self, message: &str) {
        self.messages.append(message);

        if !is_overwrite(message) {
            self.persist(message);
        }

        self.dispatch(message);
    }

    fn persist(&mut self, message: &str) {
        let Some(writer) = self.transcript.as_mut() else {
            return;
        };
        let result = writer
            .write_all(message.as_bytes())
            .and_then(|_| writer.write_all(b"\n"));
        if let Err(err) = result {
            warn!(error = %err, "transcript write failed, further lines will not be persisted");
            self.transcript = None;
            self.transcript_error = Some(err);
        }
    }

    fn dispatch(&mut self, message: &str) {
        match self.live_observer() {
            Some(observer) => observer.on_message(message),
            None => self.observer = None,
        }
    }

    fn live_observer(&self) -> Option<Arc<dyn LogObserver>> {
        self.observer
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|observer| !observer.is_closed())
    }
}

/// Bounded, persisted, observable log for one run.
pub struct LogHub {
    state: Mutex<HubState>,
    transcript_path: Option<PathBuf>,
}

impl LogHub {
    /// Create a hub persisting to a fresh transcript file at `path`.
    ///
    /// Parent directories are created and an existing file is truncated.
    pub fn create(path: &Path, capacity: usize) -> Result<Self, HarnessError> {
        let to_error = |source| HarnessError::Transcript {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(to_error)?;
        }
        let file = File::create(path).map_err(to_error)?;
        debug!(path = %path.display(), capacity, "transcript opened");

        let mut hub = Self::with_writer(BufWriter::new(file), capacity);
        hub.transcript_path = Some(path.to_path_buf());
        Ok(hub)
    }

    /// Create a hub persisting to an arbitrary writer.
    pub fn with_writer<W: Write + Send + 'static>(writer: W, capacity: usize) -> Self {
        Self::from_parts(Some(Box::new(writer)), capacity)
    }

    /// Create a hub with no transcript.
    pub fn in_memory(capacity: usize) -> Self {
        Self::from_parts(None, capacity)
    }

    fn from_parts(transcript: Option<Box<dyn Write + Send>>, capacity: usize) -> Self {
        Self {
            state: Mutex::new(HubState {
                messages: MessageBuffer::with_capacity(capacity),
                transcript,
                transcript_error: None,
                observer: None,
            }),
            transcript_path: None,
        }
    }

    // A panicking observer poisons the lock; the state itself stays consistent.
    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("log hub lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Buffer, persist and forward one message.
    pub fn print(&self, message: impl AsRef<str>) {
        self.lock().print(message.as_ref());
    }

    /// Feed every message of `messages` through [`Self::print`] under a single
    /// lock acquisition, so no concurrent print interleaves with the batch.
    pub fn print_all(&self, messages: &MessageBuffer) {
        let mut state = self.lock();
        for message in messages {
            state.print(message);
        }
    }

    /// Attach `observer` as the only live consumer.
    ///
    /// The observer first receives a snapshot of everything buffered so far,
    /// then every message printed afterwards. Both steps happen under the hub
    /// lock, so nothing is missed or delivered twice. A previously attached
    /// observer is silently replaced. The hub keeps only a weak reference.
    pub fn attach_observer<O: LogObserver + 'static>(&self, observer: &Arc<O>) {
        let mut state = self.lock();
        observer.on_messages(state.messages.snapshot());
        let weak: Weak<dyn LogObserver> = Arc::downgrade(observer) as Weak<O>;
        state.observer = Some(weak);
    }

    /// Stop forwarding to the current observer, if any.
    pub fn detach_observer(&self) {
        self.lock().observer = None;
    }

    /// Whether an observer is attached and still live.
    pub fn has_observer(&self) -> bool {
        self.lock().live_observer().is_some()
    }

    /// Copy of the buffered messages.
    pub fn snapshot(&self) -> MessageBuffer {
        self.lock().messages.snapshot()
    }

    pub fn transcript_path(&self) -> Option<&Path> {
        self.transcript_path.as_deref()
    }

    /// Flush and close the transcript.
    ///
    /// Reports the first write error seen during the run, if any. Later calls
    /// are no-ops; printing after `finish` still buffers and forwards but no
    /// longer persists.
    pub fn finish(&self) -> std::io::Result<()> {
        let mut state = self.lock();
        if let Some(err) = state.transcript_error.take() {
            state.transcript = None;
            return Err(err);
        }
        match state.transcript.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for LogHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHub")
            .field("transcript_path", &self.transcript_path)
            .finish_non_exhaustive()
    }
}
