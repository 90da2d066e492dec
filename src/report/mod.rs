//! Diagnostic reporting
//!
//! Every HTTP call made by the suite leaves a textual trail (request and
//! response) in a report sink, grouped by the scenario that was running at
//! the time. Reporting is strictly one-way: nothing in the suite reads the
//! attachments back, and a broken sink must never change a test outcome.

mod sink;

use sink::{DirectorySink, TracingSink};

#[cfg(test)]
pub use sink::MemorySink;

use anyhow::Result;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// A named text record attached to the report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// Scenario the attachment belongs to, if any
    pub scope: Option<String>,
    pub name: String,
    pub body: String,
}

/// Destination for diagnostic attachments and step markers
pub trait ReportSink: Send + Sync {
    /// Store a text attachment
    fn attach(&self, attachment: &Attachment) -> Result<()>;

    /// Record the start of a named step
    fn begin_step(&self, scope: Option<&str>, title: &str) -> Result<()> {
        let _ = (scope, title);
        Ok(())
    }
}

/// Cloneable handle to a report sink
///
/// Clones share both the sink and the current scenario scope, so the runner
/// can switch scopes while the HTTP client keeps attaching through its own
/// clone.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn ReportSink>,
    scope: Arc<Mutex<Option<String>>>,
}

impl Reporter {
    /// Create a reporter backed by the given sink
    pub fn new(sink: impl ReportSink + 'static) -> Self {
        Self::from_arc(Arc::new(sink))
    }

    /// Create a reporter sharing an existing sink
    pub fn from_arc(sink: Arc<dyn ReportSink>) -> Self {
        Self {
            sink,
            scope: Arc::new(Mutex::new(None)),
        }
    }

    /// Reporter that only emits tracing events
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    /// Reporter writing attachments below `dir`, or tracing-only when `None`
    pub fn for_dir(dir: Option<PathBuf>) -> Result<Self> {
        match dir {
            Some(dir) => Ok(Self::new(DirectorySink::create(dir)?)),
            None => Ok(Self::tracing()),
        }
    }

    /// Current scenario scope
    pub fn scope(&self) -> Option<String> {
        self.lock_scope().clone()
    }

    /// Enter a scenario scope; the previous scope is restored when the guard drops
    pub fn enter_scope(&self, name: impl Into<String>) -> ScopeGuard {
        let previous = self.lock_scope().replace(name.into());
        ScopeGuard {
            scope: Arc::clone(&self.scope),
            previous,
        }
    }

    /// Attach a text record. Sink failures are logged and discarded.
    pub fn attach_text(&self, name: impl Into<String>, body: impl Into<String>) {
        let attachment = Attachment {
            scope: self.scope(),
            name: name.into(),
            body: body.into(),
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| self.sink.attach(&attachment)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Failed to attach report data '{}': {:#}", attachment.name, e),
            Err(_) => debug!("Report sink panicked while attaching '{}'", attachment.name),
        }
    }

    /// Mark the start of a step. Sink failures are logged and discarded.
    pub fn step(&self, title: &str) {
        let scope = self.scope();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.sink.begin_step(scope.as_deref(), title)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Failed to record step '{}': {:#}", title, e),
            Err(_) => debug!("Report sink panicked while recording step '{}'", title),
        }
    }

    fn lock_scope(&self) -> MutexGuard<'_, Option<String>> {
        self.scope.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::tracing()
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("scope", &self.scope())
            .finish_non_exhaustive()
    }
}

/// Guard that restores the previous report scope on drop
pub struct ScopeGuard {
    scope: Arc<Mutex<Option<String>>>,
    previous: Option<String>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let mut scope = self
            .scope
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *scope = self.previous.take();
    }
}
