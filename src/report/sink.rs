//! Report sink implementations

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use super::{Attachment, ReportSink};

/// Scope directory used for calls made outside any scenario
const SESSION_SCOPE: &str = "session";

/// Sink that emits attachments as debug-level tracing events
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn attach(&self, attachment: &Attachment) -> Result<()> {
        debug!(
            scope = attachment.scope.as_deref().unwrap_or(SESSION_SCOPE),
            "{}\n{}",
            attachment.name,
            attachment.body
        );
        Ok(())
    }

    fn begin_step(&self, scope: Option<&str>, title: &str) -> Result<()> {
        info!(scope = scope.unwrap_or(SESSION_SCOPE), "Step: {}", title);
        Ok(())
    }
}

/// Sink that keeps everything in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    attachments: std::sync::Mutex<Vec<Attachment>>,
    steps: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all attachments recorded so far
    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Snapshot of all step titles recorded so far
    pub fn steps(&self) -> Vec<String> {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
impl ReportSink for MemorySink {
    fn attach(&self, attachment: &Attachment) -> Result<()> {
        self.attachments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(attachment.clone());
        Ok(())
    }

    fn begin_step(&self, _scope: Option<&str>, title: &str) -> Result<()> {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(title.to_string());
        Ok(())
    }
}

/// Sink writing one text file per attachment
///
/// Layout: `<root>/<scope>/<NNN>-<name>.txt`, with step markers appended to
/// `<root>/<scope>/steps.log`.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    counter: AtomicUsize,
}

impl DirectorySink {
    /// Create the root directory if needed and return a sink writing into it
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create report directory: {}", root.display()))?;
        Ok(Self {
            root,
            counter: AtomicUsize::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_dir(&self, scope: Option<&str>) -> Result<PathBuf> {
        let dir = self.root.join(sanitize(scope.unwrap_or(SESSION_SCOPE)));
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        Ok(dir)
    }
}

impl ReportSink for DirectorySink {
    fn attach(&self, attachment: &Attachment) -> Result<()> {
        let dir = self.scope_dir(attachment.scope.as_deref())?;
        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let path = dir.join(format!("{:03}-{}.txt", seq, sanitize(&attachment.name)));

        fs::write(&path, &attachment.body)
            .with_context(|| format!("Failed to write attachment: {}", path.display()))?;
        Ok(())
    }

    fn begin_step(&self, scope: Option<&str>, title: &str) -> Result<()> {
        let path = self.scope_dir(scope)?.join("steps.log");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open step log: {}", path.display()))?;
        writeln!(file, "{} {}", Utc::now().to_rfc3339(), title)?;
        Ok(())
    }
}

/// Turn an arbitrary label into a safe file name component
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
        .collect();

    let mut collapsed = String::with_capacity(cleaned.len());
    for c in cleaned.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed.trim_matches('-');
    let truncated: String = trimmed.chars().take(80).collect();
    if truncated.is_empty() {
        "attachment".to_string()
    } else {
        truncated
    }
}
