//! Transcript panel: the editable result buffer plus its copy and clear
//! actions. Each finished recording overwrites the buffer; the user may
//! edit it freely before copying.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How long the "copied" acknowledgment stays up
pub const COPY_ACK_DURATION: Duration = Duration::from_secs(2);

/// Destination for the copy action
pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> Result<()>;
}

/// System clipboard backed by arboard.
///
/// `arboard::Clipboard` is not `Send`, so the handle lives entirely on a
/// short-lived thread and the outcome comes back over a sync channel.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        let (result_tx, result_rx) = std::sync::mpsc::sync_channel::<Result<(), String>>(1);

        std::thread::spawn(move || match arboard::Clipboard::new() {
            Ok(mut clipboard) => match clipboard.set_text(&text) {
                Ok(()) => {
                    debug!("Copied {} chars to clipboard", text.len());
                    let _ = result_tx.send(Ok(()));

                    // On X11 the clipboard contents vanish with their owner;
                    // linger so another application can claim them.
                    #[cfg(target_os = "linux")]
                    std::thread::sleep(Duration::from_secs(5));
                }
                Err(e) => {
                    let _ = result_tx.send(Err(format!("Clipboard write failed: {}", e)));
                }
            },
            Err(e) => {
                let _ = result_tx.send(Err(format!("Clipboard access failed: {}", e)));
            }
        });

        result_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("Clipboard thread exited unexpectedly"))?
            .map_err(|e| anyhow::anyhow!(e))
    }
}

/// The display panel state
pub struct TranscriptPanel {
    text: String,
    clipboard: Arc<dyn Clipboard>,
    copied: Arc<AtomicBool>,
    copy_epoch: Arc<AtomicU64>,
}

impl TranscriptPanel {
    pub fn new(clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            text: String::new(),
            clipboard,
            copied: Arc::new(AtomicBool::new(false)),
            copy_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Overwrite the buffer (new results replace old ones)
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Reset the buffer to empty
    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Copy the buffer to the clipboard and raise the transient
    /// acknowledgment. Must run inside a tokio runtime (the revert timer is
    /// a spawned task). A repeated copy restarts the window.
    pub fn copy(&self) -> Result<()> {
        self.clipboard.set_text(&self.text)?;

        self.copied.store(true, Ordering::SeqCst);
        let epoch = self.copy_epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let copied = Arc::clone(&self.copied);
        let copy_epoch = Arc::clone(&self.copy_epoch);

        tokio::spawn(async move {
            tokio::time::sleep(COPY_ACK_DURATION).await;

            // A stale timer from an earlier copy must not clear the flag
            if copy_epoch.load(Ordering::SeqCst) == epoch {
                copied.store(false, Ordering::SeqCst);
            }
        });

        Ok(())
    }

    /// Whether the copy acknowledgment is currently showing
    pub fn is_copied(&self) -> bool {
        self.copied.load(Ordering::SeqCst)
    }
}
