use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a recorder session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderStatus {
    /// Not recording
    Idle = 0,
    /// Actively buffering microphone audio
    Recording = 1,
    /// Recording finalized, upload in flight
    Processing = 2,
}

/// Lock-free cell holding a [`RecorderStatus`] shared across tasks
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new(status: RecorderStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub(crate) fn load(&self) -> RecorderStatus {
        match self.0.load(Ordering::SeqCst) {
            0 => RecorderStatus::Idle,
            1 => RecorderStatus::Recording,
            _ => RecorderStatus::Processing,
        }
    }

    pub(crate) fn store(&self, status: RecorderStatus) {
        self.0.store(status as u8, Ordering::SeqCst);
    }

    /// Store `next` only when the current value is `expected`; returns
    /// whether the swap happened.
    pub(crate) fn transition(&self, expected: RecorderStatus, next: RecorderStatus) -> bool {
        self.0
            .compare_exchange(
                expected as u8,
                next as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

/// Statistics about a recorder session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub status: RecorderStatus,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Session age in seconds
    pub duration_secs: f64,

    /// Number of audio frames buffered during the last recording
    pub frames_captured: usize,
}
