use serde::{Deserialize, Serialize};

/// Configuration for a recorder session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Sample rate the finalized clip is encoded at (speech models expect 16kHz)
    pub sample_rate: u32,

    /// Number of audio channels in the finalized clip (1 = mono)
    pub channels: u16,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            sample_rate: 16000,
            channels: 1,
        }
    }
}
