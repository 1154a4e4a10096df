pub mod audio;
pub mod config;
pub mod http;
pub mod panel;
pub mod recorder;
pub mod translate;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioClip, AudioFrame, AudioSource,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use panel::{Clipboard, SystemClipboard, TranscriptPanel};
pub use recorder::{RecorderConfig, RecorderSession, RecorderStatus, SessionStats};
pub use translate::{GroqClient, RelayClient, Translate, TranslateError, Translation};
