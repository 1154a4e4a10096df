pub mod backend;
pub mod capture;
pub mod clip;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use capture::CpalBackend;
pub use clip::AudioClip;
