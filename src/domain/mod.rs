pub mod classification;
pub mod config;
pub mod error;
pub mod intent;
pub mod onboarding;
pub mod recording;
pub mod session;

pub use classification::ClassificationResult;
pub use config::{AppConfig, LoggingConfig, ServerConfig};
pub use error::DomainError;
pub use intent::{HelpOption, Intent};
pub use onboarding::{OnboardingProgress, OnboardingSnapshot, SAMPLES_REQUIRED};
pub use recording::{AtomicRecordingState, AudioBuffer, RecordingConfig, RecordingState};
pub use session::{Decision, Session, SessionSnapshot, View};
