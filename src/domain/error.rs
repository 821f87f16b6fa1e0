use thiserror::Error;

/// Domain-level errors for ClearSay.
///
/// Nothing here is fatal to the process: every variant resolves to a
/// user-visible feedback message and a known UI state.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Microphone unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("A recording is already in progress")]
    RecordingInProgress,

    #[error("Not currently recording")]
    NotRecording,

    #[error("Classification service unavailable: {0}")]
    ClassificationUnavailable(String),

    #[error("Action commit failed: {0}")]
    ActionCommitFailed(String),

    #[error("Onboarding step failed: {0}")]
    OnboardingStepFailed(String),

    #[error("Onboarding has already finished")]
    OnboardingFinished,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DomainError {
    fn from(err: toml::ser::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
