pub mod audio;
pub mod config;
pub mod gateway;
pub mod onboarding;

pub use audio::AudioInput;
pub use config::ConfigStore;
pub use gateway::IntentGateway;
pub use onboarding::OnboardingService;
