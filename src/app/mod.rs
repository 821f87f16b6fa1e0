pub mod controller;
pub mod onboarding;
pub mod recorder;

pub use controller::InteractionController;
pub use onboarding::{OnboardingCollector, SampleOutcome};
pub use recorder::Recorder;

use std::sync::Arc;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::{CpalAudioInput, HttpIntentGateway, TomlConfigStore};
use crate::domain::{AppConfig, DomainError};
use crate::infrastructure::init_logging;
use crate::ports::ConfigStore;

/// Wired-up application: configuration, logging, adapters, and the
/// interaction controller, ready for a UI layer to drive.
pub struct App {
    config: AppConfig,
    controller: Arc<InteractionController>,
    _log_guard: Option<WorkerGuard>,
}

impl App {
    /// Initialize the application against the real microphone and backend.
    pub fn new() -> Result<Self, DomainError> {
        let config_store = TomlConfigStore::new()?;
        let config = config_store.load()?;

        let log_guard = init_logging(
            &config_store.logs_dir(),
            &config.logging.level,
            config.logging.file_logging,
        )?;

        info!("ClearSay starting up");

        let gateway = Arc::new(HttpIntentGateway::new(&config.server)?);
        let input = Arc::new(CpalAudioInput::new(config.recording.clone())?);
        let recorder = Arc::new(Recorder::new(input, config.recording.clone()));

        let controller = Arc::new(InteractionController::new(
            Arc::clone(&gateway) as Arc<dyn crate::ports::IntentGateway>,
            gateway as Arc<dyn crate::ports::OnboardingService>,
            recorder,
        ));

        info!(base_url = %config.server.base_url, "App initialized");

        Ok(Self {
            config,
            controller,
            _log_guard: log_guard,
        })
    }

    /// The interaction controller driving the UI workflow.
    pub fn controller(&self) -> Arc<InteractionController> {
        Arc::clone(&self.controller)
    }

    /// The loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
