use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::app::Recorder;
use crate::domain::{DomainError, Intent, OnboardingProgress, OnboardingSnapshot};
use crate::ports::OnboardingService;

/// Outcome of one accepted onboarding sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// The current intent still needs more samples.
    MoreSamplesNeeded { collected: u32 },
    /// Quota reached; the walk advanced to the next intent.
    IntentAdvanced { next: Intent },
    /// The last intent reached quota and the server acknowledged completion.
    Completed,
}

/// Drives the fixed-order onboarding walk: record a sample for the current
/// intent, submit it, and advance on the server-reported count.
///
/// Any failure leaves progress untouched so the same step can simply be
/// retried; the completion call is retried the same way until the server
/// acknowledges it, and fires its `Completed` signal exactly once.
pub struct OnboardingCollector {
    service: Arc<dyn OnboardingService>,
    recorder: Arc<Recorder>,
    progress: Mutex<OnboardingProgress>,
}

impl OnboardingCollector {
    pub fn new(service: Arc<dyn OnboardingService>, recorder: Arc<Recorder>) -> Self {
        Self {
            service,
            recorder,
            progress: Mutex::new(OnboardingProgress::new()),
        }
    }

    /// Discard all progress and begin a fresh run with a new user id.
    pub fn restart(&self) {
        *self.progress.lock() = OnboardingProgress::new();
    }

    pub fn snapshot(&self) -> OnboardingSnapshot {
        self.progress.lock().snapshot()
    }

    /// Record and submit one sample for the current intent.
    pub async fn collect_sample(&self) -> Result<SampleOutcome, DomainError> {
        let (user_id, intent) = {
            let progress = self.progress.lock();
            let intent = progress
                .current_intent()
                .cloned()
                .ok_or(DomainError::OnboardingFinished)?;
            (progress.user_id().to_string(), intent)
        };

        let audio = self.recorder.capture().await?;
        let count = self.service.add_sample(&user_id, &intent, &audio).await?;

        let ready_to_complete = self.progress.lock().record_server_count(count);
        if ready_to_complete {
            if let Err(e) = self.service.complete(&user_id).await {
                // Quota stays met; the next accepted sample retries completion.
                warn!(user_id = %user_id, error = %e, "Onboarding completion call failed");
                return Err(e);
            }
            self.progress.lock().mark_completed();
            info!(user_id = %user_id, "Onboarding run completed");
            return Ok(SampleOutcome::Completed);
        }

        let progress = self.progress.lock();
        match progress.current_intent() {
            Some(next) if *next != intent => {
                info!(intent = %intent, next = %next, "Intent quota reached, advancing");
                Ok(SampleOutcome::IntentAdvanced { next: next.clone() })
            }
            _ => Ok(SampleOutcome::MoreSamplesNeeded { collected: count }),
        }
    }
}
