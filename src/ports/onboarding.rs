use async_trait::async_trait;

use crate::domain::{AudioBuffer, DomainError, Intent};

/// Port for the server-side personalization service used during onboarding.
#[async_trait]
pub trait OnboardingService: Send + Sync {
    /// Submit one voice sample for an intent.
    ///
    /// Returns the server-reported total of samples collected for that
    /// intent. The caller treats this total, not a local increment, as the
    /// source of truth.
    async fn add_sample(
        &self,
        user_id: &str,
        intent: &Intent,
        audio: &AudioBuffer,
    ) -> Result<u32, DomainError>;

    /// Finish the onboarding run and trigger personalized-model training.
    async fn complete(&self, user_id: &str) -> Result<(), DomainError>;
}
