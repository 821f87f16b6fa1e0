use async_trait::async_trait;

use crate::domain::{AudioBuffer, ClassificationResult, DomainError, Intent};

/// Port for the server-side classification engine.
///
/// The two classify operations are structurally identical single
/// request/response exchanges routed to different backend endpoints; the
/// model, feature extraction, and confidence scoring behind them are opaque
/// to the client.
#[async_trait]
pub trait IntentGateway: Send + Sync {
    /// Classify a finalized utterance against the primary vocabulary
    /// (YES, NO, HELP, EMERGENCY).
    async fn classify_intent(&self, audio: &AudioBuffer)
        -> Result<ClassificationResult, DomainError>;

    /// Classify a finalized utterance against the help-menu options (1-4).
    async fn classify_help_option(
        &self,
        audio: &AudioBuffer,
    ) -> Result<ClassificationResult, DomainError>;

    /// Re-submit a confirmed intent for final commit.
    ///
    /// Returns the server's `action_taken` acknowledgment; the action may
    /// only execute when this is true.
    async fn confirm_intent(&self, intent: &Intent) -> Result<bool, DomainError>;

    /// Best-effort caregiver alert. Failure never blocks or reverses the
    /// local emergency escalation.
    async fn send_emergency_alert(&self) -> Result<(), DomainError>;
}
