use serde::{Deserialize, Serialize};

use crate::domain::Intent;

/// Normalized result of one classification exchange.
///
/// Immutable once constructed. `confidence` is opaque to the client and is
/// carried for logging and display only; confirmation gating is decided
/// entirely by the server via `requires_confirmation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// The recognized intent.
    pub intent: Intent,
    /// Server-side confidence in [0, 1]. Never thresholded client-side.
    pub confidence: f32,
    /// Whether the server wants a yes/no challenge before acting.
    pub requires_confirmation: bool,
    /// Human-readable message describing the result.
    pub message: String,
}

impl ClassificationResult {
    pub fn new(
        intent: Intent,
        confidence: f32,
        requires_confirmation: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            intent,
            confidence,
            requires_confirmation,
            message: message.into(),
        }
    }
}
