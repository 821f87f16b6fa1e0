use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::Intent;

/// Accepted samples required per intent before the flow advances.
pub const SAMPLES_REQUIRED: u32 = 3;

/// The fixed, ordered walk of intents trained during onboarding.
pub fn intent_sequence() -> [Intent; 4] {
    [Intent::Yes, Intent::No, Intent::Help, Intent::Emergency]
}

/// Progress of one onboarding run.
///
/// Per-intent counts are updated only from the server-reported total; the
/// server is the source of truth so duplicate or partial submissions cannot
/// corrupt local progress. `current_index` advances only when the current
/// intent's count reaches [`SAMPLES_REQUIRED`], and completion fires only
/// after the last intent in the sequence reaches quota.
#[derive(Debug, Clone)]
pub struct OnboardingProgress {
    user_id: String,
    sequence: [Intent; 4],
    current_index: usize,
    samples: HashMap<Intent, u32>,
    completed: bool,
}

impl OnboardingProgress {
    /// Start a fresh run with a newly generated user id.
    pub fn new() -> Self {
        Self::with_user_id(format!("user_{}", Uuid::new_v4()))
    }

    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            sequence: intent_sequence(),
            current_index: 0,
            samples: HashMap::new(),
            completed: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The intent currently being trained, or None once past the sequence.
    pub fn current_intent(&self) -> Option<&Intent> {
        if self.completed {
            return None;
        }
        self.sequence.get(self.current_index)
    }

    /// Zero-based index of the current step.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Total number of steps in the sequence.
    pub fn total_steps(&self) -> usize {
        self.sequence.len()
    }

    pub fn samples_for(&self, intent: &Intent) -> u32 {
        self.samples.get(intent).copied().unwrap_or(0)
    }

    /// Record the server-reported sample total for the current intent and
    /// advance if the quota is met.
    ///
    /// Returns true if the whole sequence is now at quota (the run is ready
    /// for the completion call). Advancement happens at most once per intent
    /// because the index moves past it the first time quota is reached.
    pub fn record_server_count(&mut self, count: u32) -> bool {
        let Some(intent) = self.current_intent().cloned() else {
            return self.completed;
        };

        self.samples.insert(intent, count);

        if count >= SAMPLES_REQUIRED {
            if self.current_index + 1 < self.sequence.len() {
                self.current_index += 1;
            } else {
                return true;
            }
        }
        false
    }

    /// Whether every intent in the sequence has reached quota.
    pub fn quota_met(&self) -> bool {
        self.sequence
            .iter()
            .all(|intent| self.samples_for(intent) >= SAMPLES_REQUIRED)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Mark the run completed. Called only after the server acknowledged the
    /// completion call, so a failed call leaves the run retryable.
    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    pub fn snapshot(&self) -> OnboardingSnapshot {
        OnboardingSnapshot {
            user_id: self.user_id.clone(),
            current_step: self.current_index + 1,
            total_steps: self.sequence.len(),
            current_intent: self.current_intent().map(Intent::label),
            samples_collected: self
                .current_intent()
                .map(|intent| self.samples_for(intent))
                .unwrap_or(SAMPLES_REQUIRED),
            samples_required: SAMPLES_REQUIRED,
            completed: self.completed,
        }
    }
}

impl Default for OnboardingProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of onboarding progress for a UI layer.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingSnapshot {
    pub user_id: String,
    pub current_step: usize,
    pub total_steps: usize,
    pub current_intent: Option<String>,
    pub samples_collected: u32,
    pub samples_required: u32,
    pub completed: bool,
}
