use serde::{Deserialize, Serialize};

use crate::domain::Intent;

/// The view the UI is currently presenting.
///
/// `Welcome` is the initial view; it is reachable only before the first
/// onboarding completion or an explicit skip. There is no terminal view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    Welcome,
    Main,
    Help,
    Onboarding,
}

/// A decision awaiting user confirmation.
///
/// Created when a classification result arrives with
/// `requires_confirmation = true`; destroyed when confirmed, rejected, or
/// superseded by an emergency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub intent: Intent,
    pub message: String,
}

/// Process-wide interaction session state.
///
/// Owned exclusively by the interaction controller; all other components
/// communicate results through it via controller operations, never by direct
/// mutation.
///
/// Invariant: at most one of {pending decision set, emergency active} holds
/// at a time. Emergency always wins and clears any pending decision.
#[derive(Debug, Clone)]
pub struct Session {
    current_view: View,
    is_onboarded: bool,
    pending_decision: Option<Decision>,
    emergency_active: bool,
    feedback: String,
}

impl Session {
    pub fn new() -> Self {
        Self {
            current_view: View::Welcome,
            is_onboarded: false,
            pending_decision: None,
            emergency_active: false,
            feedback: String::new(),
        }
    }

    pub fn view(&self) -> View {
        self.current_view
    }

    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    pub fn is_onboarded(&self) -> bool {
        self.is_onboarded
    }

    pub fn set_onboarded(&mut self) {
        self.is_onboarded = true;
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn set_feedback(&mut self, feedback: impl Into<String>) {
        self.feedback = feedback.into();
    }

    pub fn clear_feedback(&mut self) {
        self.feedback.clear();
    }

    pub fn pending_decision(&self) -> Option<&Decision> {
        self.pending_decision.as_ref()
    }

    /// Park a decision for confirmation. Rejected while an emergency is
    /// active, upholding the session invariant.
    pub fn set_pending_decision(&mut self, decision: Decision) {
        if self.emergency_active {
            return;
        }
        self.pending_decision = Some(decision);
    }

    /// Remove and return the pending decision, if any.
    pub fn take_pending_decision(&mut self) -> Option<Decision> {
        self.pending_decision.take()
    }

    pub fn emergency_active(&self) -> bool {
        self.emergency_active
    }

    /// Enter the emergency overlay, discarding any pending decision.
    pub fn enter_emergency(&mut self) {
        self.pending_decision = None;
        self.emergency_active = true;
    }

    /// Clear the emergency overlay and return to the main view.
    pub fn clear_emergency(&mut self) {
        self.emergency_active = false;
        self.current_view = View::Main;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_view: self.current_view,
            is_onboarded: self.is_onboarded,
            pending_decision: self.pending_decision.clone(),
            emergency_active: self.emergency_active,
            feedback: self.feedback.clone(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of the session state for a UI layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub current_view: View,
    pub is_onboarded: bool,
    pub pending_decision: Option<Decision>,
    pub emergency_active: bool,
    pub feedback: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision() -> Decision {
        Decision {
            intent: Intent::No,
            message: "Did you mean NO?".to_string(),
        }
    }

    #[test]
    fn test_initial_state() {
        let session = Session::new();
        assert_eq!(session.view(), View::Welcome);
        assert!(!session.is_onboarded());
        assert!(session.pending_decision().is_none());
        assert!(!session.emergency_active());
        assert!(session.feedback().is_empty());
    }

    #[test]
    fn test_emergency_discards_pending_decision() {
        let mut session = Session::new();
        session.set_pending_decision(decision());
        assert!(session.pending_decision().is_some());

        session.enter_emergency();
        assert!(session.emergency_active());
        assert!(session.pending_decision().is_none());
    }

    #[test]
    fn test_no_pending_decision_while_emergency_active() {
        let mut session = Session::new();
        session.enter_emergency();

        session.set_pending_decision(decision());
        assert!(session.pending_decision().is_none());
    }

    #[test]
    fn test_clear_emergency_returns_to_main() {
        let mut session = Session::new();
        session.set_view(View::Help);
        session.enter_emergency();

        session.clear_emergency();
        assert!(!session.emergency_active());
        assert_eq!(session.view(), View::Main);
    }

    #[test]
    fn test_take_pending_decision() {
        let mut session = Session::new();
        session.set_pending_decision(decision());

        let taken = session.take_pending_decision();
        assert_eq!(taken, Some(decision()));
        assert!(session.take_pending_decision().is_none());
    }
}
