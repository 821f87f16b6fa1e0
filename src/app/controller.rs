use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::{OnboardingCollector, Recorder, SampleOutcome};
use crate::domain::{
    ClassificationResult, Decision, DomainError, Intent, OnboardingSnapshot, RecordingState,
    Session, SessionSnapshot, View,
};
use crate::ports::{IntentGateway, OnboardingService};

/// How long an action-feedback string stays up before the UI returns to Main.
const ACTION_FEEDBACK_WINDOW: Duration = Duration::from_secs(3);

/// How long the emergency overlay stays up. Never shortened or extended by
/// user action.
const EMERGENCY_WINDOW: Duration = Duration::from_secs(5);

/// Top-level orchestrator of the interaction workflow.
///
/// Owns the single [`Session`] state object; every mutation of the current
/// view, the pending decision, the emergency flag, and the feedback text goes
/// through here. Other components communicate results via return values, not
/// shared mutation. The session mutex is never held across an await.
pub struct InteractionController {
    session: Mutex<Session>,
    gateway: Arc<dyn IntentGateway>,
    recorder: Arc<Recorder>,
    collector: OnboardingCollector,
    action_timer: Mutex<Option<JoinHandle<()>>>,
    emergency_timer: Mutex<Option<JoinHandle<()>>>,
}

impl InteractionController {
    pub fn new(
        gateway: Arc<dyn IntentGateway>,
        onboarding: Arc<dyn OnboardingService>,
        recorder: Arc<Recorder>,
    ) -> Self {
        Self {
            session: Mutex::new(Session::new()),
            gateway,
            recorder: Arc::clone(&recorder),
            collector: OnboardingCollector::new(onboarding, recorder),
            action_timer: Mutex::new(None),
            emergency_timer: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().snapshot()
    }

    pub fn view(&self) -> View {
        self.session.lock().view()
    }

    pub fn feedback(&self) -> String {
        self.session.lock().feedback().to_string()
    }

    pub fn emergency_active(&self) -> bool {
        self.session.lock().emergency_active()
    }

    pub fn is_onboarded(&self) -> bool {
        self.session.lock().is_onboarded()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    pub fn recording_elapsed_secs(&self) -> u32 {
        self.recorder.elapsed_secs()
    }

    pub fn onboarding_snapshot(&self) -> OnboardingSnapshot {
        self.collector.snapshot()
    }

    /// Leave the welcome screen for the guided sample-collection walk.
    pub fn start_onboarding(&self) {
        self.collector.restart();
        self.session.lock().set_view(View::Onboarding);
        info!("Onboarding started");
    }

    /// Skip personalization entirely and go straight to the main menu.
    pub fn skip_onboarding(&self) {
        let mut session = self.session.lock();
        session.set_onboarded();
        session.set_view(View::Main);
        info!("Onboarding skipped");
    }

    /// Return to the main menu, clearing any transient feedback.
    pub fn back_to_main(&self) {
        let mut session = self.session.lock();
        session.set_view(View::Main);
        session.clear_feedback();
    }

    /// Manually stop the active recording, if any.
    pub fn stop_recording(&self) {
        self.recorder.stop();
    }

    /// Capture one utterance and route it through the classifier appropriate
    /// for the current view.
    ///
    /// Any failure resolves to a user-visible feedback message and returns
    /// the UI to its capture-ready state; the user is never left watching a
    /// stuck "processing" indicator.
    pub async fn listen(self: &Arc<Self>) -> Result<(), DomainError> {
        let view = self.view();
        if !matches!(view, View::Main | View::Help) {
            warn!(?view, "Listen ignored outside Main/Help");
            return Ok(());
        }

        let audio = match self.recorder.capture().await {
            Ok(audio) => audio,
            Err(e) => {
                if matches!(e, DomainError::DeviceUnavailable(_)) {
                    self.session
                        .lock()
                        .set_feedback("Could not access microphone. Please check permissions.");
                }
                error!(error = %e, "Capture failed");
                return Err(e);
            }
        };

        let result = match view {
            View::Help => self.gateway.classify_help_option(&audio).await,
            _ => self.gateway.classify_intent(&audio).await,
        };

        match result {
            Ok(result) => {
                self.handle_result(result);
                Ok(())
            }
            Err(e) => {
                self.session
                    .lock()
                    .set_feedback("Error processing audio. Please try again.");
                error!(error = %e, "Classification failed");
                Err(e)
            }
        }
    }

    /// Route one classification result into the next UI state.
    pub fn handle_result(self: &Arc<Self>, result: ClassificationResult) {
        info!(
            intent = %result.intent,
            confidence = result.confidence,
            requires_confirmation = result.requires_confirmation,
            "Intent detected"
        );
        self.session.lock().set_feedback(&result.message);

        match result.intent {
            Intent::Emergency => self.trigger_emergency(),
            Intent::Help => {
                self.session.lock().set_view(View::Help);
            }
            intent if result.requires_confirmation => {
                self.session.lock().set_pending_decision(Decision {
                    intent,
                    message: result.message,
                });
            }
            intent => self.execute_action(&intent),
        }
    }

    /// Resolve the pending confirmation challenge.
    ///
    /// Acceptance re-submits the intent for final commit; the action executes
    /// only on the server's `action_taken` acknowledgment. Rejection discards
    /// the decision and falls back to the main menu.
    pub async fn confirm(self: &Arc<Self>, confirmed: bool) -> Result<(), DomainError> {
        let pending = self.session.lock().take_pending_decision();

        if !confirmed {
            let mut session = self.session.lock();
            session.set_feedback("Please try again");
            session.set_view(View::Main);
            return Ok(());
        }

        let Some(decision) = pending else {
            // Nothing pending: superseded by an emergency or already resolved.
            return Ok(());
        };

        match self.gateway.confirm_intent(&decision.intent).await {
            Ok(true) => {
                self.execute_action(&decision.intent);
                Ok(())
            }
            Ok(false) => {
                self.session.lock().set_feedback("Please try again");
                warn!(intent = %decision.intent, "Server declined intent commit");
                Err(DomainError::ActionCommitFailed(
                    "server did not take the action".to_string(),
                ))
            }
            Err(e) => {
                self.session
                    .lock()
                    .set_feedback("Error confirming. Please try again.");
                error!(error = %e, "Intent commit failed");
                Err(e)
            }
        }
    }

    /// Record and submit one onboarding sample, finishing the flow when the
    /// last intent reaches quota.
    pub async fn record_onboarding_sample(self: &Arc<Self>) -> Result<SampleOutcome, DomainError> {
        match self.collector.collect_sample().await {
            Ok(SampleOutcome::Completed) => {
                let mut session = self.session.lock();
                session.set_onboarded();
                session.set_view(View::Main);
                session.set_feedback("Onboarding complete! 🎉");
                Ok(SampleOutcome::Completed)
            }
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.session
                    .lock()
                    .set_feedback("Error recording sample. Please try again.");
                error!(error = %e, "Onboarding sample failed");
                Err(e)
            }
        }
    }

    /// Execute a committed action: show its fixed feedback string, then
    /// auto-return to Main after the feedback window.
    fn execute_action(self: &Arc<Self>, intent: &Intent) {
        let feedback = intent.action_feedback();
        info!(intent = %intent, feedback = %feedback, "Executing action");
        self.session.lock().set_feedback(feedback);

        let ctrl = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ACTION_FEEDBACK_WINDOW).await;
            let mut session = ctrl.session.lock();
            session.set_view(View::Main);
            session.clear_feedback();
        });

        // Only released for cleanup when superseded; the timer itself is not
        // user-cancellable.
        if let Some(previous) = self.action_timer.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Enter the emergency overlay: preempts any pending decision, fires the
    /// caregiver alert as a detached best-effort task, and schedules the
    /// fixed auto-clear window.
    fn trigger_emergency(self: &Arc<Self>) {
        warn!("EMERGENCY intent detected, escalating");
        self.session.lock().enter_emergency();

        let gateway = Arc::clone(&self.gateway);
        tokio::spawn(async move {
            match gateway.send_emergency_alert().await {
                Ok(()) => info!("Emergency alert acknowledged by backend"),
                // The local escalation already happened; delivery failure is
                // diagnostics only.
                Err(e) => error!(error = %e, "Emergency alert delivery failed"),
            }
        });

        let ctrl = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(EMERGENCY_WINDOW).await;
            ctrl.session.lock().clear_emergency();
            info!("Emergency overlay cleared");
        });

        // A re-triggered emergency restarts the window; the stale timer is
        // released so it cannot clear the fresh overlay early.
        if let Some(previous) = self.emergency_timer.lock().replace(timer) {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use crate::domain::{AudioBuffer, RecordingConfig};
    use crate::ports::AudioInput;

    struct SilentInput;

    #[async_trait]
    impl AudioInput for SilentInput {
        async fn open(&self) -> Result<(), DomainError> {
            Ok(())
        }

        async fn close(&self) -> Result<AudioBuffer, DomainError> {
            let mut buffer = AudioBuffer::new(16_000);
            buffer.push_samples(&[0; 100]);
            Ok(buffer)
        }
    }

    #[derive(Default)]
    struct StubGateway {
        classify_reply: Mutex<Option<ClassificationResult>>,
        confirm_reply: Mutex<Option<Result<bool, DomainError>>>,
        confirm_calls: AtomicU32,
        alert_calls: AtomicU32,
        fail_alert: AtomicBool,
    }

    #[async_trait]
    impl IntentGateway for StubGateway {
        async fn classify_intent(
            &self,
            _audio: &AudioBuffer,
        ) -> Result<ClassificationResult, DomainError> {
            self.classify_reply
                .lock()
                .take()
                .ok_or_else(|| DomainError::ClassificationUnavailable("no reply".to_string()))
        }

        async fn classify_help_option(
            &self,
            audio: &AudioBuffer,
        ) -> Result<ClassificationResult, DomainError> {
            self.classify_intent(audio).await
        }

        async fn confirm_intent(&self, _intent: &Intent) -> Result<bool, DomainError> {
            self.confirm_calls.fetch_add(1, Ordering::SeqCst);
            self.confirm_reply
                .lock()
                .take()
                .unwrap_or(Ok(true))
        }

        async fn send_emergency_alert(&self) -> Result<(), DomainError> {
            self.alert_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_alert.load(Ordering::SeqCst) {
                return Err(DomainError::ClassificationUnavailable("down".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct NullOnboarding {
        counts: Mutex<std::collections::HashMap<Intent, u32>>,
    }

    #[async_trait]
    impl OnboardingService for NullOnboarding {
        async fn add_sample(
            &self,
            _user_id: &str,
            intent: &Intent,
            _audio: &AudioBuffer,
        ) -> Result<u32, DomainError> {
            let mut counts = self.counts.lock();
            let count = counts.entry(intent.clone()).or_insert(0);
            *count += 1;
            Ok(*count)
        }

        async fn complete(&self, _user_id: &str) -> Result<(), DomainError> {
            Ok(())
        }
    }

    fn controller(gateway: Arc<StubGateway>) -> Arc<InteractionController> {
        let recorder = Arc::new(Recorder::new(Arc::new(SilentInput), RecordingConfig::default()));
        Arc::new(InteractionController::new(
            gateway,
            Arc::new(NullOnboarding::default()),
            recorder,
        ))
    }

    fn result(label: &str, confidence: f32, requires_confirmation: bool, message: &str) -> ClassificationResult {
        ClassificationResult::new(
            Intent::from_label(label),
            confidence,
            requires_confirmation,
            message,
        )
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_welcome_transitions() {
        let ctrl = controller(Arc::new(StubGateway::default()));
        assert_eq!(ctrl.view(), View::Welcome);

        ctrl.start_onboarding();
        assert_eq!(ctrl.view(), View::Onboarding);

        ctrl.skip_onboarding();
        assert_eq!(ctrl.view(), View::Main);
        assert!(ctrl.is_onboarded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_confidence_yes_executes_directly() {
        let ctrl = controller(Arc::new(StubGateway::default()));
        ctrl.skip_onboarding();

        ctrl.handle_result(result("YES", 0.92, false, "Yes detected"));
        assert_eq!(ctrl.feedback(), "Confirmed: YES ✓");
        assert!(ctrl.snapshot().pending_decision.is_none());

        // Auto-return clears the feedback after 3 seconds.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(ctrl.view(), View::Main);
        assert!(ctrl.feedback().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_confidence_no_requires_confirmation_round_trip() {
        let gateway = Arc::new(StubGateway::default());
        let ctrl = controller(Arc::clone(&gateway));
        ctrl.skip_onboarding();

        ctrl.handle_result(result("NO", 0.4, true, "Did you mean NO?"));
        assert_eq!(ctrl.feedback(), "Did you mean NO?");
        let pending = ctrl.snapshot().pending_decision.unwrap();
        assert_eq!(pending.intent, Intent::No);

        *gateway.confirm_reply.lock() = Some(Ok(true));
        ctrl.confirm(true).await.unwrap();

        assert_eq!(gateway.confirm_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctrl.feedback(), "Confirmed: NO ✗");
        assert!(ctrl.snapshot().pending_decision.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_never_executes_and_returns_to_main() {
        let gateway = Arc::new(StubGateway::default());
        let ctrl = controller(Arc::clone(&gateway));
        ctrl.skip_onboarding();
        ctrl.handle_result(result("HELP", 0.95, false, "Opening help menu..."));
        assert_eq!(ctrl.view(), View::Help);

        ctrl.handle_result(result("2", 0.5, true, "You selected: Food"));
        assert!(ctrl.snapshot().pending_decision.is_some());

        ctrl.confirm(false).await.unwrap();

        assert_eq!(gateway.confirm_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctrl.feedback(), "Please try again");
        assert_eq!(ctrl.view(), View::Main);
        assert!(ctrl.snapshot().pending_decision.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_declined_is_an_error_with_feedback() {
        let gateway = Arc::new(StubGateway::default());
        let ctrl = controller(Arc::clone(&gateway));
        ctrl.skip_onboarding();

        ctrl.handle_result(result("YES", 0.6, true, "Did you mean YES?"));
        *gateway.confirm_reply.lock() = Some(Ok(false));

        let err = ctrl.confirm(true).await;
        assert!(matches!(err, Err(DomainError::ActionCommitFailed(_))));
        assert_eq!(ctrl.feedback(), "Please try again");
        assert!(ctrl.snapshot().pending_decision.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_help_intent_opens_help_menu() {
        let ctrl = controller(Arc::new(StubGateway::default()));
        ctrl.skip_onboarding();

        ctrl.handle_result(result("HELP", 0.9, false, "Opening help menu..."));
        assert_eq!(ctrl.view(), View::Help);
        assert!(ctrl.snapshot().pending_decision.is_none());
        assert_eq!(ctrl.feedback(), "Opening help menu...");
    }

    #[tokio::test(start_paused = true)]
    async fn test_emergency_preempts_pending_decision() {
        let gateway = Arc::new(StubGateway::default());
        let ctrl = controller(Arc::clone(&gateway));
        ctrl.skip_onboarding();

        ctrl.handle_result(result("NO", 0.4, true, "Did you mean NO?"));
        assert!(ctrl.snapshot().pending_decision.is_some());

        ctrl.handle_result(result("EMERGENCY", 0.99, false, "EMERGENCY - Alerting caregivers now!"));
        assert!(ctrl.emergency_active());
        assert!(ctrl.snapshot().pending_decision.is_none());

        settle().await;
        assert_eq!(gateway.alert_calls.load(Ordering::SeqCst), 1);

        // The overlay clears automatically after exactly its fixed window.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(ctrl.emergency_active());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!ctrl.emergency_active());
        assert_eq!(ctrl.view(), View::Main);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_failure_never_blocks_escalation() {
        let gateway = Arc::new(StubGateway::default());
        gateway.fail_alert.store(true, Ordering::SeqCst);
        let ctrl = controller(Arc::clone(&gateway));
        ctrl.skip_onboarding();

        ctrl.handle_result(result("EMERGENCY", 0.99, false, "EMERGENCY"));
        settle().await;

        assert_eq!(gateway.alert_calls.load(Ordering::SeqCst), 1);
        assert!(ctrl.emergency_active());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!ctrl.emergency_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_classifies_per_view() {
        let gateway = Arc::new(StubGateway::default());
        let ctrl = controller(Arc::clone(&gateway));
        ctrl.skip_onboarding();

        *gateway.classify_reply.lock() = Some(result("YES", 0.92, false, "Yes detected"));
        ctrl.listen().await.unwrap();
        assert_eq!(ctrl.feedback(), "Confirmed: YES ✓");
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_failure_reports_and_recovers() {
        let gateway = Arc::new(StubGateway::default());
        let ctrl = controller(Arc::clone(&gateway));
        ctrl.skip_onboarding();

        // No scripted reply: the classify call fails.
        let err = ctrl.listen().await;
        assert!(matches!(err, Err(DomainError::ClassificationUnavailable(_))));
        assert_eq!(ctrl.feedback(), "Error processing audio. Please try again.");
        assert_eq!(ctrl.view(), View::Main);
        assert_eq!(ctrl.recording_state(), RecordingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_ignored_on_welcome() {
        let ctrl = controller(Arc::new(StubGateway::default()));
        ctrl.listen().await.unwrap();
        assert_eq!(ctrl.view(), View::Welcome);
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboarding_completion_flips_session() {
        let ctrl = controller(Arc::new(StubGateway::default()));
        ctrl.start_onboarding();

        // Four intents at three samples each.
        let mut last = SampleOutcome::MoreSamplesNeeded { collected: 0 };
        for _ in 0..12 {
            last = ctrl.record_onboarding_sample().await.unwrap();
        }

        assert_eq!(last, SampleOutcome::Completed);
        assert!(ctrl.is_onboarded());
        assert_eq!(ctrl.view(), View::Main);
        assert_eq!(ctrl.feedback(), "Onboarding complete! 🎉");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_label_uses_fallback_feedback() {
        let ctrl = controller(Arc::new(StubGateway::default()));
        ctrl.skip_onboarding();

        ctrl.handle_result(result("MAYBE", 0.9, false, "Intent detected"));
        assert_eq!(ctrl.feedback(), "Action: MAYBE");
    }
}
