//! ClearSay: an assistive speech-to-intent communication client.
//!
//! The device speaks for users with dysarthria: short utterances are
//! captured, classified server-side into a small intent vocabulary (YES, NO,
//! HELP, help sub-options, EMERGENCY), and routed through a
//! confirmation-gated, emergency-preemptive interaction workflow. A guided
//! onboarding walk collects voice samples per intent to personalize future
//! classification.
//!
//! The crate is organized hexagonally: pure state machines in [`domain`],
//! async seams in [`ports`], real microphone/HTTP/config implementations in
//! [`adapters`], and the orchestrating workflow in [`app`].

#![forbid(unsafe_code)]

pub mod adapters;
pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use app::{App, InteractionController, OnboardingCollector, Recorder, SampleOutcome};
pub use domain::{
    AppConfig, AudioBuffer, ClassificationResult, Decision, DomainError, HelpOption, Intent,
    OnboardingProgress, RecordingConfig, RecordingState, Session, SessionSnapshot, View,
};
