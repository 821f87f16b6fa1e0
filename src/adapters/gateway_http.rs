use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::{
    AudioBuffer, ClassificationResult, DomainError, Intent, ServerConfig,
};
use crate::ports::{IntentGateway, OnboardingService};

/// Multipart field name expected by the backend for audio uploads.
const AUDIO_PART_NAME: &str = "audio_file";

/// Wire shape of both classification endpoints.
#[derive(Debug, Deserialize)]
struct IntentResponse {
    intent: String,
    confidence: f32,
    requires_confirmation: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct ConfirmRequest<'a> {
    intent: &'a str,
    confirmed: bool,
}

#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    action_taken: bool,
}

#[derive(Debug, Deserialize)]
struct AddSampleResponse {
    samples_collected: u32,
}

/// reqwest-based gateway to the classification backend.
///
/// All six REST endpoints share one client and one error-mapping discipline:
/// transport failure or non-success status is terminal for the attempt and
/// surfaces as a domain error, never as a hung "processing" state.
pub struct HttpIntentGateway {
    client: Client,
    base_url: Url,
}

impl HttpIntentGateway {
    pub fn new(config: &ServerConfig) -> Result<Self, DomainError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| DomainError::Config(format!("Invalid backend base URL: {}", e)))?;

        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(format!("ClearSay/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(base_url = %base_url, "Intent gateway initialized");

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DomainError> {
        self.base_url
            .join(path)
            .map_err(|e| DomainError::Config(format!("Invalid endpoint path {}: {}", path, e)))
    }

    async fn classify_at(
        &self,
        path: &str,
        audio: &AudioBuffer,
    ) -> Result<ClassificationResult, DomainError> {
        let url = self.endpoint(path)?;
        let form = audio_form(audio)?;

        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| DomainError::ClassificationUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::ClassificationUnavailable(format!(
                "HTTP {} for {}",
                status, url
            )));
        }

        let body: IntentResponse = response
            .json()
            .await
            .map_err(|e| DomainError::ClassificationUnavailable(e.to_string()))?;

        debug!(
            intent = %body.intent,
            confidence = body.confidence,
            requires_confirmation = body.requires_confirmation,
            "Classification result"
        );

        Ok(ClassificationResult::new(
            Intent::from_label(&body.intent),
            body.confidence,
            body.requires_confirmation,
            body.message,
        ))
    }
}

#[async_trait]
impl IntentGateway for HttpIntentGateway {
    async fn classify_intent(
        &self,
        audio: &AudioBuffer,
    ) -> Result<ClassificationResult, DomainError> {
        self.classify_at("/api/classify-intent", audio).await
    }

    async fn classify_help_option(
        &self,
        audio: &AudioBuffer,
    ) -> Result<ClassificationResult, DomainError> {
        self.classify_at("/api/classify-help-option", audio).await
    }

    async fn confirm_intent(&self, intent: &Intent) -> Result<bool, DomainError> {
        let url = self.endpoint("/api/confirm-intent")?;
        let label = intent.label();

        let response = self
            .client
            .post(url.clone())
            .json(&ConfirmRequest {
                intent: &label,
                confirmed: true,
            })
            .send()
            .await
            .map_err(|e| DomainError::ActionCommitFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::ActionCommitFailed(format!(
                "HTTP {} for {}",
                status, url
            )));
        }

        let body: ConfirmResponse = response
            .json()
            .await
            .map_err(|e| DomainError::ActionCommitFailed(e.to_string()))?;

        info!(intent = %label, action_taken = body.action_taken, "Intent confirmation committed");
        Ok(body.action_taken)
    }

    async fn send_emergency_alert(&self) -> Result<(), DomainError> {
        let url = self.endpoint("/api/emergency-alert")?;

        let response = self
            .client
            .post(url.clone())
            .send()
            .await
            .map_err(|e| DomainError::ClassificationUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::ClassificationUnavailable(format!(
                "HTTP {} for {}",
                status, url
            )));
        }

        warn!("Emergency alert delivered to backend");
        Ok(())
    }
}

#[async_trait]
impl OnboardingService for HttpIntentGateway {
    async fn add_sample(
        &self,
        user_id: &str,
        intent: &Intent,
        audio: &AudioBuffer,
    ) -> Result<u32, DomainError> {
        let mut url = self.endpoint("/api/onboarding/add-sample")?;
        url.query_pairs_mut()
            .append_pair("user_id", user_id)
            .append_pair("intent", &intent.label());

        let form = audio_form(audio).map_err(|e| DomainError::OnboardingStepFailed(e.to_string()))?;

        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| DomainError::OnboardingStepFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::OnboardingStepFailed(format!(
                "HTTP {} for {}",
                status, url
            )));
        }

        let body: AddSampleResponse = response
            .json()
            .await
            .map_err(|e| DomainError::OnboardingStepFailed(e.to_string()))?;

        debug!(
            user_id = %user_id,
            intent = %intent,
            samples_collected = body.samples_collected,
            "Onboarding sample accepted"
        );
        Ok(body.samples_collected)
    }

    async fn complete(&self, user_id: &str) -> Result<(), DomainError> {
        let mut url = self.endpoint("/api/onboarding/complete")?;
        url.query_pairs_mut().append_pair("user_id", user_id);

        let response = self
            .client
            .post(url.clone())
            .send()
            .await
            .map_err(|e| DomainError::OnboardingStepFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::OnboardingStepFailed(format!(
                "HTTP {} for {}",
                status, url
            )));
        }

        info!(user_id = %user_id, "Onboarding completed on server");
        Ok(())
    }
}

/// Build the multipart form carrying one finalized utterance as a WAV file.
fn audio_form(audio: &AudioBuffer) -> Result<Form, DomainError> {
    let bytes = encode_wav(audio)?;
    let part = Part::bytes(bytes)
        .file_name("audio.wav")
        .mime_str("audio/wav")
        .map_err(|e| DomainError::Serialization(e.to_string()))?;
    Ok(Form::new().part(AUDIO_PART_NAME, part))
}

/// Encode PCM samples as an in-memory 16-bit mono WAV.
fn encode_wav(audio: &AudioBuffer) -> Result<Vec<u8>, DomainError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| DomainError::Serialization(e.to_string()))?;
        for &sample in audio.samples() {
            writer
                .write_sample(sample)
                .map_err(|e| DomainError::Serialization(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| DomainError::Serialization(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
