//! Relay endpoint: the trusted hop between the editor and the provider.
//!
//! Every call runs the same fixed steps: check the action and session token,
//! read the stored key, call the provider once, and fold the outcome into an
//! [`Envelope`]. No state survives a call.

mod envelope;
pub mod server;

pub use envelope::{Envelope, EnvelopeData, RelayForm, ACTION};

use crate::config::ProviderConfig;
use crate::error::RelayError;
use crate::provider::{GenerationRequest, Provider};
use crate::sanitize::sanitize_text;
use crate::session::SessionGuard;
use crate::settings::CredentialSource;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fixed generation parameters applied to every prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationDefaults {
    pub model: String,
    pub system_instruction: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&ProviderConfig> for GenerationDefaults {
    fn from(cfg: &ProviderConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            system_instruction: cfg.system_instruction.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        }
    }
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self::from(&ProviderConfig::default())
    }
}

impl GenerationDefaults {
    pub fn request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            system_instruction: self.system_instruction.clone(),
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

pub struct RelayEndpoint {
    provider: Arc<dyn Provider + Send + Sync>,
    credentials: Arc<dyn CredentialSource>,
    guard: SessionGuard,
    defaults: GenerationDefaults,
}

impl RelayEndpoint {
    pub fn new(
        provider: Arc<dyn Provider + Send + Sync>,
        credentials: Arc<dyn CredentialSource>,
        guard: SessionGuard,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            provider,
            credentials,
            guard,
            defaults,
        }
    }

    /// Fresh token for a page load (or an in-process client).
    pub fn mint_token(&self) -> String {
        self.guard.mint(ACTION)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Run one relay call and wrap the outcome.
    pub async fn handle(&self, form: &RelayForm) -> Envelope {
        Envelope::from_result(self.process(form).await)
    }

    /// Run one relay call. Rejections (see [`RelayError::is_rejection`]) come
    /// back before the key is read or the provider is contacted.
    pub async fn process(&self, form: &RelayForm) -> Result<String, RelayError> {
        if form.action != ACTION {
            warn!(action = %form.action, "rejected relay call for unknown action");
            return Err(RelayError::UnknownAction {
                action: form.action.clone(),
            });
        }
        self.guard.verify(ACTION, &form.security)?;

        let credential = match self.credentials.credential() {
            Ok(Some(c)) => c,
            Ok(None) => {
                info!("relay call refused: no API key configured");
                return Err(RelayError::missing_key());
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "failed to read settings");
                return Err(RelayError::configuration("Failed to read settings. Check the server log."));
            }
        };

        let prompt = sanitize_text(&form.prompt);
        debug!(provider = self.provider.name(), prompt_len = prompt.len(), "relaying prompt");

        let result = self
            .provider
            .generate(self.defaults.request(prompt), &credential)
            .await;

        match &result {
            Ok(text) => info!(provider = self.provider.name(), content_len = text.len(), "generation succeeded"),
            Err(e) => warn!(provider = self.provider.name(), error = %e, "generation failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::StubProvider;
    use crate::settings::StaticCredential;
    use std::time::Duration;

    fn relay(provider: Arc<StubProvider>, key: Option<&str>) -> RelayEndpoint {
        RelayEndpoint::new(
            provider,
            Arc::new(StaticCredential::new(key)),
            SessionGuard::new("secret", Duration::from_secs(3600)),
            GenerationDefaults::default(),
        )
    }

    #[tokio::test]
    async fn bad_token_rejected_before_provider() {
        let stub = Arc::new(StubProvider::new());
        let r = relay(stub.clone(), Some("sk-test"));

        let err = r.process(&RelayForm::new("forged", "hi")).await.unwrap_err();
        assert_eq!(err, RelayError::Authorization);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_action_rejected() {
        let stub = Arc::new(StubProvider::new());
        let r = relay(stub.clone(), Some("sk-test"));
        let form = RelayForm {
            action: "heartbeat".to_string(),
            security: r.mint_token(),
            prompt: "hi".to_string(),
        };

        assert!(r.process(&form).await.unwrap_err().is_rejection());
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn missing_key_short_circuits() {
        let stub = Arc::new(StubProvider::new());
        let r = relay(stub.clone(), None);

        let env = r.handle(&RelayForm::new(r.mint_token(), "Write a tagline")).await;
        assert!(!env.success);
        assert!(env.message().unwrap().contains("API key not set"));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn prompt_is_sanitized_before_relay() {
        let stub = Arc::new(StubProvider::new());
        let r = relay(stub.clone(), Some("sk-test"));

        let env = r.handle(&RelayForm::new(r.mint_token(), "  <b>Write</b>\n a tagline ")).await;
        assert_eq!(env.content(), Some("[gpt-3.5-turbo] You said: Write a tagline"));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn provider_errors_become_failure_envelopes() {
        let stub = Arc::new(StubProvider::with_reply(Err(RelayError::UpstreamShape)));
        let r = relay(stub.clone(), Some("sk-test"));

        let env = r.handle(&RelayForm::new(r.mint_token(), "x")).await;
        assert_eq!(env, Envelope::failure("Invalid response structure."));
    }

    #[tokio::test]
    async fn same_prompt_same_envelope() {
        let stub = Arc::new(StubProvider::with_reply(Ok("Build faster.".to_string())));
        let r = relay(stub.clone(), Some("sk-test"));
        let form = RelayForm::new(r.mint_token(), "Write a tagline");

        let first = r.handle(&form).await;
        let second = r.handle(&form).await;
        assert_eq!(first, second);
        assert_eq!(first, Envelope::success("Build faster."));
        assert_eq!(stub.calls(), 2);
    }
}
