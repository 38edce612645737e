use crate::error::RelayError;
use crate::settings::Credential;
use futures_core::future::BoxFuture;

/// One upstream generation call. Only `prompt` varies per request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Provider interface.
///
/// A single request/response exchange; the returned text is already trimmed.
pub trait Provider {
    fn name(&self) -> &'static str;

    fn generate<'a>(
        &'a self,
        req: GenerationRequest,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<String, RelayError>>;
}
