use super::{GenerationRequest, Provider};
use crate::error::RelayError;
use crate::settings::Credential;
use futures_core::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic offline provider. Echoes the prompt unless given a fixed reply.
#[derive(Debug, Default)]
pub struct StubProvider {
    reply: Option<Result<String, RelayError>>,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(reply: Result<String, RelayError>) -> Self {
        Self {
            reply: Some(reply),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn generate<'a>(
        &'a self,
        req: GenerationRequest,
        _credential: &'a Credential,
    ) -> BoxFuture<'a, Result<String, RelayError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = match &self.reply {
            Some(reply) => reply.clone(),
            None => Ok(format!("[{}] You said: {}", req.model, req.prompt)),
        };
        Box::pin(async move { out })
    }
}
