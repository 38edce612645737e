use crate::relay::server::{Bootstrap, BOOTSTRAP_PATH};
use crate::relay::{Envelope, RelayEndpoint, RelayForm};
use anyhow::{anyhow, Context};
use futures_core::future::BoxFuture;
use reqwest::Url;
use std::sync::Arc;

/// How the trigger surface reaches the relay.
///
/// `Err` means the call never produced an envelope (network failure or a
/// rejected request); the surface reports those generically.
pub trait RelayClient: Send + Sync {
    fn submit<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, anyhow::Result<Envelope>>;
}

/// Form POSTs to a running relay server.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    http: reqwest::Client,
    relay_url: Url,
    nonce: String,
}

impl HttpRelayClient {
    pub fn new(http: reqwest::Client, relay_url: &str, nonce: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            http,
            relay_url: Url::parse(relay_url).with_context(|| format!("invalid relay URL: {relay_url}"))?,
            nonce: nonce.into(),
        })
    }

    /// Fetch relay URL and token from `<server>/bootstrap`.
    pub async fn bootstrap(http: reqwest::Client, server_url: &str) -> anyhow::Result<Self> {
        let url = Url::parse(server_url)
            .and_then(|u| u.join(BOOTSTRAP_PATH))
            .with_context(|| format!("invalid server URL: {server_url}"))?;

        let resp = http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach relay server: {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("bootstrap failed: HTTP {status}"));
        }
        let boot: Bootstrap = resp.json().await.context("failed to parse bootstrap JSON")?;
        let relay_url = url
            .join(&boot.relay_url)
            .with_context(|| format!("invalid relay URL from bootstrap: {}", boot.relay_url))?;
        tracing::debug!(%relay_url, "bootstrapped relay client");
        Ok(Self {
            http,
            relay_url,
            nonce: boot.nonce,
        })
    }

    pub fn relay_url(&self) -> &Url {
        &self.relay_url
    }
}

impl RelayClient for HttpRelayClient {
    fn submit<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, anyhow::Result<Envelope>> {
        Box::pin(async move {
            let form = RelayForm::new(self.nonce.clone(), prompt);
            let resp = self
                .http
                .post(self.relay_url.clone())
                .form(&form)
                .send()
                .await
                .context("relay request failed")?;

            let status = resp.status();
            let body = resp.bytes().await.context("failed to read relay response")?;
            if !status.is_success() {
                return Err(anyhow!(
                    "relay returned HTTP {status}: {}",
                    String::from_utf8_lossy(&body)
                ));
            }
            serde_json::from_slice(&body).context("failed to parse relay envelope")
        })
    }
}

/// Calls a relay endpoint in the same process with a token minted up front.
pub struct LocalRelayClient {
    relay: Arc<RelayEndpoint>,
    nonce: String,
}

impl LocalRelayClient {
    pub fn new(relay: Arc<RelayEndpoint>) -> Self {
        let nonce = relay.mint_token();
        Self { relay, nonce }
    }
}

impl RelayClient for LocalRelayClient {
    fn submit<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, anyhow::Result<Envelope>> {
        Box::pin(async move {
            let result = self.relay.process(&RelayForm::new(self.nonce.clone(), prompt)).await;
            match result {
                Err(e) if e.is_rejection() => Err(anyhow!("relay rejected the request: {e}")),
                other => Ok(Envelope::from_result(other)),
            }
        })
    }
}
