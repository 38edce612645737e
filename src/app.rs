use crate::cli::SettingsCommand;
use crate::config::{Config, ProviderConfig};
use crate::provider::{self, Provider};
use crate::relay::{self, GenerationDefaults, RelayEndpoint};
use crate::session::SessionGuard;
use crate::settings::{CredentialSource, FileSettings};
use crate::trigger::{
    self, Document, HttpRelayClient, LocalRelayClient, Notifier, Outcome, PromptSource, RelayClient, TriggerSurface,
};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub fn build_http(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}

pub fn build_provider(
    http: &reqwest::Client,
    cfg: &ProviderConfig,
) -> anyhow::Result<Arc<dyn Provider + Send + Sync>> {
    match cfg.name.as_str() {
        "openai" => {
            #[cfg(feature = "openai")]
            {
                let p = provider::openai::OpenAiProvider::new(http.clone(), &cfg.base_url)?;
                Ok(Arc::new(p))
            }
            #[cfg(not(feature = "openai"))]
            {
                let _ = http;
                anyhow::bail!("openai provider is not enabled in this build")
            }
        }
        "stub" => Ok(Arc::new(provider::stub::StubProvider::new())),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}

pub fn build_relay(
    cfg: &Config,
    credentials: Arc<dyn CredentialSource>,
) -> anyhow::Result<Arc<RelayEndpoint>> {
    let http = build_http(Duration::from_secs(cfg.provider.timeout_secs))?;
    let provider = build_provider(&http, &cfg.provider)?;
    Ok(Arc::new(RelayEndpoint::new(
        provider,
        credentials,
        SessionGuard::from_config(&cfg.session),
        GenerationDefaults::from(&cfg.provider),
    )))
}

pub async fn cmd_serve(cfg: &Config, settings: FileSettings) -> anyhow::Result<()> {
    let relay = build_relay(cfg, Arc::new(settings))?;
    relay::server::serve(&cfg.relay.listen, relay).await
}

pub fn cmd_settings(cmd: SettingsCommand, settings: &FileSettings) -> anyhow::Result<()> {
    match cmd {
        SettingsCommand::SetKey { key } => {
            let cred = settings.set_key(&key)?;
            println!("Saved API key {} to {}", cred.masked(), settings.path().display());
        }
        SettingsCommand::ClearKey => {
            if settings.clear_key()? {
                println!("Removed API key from {}", settings.path().display());
            } else {
                println!("(no API key stored)");
            }
        }
        SettingsCommand::Show => {
            println!("settings file: {}", settings.path().display());
            match settings.stored()? {
                Some(cred) => println!("stored API key: {}", cred.masked()),
                None => println!("stored API key: (not set)"),
            }
            if std::env::var_os(crate::settings::ENV_API_KEY).is_some() {
                println!("{} is set and overrides the stored key", crate::settings::ENV_API_KEY);
            }
        }
    }
    Ok(())
}

/// One prompt through an in-process relay. Returns the generated text.
pub async fn cmd_generate(cfg: &Config, settings: FileSettings, prompt: &str) -> anyhow::Result<String> {
    let relay = build_relay(cfg, Arc::new(settings))?;
    let client = LocalRelayClient::new(relay);
    let envelope = client.submit(prompt).await?;

    match envelope.content() {
        Some(content) => Ok(content.to_string()),
        None => anyhow::bail!("{}", envelope.message().unwrap_or("Unknown error")),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    pub filled: usize,
    pub failed: usize,
    pub aborted: usize,
}

/// Walk every control in `path`, asking `prompts` for each field, and save
/// the document if anything was filled.
///
/// Each request is spawned as soon as its prompt is in, so the next field is
/// prompted while earlier requests are still in flight. Without `server_url`
/// the relay runs in-process with `credentials`.
pub async fn cmd_fill(
    cfg: &Config,
    credentials: Arc<dyn CredentialSource>,
    path: &Path,
    server_url: Option<&str>,
    prompts: &mut dyn PromptSource,
    notifier: &mut dyn Notifier,
) -> anyhow::Result<FillReport> {
    let mut doc = Document::load(path)?;

    let relay: Arc<dyn RelayClient> = match server_url {
        Some(url) => {
            let http = build_http(Duration::from_secs(cfg.provider.timeout_secs))?;
            Arc::new(HttpRelayClient::bootstrap(http, url).await?)
        }
        None => Arc::new(LocalRelayClient::new(build_relay(cfg, credentials)?)),
    };

    let mut surface = TriggerSurface::new(cfg.trigger.title_class.clone());
    let attached = surface.scan(&doc);
    if attached == 0 {
        println!("(no eligible fields in {})", path.display());
        return Ok(FillReport::default());
    }

    let ids: Vec<String> = surface.registry().ids().map(str::to_string).collect();
    let mut report = FillReport::default();
    let mut in_flight = JoinSet::new();

    for id in &ids {
        let begun = tokio::task::block_in_place(|| surface.begin(&doc, id, &mut *prompts));
        match begun {
            Ok(pending) => {
                in_flight.spawn(trigger::dispatch(relay.clone(), pending));
            }
            Err(_) => report.aborted += 1,
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        let completion = joined.context("generation task panicked")?;
        let id = completion.field_id.clone();
        match surface.complete(&mut doc, completion, &mut *notifier) {
            Outcome::Filled => {
                report.filled += 1;
                println!("filled {id}");
            }
            Outcome::Failed => report.failed += 1,
            Outcome::Aborted | Outcome::Skipped => report.aborted += 1,
        }
    }

    if report.filled > 0 {
        doc.save(path)?;
    }
    Ok(report)
}
