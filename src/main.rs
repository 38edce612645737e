use anyhow::Context;
use clap::Parser;
use fieldgen::cli::{self, Command};
use fieldgen::trigger::terminal;
use fieldgen::{app, config, paths};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = cli::Args::parse();

    let dirs = paths::AppDirs::resolve()?;
    let mut cfg = config::Config::load_optional(dirs.config_file())?.unwrap_or_default();
    if let Some(p) = args.provider {
        cfg.provider.name = p;
    }
    if let Some(m) = args.model {
        cfg.provider.model = m;
    }
    tracing::debug!(?dirs, ?cfg, "resolved config");

    let settings = dirs.settings();

    match args.cmd {
        Command::Serve { listen } => {
            if let Some(l) = listen {
                cfg.relay.listen = l;
            }
            app::cmd_serve(&cfg, settings).await
        }
        Command::Settings { cmd } => app::cmd_settings(cmd, &settings),
        Command::Generate { prompt } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("No prompt provided. Try: fieldgen generate \"Write a tagline\"");
            }
            let content = app::cmd_generate(&cfg, settings, &prompt)
                .await
                .context("generation failed")?;
            println!("{content}");
            Ok(())
        }
        Command::Fill { document, server } => {
            let server = server.or_else(|| cfg.relay.server_url.clone());
            let report = app::cmd_fill(
                &cfg,
                Arc::new(settings),
                &document,
                server.as_deref(),
                &mut terminal::LinePrompt::stdio(),
                &mut terminal::StderrAlert,
            )
            .await?;
            tracing::info!(
                filled = report.filled,
                failed = report.failed,
                aborted = report.aborted,
                "fill finished"
            );
            Ok(())
        }
    }
}
