use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AI content generation for editor text fields
#[derive(Debug, Parser)]
#[command(name = "fieldgen")]
#[command(version)]
#[command(about = "AI content generation for editor text fields", long_about = None)]
pub struct Args {
    /// Provider (default: config provider.name or "openai")
    #[arg(long = "provider", global = true)]
    pub provider: Option<String>,

    /// Model name (default: config provider.model)
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the relay HTTP server
    Serve {
        /// Listen address (default: config relay.listen)
        #[arg(long = "listen", value_name = "ADDR")]
        listen: Option<String>,
    },

    /// Manage the stored provider API key
    Settings {
        #[command(subcommand)]
        cmd: SettingsCommand,
    },

    /// Generate content for a single prompt and print it
    Generate {
        /// Prompt text
        #[arg(value_name = "PROMPT", required = true)]
        prompt: Vec<String>,
    },

    /// Offer generation for each eligible field of a JSON document
    Fill {
        /// Document file ({"fields": [...]})
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Base URL of a running relay server (default: config relay.server_url, else in-process)
        #[arg(long = "server", value_name = "URL")]
        server: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Save the API key
    SetKey {
        /// API key
        key: String,
    },
    /// Remove the stored API key
    ClearKey,
    /// Show where the key is stored and whether it is set
    Show,
}
