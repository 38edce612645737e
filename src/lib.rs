//! Editor-field content generation through a credential-holding relay.
//!
//! [`trigger`] attaches controls to editor fields and collects prompts,
//! [`relay`] checks the session token and stored key and calls the
//! [`provider`], which talks to the upstream chat-completions API.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod paths;
pub mod provider;
pub mod relay;
pub mod sanitize;
pub mod session;
pub mod settings;
pub mod trigger;

pub use error::RelayError;
