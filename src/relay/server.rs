use super::{Envelope, RelayEndpoint, RelayForm};
use crate::error::RelayError;
use anyhow::Context;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::header::HOST;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const RELAY_PATH: &str = "/relay";
pub const BOOTSTRAP_PATH: &str = "/bootstrap";

/// Page-load data handed to the trigger surface.
///
/// `relay_url` is absolute when the request carried a `Host` header and
/// otherwise the bare relay path, to be joined against the server URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bootstrap {
    pub relay_url: String,
    pub nonce: String,
}

#[derive(Clone)]
struct AppState {
    relay: Arc<RelayEndpoint>,
}

pub fn router(relay: Arc<RelayEndpoint>) -> Router {
    Router::new()
        .route(RELAY_PATH, post(relay_call))
        .route(BOOTSTRAP_PATH, get(bootstrap))
        .with_state(AppState { relay })
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: &str, relay: Arc<RelayEndpoint>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind relay listener: {addr}"))?;
    serve_on(listener, relay).await
}

pub async fn serve_on(listener: TcpListener, relay: Arc<RelayEndpoint>) -> anyhow::Result<()> {
    let local: SocketAddr = listener.local_addr().context("listener has no local address")?;
    tracing::info!(%local, provider = relay.provider_name(), "relay listening");

    axum::serve(listener, router(relay))
        .await
        .context("relay server failed")
}

async fn relay_call(
    State(state): State<AppState>,
    form: Result<Form<RelayForm>, FormRejection>,
) -> (StatusCode, Json<Envelope>) {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "malformed relay request");
            return (rejection.status(), Json(Envelope::failure("Malformed relay request.")));
        }
    };

    let result = state.relay.process(&form).await;
    let status = match &result {
        Err(RelayError::UnknownAction { .. }) => StatusCode::BAD_REQUEST,
        Err(RelayError::Authorization) => StatusCode::FORBIDDEN,
        _ => StatusCode::OK,
    };
    (status, Json(Envelope::from_result(result)))
}

async fn bootstrap(State(state): State<AppState>, headers: HeaderMap) -> Json<Bootstrap> {
    // The listen address may be a wildcard; the Host the client used is reachable.
    let relay_url = match headers.get(HOST).and_then(|h| h.to_str().ok()) {
        Some(host) if !host.is_empty() => format!("http://{host}{RELAY_PATH}"),
        _ => RELAY_PATH.to_string(),
    };
    Json(Bootstrap {
        relay_url,
        nonce: state.relay.mint_token(),
    })
}
