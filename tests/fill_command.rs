use fieldgen::app::{self, FillReport};
use fieldgen::config::Config;
use fieldgen::relay::server::serve_on;
use fieldgen::settings::{CredentialSource, StaticCredential};
use fieldgen::trigger::{Document, Field, Notifier, PromptSource};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Answers by field id; unknown fields are cancelled.
struct Script {
    answers: HashMap<&'static str, Option<&'static str>>,
    asked: Vec<String>,
}

impl Script {
    fn new(answers: &[(&'static str, Option<&'static str>)]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }
}

impl PromptSource for Script {
    fn ask(&mut self, field: &Field, _message: &str) -> Option<String> {
        self.asked.push(field.id.clone());
        self.answers.get(field.id.as_str()).copied().flatten().map(str::to_string)
    }
}

#[derive(Default)]
struct Alerts(Vec<String>);

impl Notifier for Alerts {
    fn alert(&mut self, message: &str) {
        self.0.push(message.to_string());
    }
}

fn stub_config() -> Config {
    let mut cfg = Config::default();
    cfg.provider.name = "stub".to_string();
    cfg
}

fn with_key() -> Arc<dyn CredentialSource> {
    Arc::new(StaticCredential::new(Some("sk-test")))
}

fn no_key() -> Arc<dyn CredentialSource> {
    Arc::new(StaticCredential::new(None))
}

fn write_page(dir: &Path) -> PathBuf {
    let page = dir.join("page.json");
    let doc = json!({
        "fields": [
            {"id": "title", "tag": "input", "class": ["elementor-control-title"], "value": "Untitled"},
            {"id": "tagline", "tag": "input", "type": "text", "value": ""},
            {"id": "body", "tag": "textarea", "value": "Draft body text."},
            {"id": "publish", "tag": "input", "type": "checkbox", "value": "on"}
        ]
    });
    std::fs::write(&page, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
    page
}

// cmd_fill prompts inside block_in_place, which needs the multi-threaded runtime.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn in_process_fill_saves_only_what_was_generated() {
    let dir = tempfile::tempdir().unwrap();
    let page = write_page(dir.path());

    let mut prompts = Script::new(&[("title", Some("Write a title")), ("tagline", None), ("body", Some(""))]);
    let mut alerts = Alerts::default();
    let report = app::cmd_fill(&stub_config(), with_key(), &page, None, &mut prompts, &mut alerts)
        .await
        .unwrap();

    assert_eq!(report, FillReport { filled: 1, failed: 0, aborted: 2 });
    assert_eq!(prompts.asked, vec!["body", "tagline", "title"]);
    assert!(alerts.0.is_empty());

    let saved = Document::load(&page).unwrap();
    assert_eq!(saved.field("title").unwrap().value, "[gpt-3.5-turbo] You said: Write a title");
    assert_eq!(saved.field("tagline").unwrap().value, "");
    assert_eq!(saved.field("body").unwrap().value, "Draft body text.");
    assert_eq!(saved.field("publish").unwrap().value, "on");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nothing_filled_leaves_the_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let page = write_page(dir.path());
    let before = std::fs::read(&page).unwrap();

    let mut prompts = Script::new(&[("tagline", Some("Write a tagline"))]);
    let mut alerts = Alerts::default();
    let report = app::cmd_fill(&stub_config(), no_key(), &page, None, &mut prompts, &mut alerts)
        .await
        .unwrap();

    assert_eq!(report, FillReport { filled: 0, failed: 1, aborted: 2 });
    assert_eq!(alerts.0.len(), 1);
    assert!(alerts.0[0].starts_with("Error: API key not set"), "{:?}", alerts.0);
    assert_eq!(std::fs::read(&page).unwrap(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_url_routes_through_the_running_relay() {
    let cfg = stub_config();
    // Only the server holds a key; the in-process path would fail.
    let relay = app::build_relay(&cfg, with_key()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(serve_on(listener, relay));

    let dir = tempfile::tempdir().unwrap();
    let page = write_page(dir.path());

    let mut prompts = Script::new(&[("tagline", Some("Write a tagline"))]);
    let mut alerts = Alerts::default();
    let report = app::cmd_fill(&cfg, no_key(), &page, Some(&base), &mut prompts, &mut alerts)
        .await
        .unwrap();

    assert_eq!(report, FillReport { filled: 1, failed: 0, aborted: 2 });
    assert!(alerts.0.is_empty(), "{:?}", alerts.0);
    let saved = Document::load(&page).unwrap();
    assert_eq!(saved.field("tagline").unwrap().value, "[gpt-3.5-turbo] You said: Write a tagline");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn later_fields_are_prompted_while_earlier_requests_run() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "Generated."}}]}))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(2)
        .mount(&upstream)
        .await;

    let mut cfg = Config::default();
    cfg.provider.base_url = format!("{}/v1/", upstream.uri());

    let dir = tempfile::tempdir().unwrap();
    let page = write_page(dir.path());

    let mut prompts = Script::new(&[("title", Some("Write a title")), ("tagline", Some("Write a tagline"))]);
    let mut alerts = Alerts::default();
    let started = Instant::now();
    let report = app::cmd_fill(&cfg, with_key(), &page, None, &mut prompts, &mut alerts)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report, FillReport { filled: 2, failed: 0, aborted: 1 });
    assert!(elapsed < Duration::from_millis(750), "requests ran one after another: {elapsed:?}");

    let saved = Document::load(&page).unwrap();
    assert_eq!(saved.field("title").unwrap().value, "Generated.");
    assert_eq!(saved.field("tagline").unwrap().value, "Generated.");
}
