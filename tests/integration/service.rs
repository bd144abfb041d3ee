//! wiremock setup for the Ollama-compatible reasoning service.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const GENERATE_PATH: &str = "/api/generate";

/// A 200 generate answer carrying `text` in the `response` field.
pub fn answer(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "llama3.2:3b",
        "response": text,
        "done": true
    }))
}

/// Answers every generate call with `response`.
pub async fn mount_generate(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Fails the first `times` generate calls with `status`, ahead of any
/// answer mounted with [`mount_generate`].
pub async fn mount_failures(server: &MockServer, status: u16, times: u64) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(status))
        .up_to_n_times(times)
        .with_priority(1)
        .mount(server)
        .await;
}

/// Generate requests the server has seen, oldest first.
pub async fn generate_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == GENERATE_PATH)
        .collect()
}
