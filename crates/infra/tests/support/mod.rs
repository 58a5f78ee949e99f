//! Shared fixtures for client integration tests

use std::path::Path;
use std::time::Duration;

use crucible_infra::api::{ClientSettings, ClientSettingsBuilder};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "abc";

/// Builder pointed at `api_url` with fast backoff and three retries.
pub fn settings_builder(api_url: &str, cache_dir: &Path) -> ClientSettingsBuilder {
    ClientSettings::builder()
        .api_url(api_url)
        .identifier("u")
        .key("k")
        .cache_directory(cache_dir)
        .max_retries(3)
        .backoff_unit(Duration::from_millis(1))
}

/// Build without consulting the process environment.
pub fn build(builder: ClientSettingsBuilder) -> ClientSettings {
    builder.build_with(|_| None).expect("settings should be valid")
}

/// Token endpoint that must be hit exactly `times` times.
pub fn token_mock(times: u64) -> Mock {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": TOKEN})))
        .expect(times)
        .named("token exchange")
}

/// Requests received on `route`, in arrival order.
pub async fn requests_to(server: &MockServer, route: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .into_iter()
        .filter(|request| request.url.path() == route)
        .collect()
}

/// A local port with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
