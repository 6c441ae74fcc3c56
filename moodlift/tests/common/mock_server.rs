use moodlift::{ApiClient, MemoryTokenStore, MoodClient, PlaylistFlow, Session};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use wiremock::matchers::{header, method, path_regex};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

#[derive(Deserialize)]
pub struct Fixture {
    #[serde(rename = "_meta")]
    pub meta: Option<FixtureMeta>,
    pub request: FixtureRequest,
    pub response: FixtureResponse,
}

#[derive(Deserialize)]
pub struct FixtureMeta {
    pub query: Option<std::collections::HashMap<String, serde_json::Value>>,
    pub bearer: Option<String>,
}

#[derive(Deserialize)]
pub struct FixtureRequest {
    pub method: String,
    pub path_pattern: String,
}

#[derive(Deserialize)]
pub struct FixtureResponse {
    pub status_code: u16,
    #[serde(default)]
    pub body: serde_json::Value,
}

pub const TEST_TOKEN: &str = "test_token";

pub struct MoodMock {
    pub server: MockServer,
    pub tokens: MemoryTokenStore,
}

#[allow(dead_code)]
impl MoodMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            tokens: MemoryTokenStore::new(),
        }
    }

    /// Starts with `TEST_TOKEN` already stored.
    pub async fn start_logged_in() -> Self {
        Self {
            server: MockServer::start().await,
            tokens: MemoryTokenStore::with_token(TEST_TOKEN),
        }
    }

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    pub async fn mount_fixture(&self, fixture_path: &str) {
        let full_path = Self::fixtures_dir().join(fixture_path);

        let content = fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", full_path.display(), e));

        let fixture: Fixture = serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", full_path.display(), e));

        let mut mock = Mock::given(method(fixture.request.method.as_str()))
            .and(path_regex(&fixture.request.path_pattern));

        if let Some(meta) = &fixture.meta {
            if let Some(query) = &meta.query {
                for (key, value) in query {
                    if let Some(value) = query_value_to_string(value) {
                        mock = mock.and(query_param_normalized(key, value));
                    }
                }
            }
            if let Some(token) = &meta.bearer {
                mock = mock.and(header("authorization", format!("Bearer {token}").as_str()));
            }
        }

        let template = ResponseTemplate::new(fixture.response.status_code);
        let template = if fixture.response.body.is_null() {
            template
        } else {
            template.set_body_json(&fixture.response.body)
        };

        mock.respond_with(template).mount(&self.server).await;
    }

    pub fn base_url(&self) -> String {
        format!("{}/api/v1/", self.server.uri())
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(Arc::new(self.tokens.clone())).with_base_url(self.base_url())
    }

    pub fn client(&self) -> MoodClient {
        MoodClient::new(self.api())
    }

    pub fn session(&self) -> Session {
        Session::new(self.api())
    }

    pub fn playlists(&self) -> PlaylistFlow {
        PlaylistFlow::new(self.api())
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}

fn query_value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(value) => Some(value.clone()),
        serde_json::Value::Number(value) => Some(value.to_string()),
        serde_json::Value::Bool(value) => Some(value.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}

/// Matches only requests that carry no `Authorization` header.
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

struct QueryParamNormalizedMatcher {
    key: String,
    expected: String,
}

fn query_param_normalized(
    key: impl Into<String>,
    expected: impl Into<String>,
) -> QueryParamNormalizedMatcher {
    QueryParamNormalizedMatcher {
        key: key.into(),
        expected: expected.into(),
    }
}

impl Match for QueryParamNormalizedMatcher {
    fn matches(&self, request: &Request) -> bool {
        request.url.query_pairs().any(|(key, actual)| {
            key == self.key.as_str() && values_match(&self.expected, actual.as_ref())
        })
    }
}

fn values_match(expected: &str, actual: &str) -> bool {
    if expected == actual {
        return true;
    }
    match (expected.parse::<f64>(), actual.parse::<f64>()) {
        (Ok(expected), Ok(actual)) => (expected - actual).abs() < f64::EPSILON,
        _ => false,
    }
}
