//! Common test utilities and helpers

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use carelink::{Transport, TransportRequest, TransportResponse};
use carelink::{Client, ClientBuilder};
use http::{HeaderMap, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

/// Load a response fixture
#[allow(dead_code)]
pub fn load_response_fixture(name: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let path = Path::new(manifest_dir)
        .join("tests")
        .join("fixtures")
        .join("responses")
        .join(format!("{}.json", name));

    std::fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!(
            "Failed to load response fixture '{}' from {:?}: {}",
            name, path, e
        )
    })
}

/// Test API key id
#[allow(dead_code)]
pub const TEST_KEY_ID: &str = "key_test_01HZX2V5";

/// Test API key secret
#[allow(dead_code)]
pub const TEST_KEY_SECRET: &str = "sk_test_5f1c0e7a9b2d4c68a3e1f0b7d9c2a4e6";

/// Member shape used by the fixtures
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct Member {
    pub id: String,
    pub email: String,
    pub primary_provider: Option<String>,
}

/// List envelope used by the fixtures
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct MemberList {
    pub data: Vec<Member>,
    pub has_more: bool,
}

/// Client builder pointed at `base_url` with the test API key
#[allow(dead_code)]
pub fn client_builder(base_url: impl Into<String>) -> ClientBuilder {
    Client::builder()
        .api_key(TEST_KEY_ID, TEST_KEY_SECRET)
        .base_url(base_url)
}

/// One exchange seen by [`RecordingTransport`]
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

/// Transport that records every call and answers with a fixed body
#[derive(Debug)]
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    data: Value,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn new(data: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            data,
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn request(&self, request: TransportRequest) -> carelink::Result<TransportResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            url: request.url()?.to_string(),
            headers: request.headers.clone(),
        });
        Ok(TransportResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            self.data.clone(),
        ))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
