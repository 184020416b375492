//! Scriptable mock WFS endpoint for HTTP-level tests.
//!
//! Binds to `127.0.0.1:0`, answers every `GET /wfs` with the reply produced by
//! a responder closure and records each request it saw.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use wfs_common::ProtocolVersion;

use crate::fixtures::{capabilities_xml, FeatureTypeFixture};

/// A request received by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub params: HashMap<String, String>,
    pub user_agent: Option<String>,
}

impl RecordedRequest {
    /// Query parameter by case-insensitive key, as OGC KVP keys are.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Reply produced for one request.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: None,
        }
    }

    /// Capabilities document declaring `version`.
    pub fn capabilities(version: &str, feature_types: &[FeatureTypeFixture]) -> Self {
        Self::ok(capabilities_xml(version, feature_types))
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Responder = dyn Fn(&RecordedRequest) -> MockReply + Send + Sync;

struct MockState {
    responder: Box<Responder>,
    requests: Mutex<Vec<RecordedRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Running mock server. The server task is aborted on drop.
pub struct MockWfsServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockWfsServer {
    /// Start a server answering with `responder`.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockReply + Send + Sync + 'static,
    {
        let state = Arc::new(MockState {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/wfs", get(handle_wfs))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock WFS server");
        let addr = listener.local_addr().expect("mock server address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Server that behaves like a real WFS: it answers with the requested
    /// version when supported, its lowest version when the request is below
    /// it, and otherwise the highest supported version below the request.
    pub async fn supporting(versions: &[&str], feature_types: Vec<FeatureTypeFixture>) -> Self {
        let mut supported: Vec<ProtocolVersion> = versions
            .iter()
            .map(|v| v.parse().expect("valid fixture version"))
            .collect();
        supported.sort();

        Self::start(move |req| {
            let requested = req.param("version").and_then(ProtocolVersion::parse);
            let answer = match requested {
                Some(requested) => supported
                    .iter()
                    .rev()
                    .find(|v| **v <= requested)
                    .or_else(|| supported.first()),
                None => supported.last(),
            };
            match answer {
                Some(version) => MockReply::capabilities(&version.to_string(), &feature_types),
                None => MockReply::status(500, "no versions configured"),
            }
        })
        .await
    }

    /// Base URL of the WFS endpoint.
    pub fn url(&self) -> String {
        format!("http://{}/wfs", self.addr)
    }

    /// Requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("requests lock").clone()
    }

    /// Versions requested so far, in arrival order.
    pub fn requested_versions(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.param("version").map(str::to_string))
            .collect()
    }

    /// Highest number of requests handled concurrently.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for MockWfsServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_wfs(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let request = RecordedRequest {
        params,
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    let current = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(current, Ordering::SeqCst);

    let reply = (state.responder)(&request);
    state.requests.lock().expect("requests lock").push(request);

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "text/xml")], reply.body).into_response()
}
