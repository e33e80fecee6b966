//! Scriptable in-process WMS server for client tests.
//!
//! Replies are keyed by the value of the `request` query parameter
//! (case-insensitive), with a catch-all fallback. Each key holds a queue:
//! replies are consumed in order and the last one repeats.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const ANY: &str = "*";

/// One canned HTTP response.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl MockReply {
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            body: body.into(),
            delay: None,
        }
    }

    pub fn png(body: Vec<u8>) -> Self {
        Self::new(200, "image/png", body)
    }

    pub fn xml(body: &str) -> Self {
        Self::new(200, "text/xml", body.as_bytes().to_vec())
    }

    pub fn status(status: u16) -> Self {
        Self::new(status, "text/plain", format!("status {}", status))
    }

    /// Hold the response back for `delay` before sending it.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct MockState {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<String>>,
}

impl MockState {
    fn next_reply(&self, key: &str) -> Option<MockReply> {
        let mut replies = self.replies.lock().expect("mock reply lock");
        let key = if replies.get(key).is_some_and(|q| !q.is_empty()) {
            key
        } else {
            ANY
        };
        let queue = replies.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

/// A running mock server bound to an ephemeral localhost port.
///
/// The server task is aborted when this value is dropped.
pub struct MockWmsServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockWmsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock WMS listener");
        let addr = listener.local_addr().expect("mock WMS local addr");
        let state = Arc::new(MockState::default());

        let app = Router::new().fallback(handle).with_state(state.clone());
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, task }
    }

    /// Base URL of the service endpoint, e.g. `http://127.0.0.1:PORT/wms`.
    pub fn base_url(&self) -> String {
        format!("http://{}/wms", self.addr)
    }

    /// Queue a reply for requests whose `request=` parameter matches.
    pub fn on(&self, request: &str, reply: MockReply) -> &Self {
        self.push(request.to_ascii_lowercase(), reply);
        self
    }

    /// Queue a reply for any request without a more specific match.
    pub fn on_any(&self, reply: MockReply) -> &Self {
        self.push(ANY.to_string(), reply);
        self
    }

    fn push(&self, key: String, reply: MockReply) {
        self.state
            .replies
            .lock()
            .expect("mock reply lock")
            .entry(key)
            .or_default()
            .push_back(reply);
    }

    /// Raw query strings of every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().expect("mock request lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().expect("mock request lock").len()
    }
}

impl Drop for MockWmsServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(State(state): State<Arc<MockState>>, RawQuery(query): RawQuery) -> Response {
    let query = query.unwrap_or_default();
    state
        .requests
        .lock()
        .expect("mock request lock")
        .push(query.clone());

    let key = request_key(&query);
    let Some(reply) = state.next_reply(&key) else {
        return (StatusCode::NOT_FOUND, "no mock reply configured").into_response();
    };

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, reply.content_type)], reply.body).into_response()
}

fn request_key(query: &str) -> String {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.eq_ignore_ascii_case("request"))
        .map(|(_, v)| v.to_ascii_lowercase())
        .unwrap_or_else(|| ANY.to_string())
}

/// A localhost URL on which nothing is listening.
pub async fn unused_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe local addr");
    drop(listener);
    format!("http://{}/wms", addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key() {
        assert_eq!(
            request_key("service=WMS&REQUEST=GetMap&layers=a"),
            "getmap"
        );
        assert_eq!(request_key("service=WMS"), ANY);
    }

    #[test]
    fn test_reply_queue_repeats_last() {
        let state = MockState::default();
        state
            .replies
            .lock()
            .unwrap()
            .insert("getmap".into(), VecDeque::from(vec![MockReply::status(500), MockReply::status(200)]));

        assert_eq!(state.next_reply("getmap").unwrap().status, 500);
        assert_eq!(state.next_reply("getmap").unwrap().status, 200);
        assert_eq!(state.next_reply("getmap").unwrap().status, 200);
        assert!(state.next_reply("getcapabilities").is_none());
    }
}
