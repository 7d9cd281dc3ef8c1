//! Scripted in-process server.
//!
//! Implements [`Transport`] by answering from per-path scripts instead of the
//! network, and records every request it receives. Paths without a script
//! fail like an unreachable host.

#![allow(clippy::disallowed_types, reason = "Synchronous bookkeeping, never held across await")]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use s4_client::{HttpRequest, HttpResponse, Transport, TransportError};
use s4_core::offline::{ANCHOR_ROUTE, QUEUE_STATUS_ROUTE, SYNC_ROUTE};
use serde_json::{Value, json};

/// Answer to one request.
pub type Reply = Result<HttpResponse, TransportError>;

type Handler = Arc<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

#[derive(Default)]
struct Route {
    /// One-shot replies, consumed before the handler
    scripted: VecDeque<Reply>,
    handler: Option<Handler>,
}

#[derive(Default)]
struct State {
    routes: HashMap<String, Route>,
    requests: Vec<HttpRequest>,
    down: bool,
}

/// In-process stand-in for the S4 Ledger API. Clones share state.
#[derive(Clone, Default)]
pub struct SimServer {
    state: Arc<Mutex<State>>,
}

impl SimServer {
    /// Server with no routes: every request fails with a network error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Server answering the anchor, batch sync and queue status routes the
    /// way the real API does when healthy.
    ///
    /// Batch sync answers `{"synced": n}` with `n` the number of submitted
    /// items.
    pub fn ledger() -> Self {
        let server = Self::new();
        server.respond(ANCHOR_ROUTE, HttpResponse::ok_json(&json!({ "status": "anchored" })));
        server.handle(SYNC_ROUTE, |request| {
            let synced = request
                .json_body()
                .and_then(|body| body.get("hashes").and_then(Value::as_array).map(Vec::len))
                .unwrap_or(0);
            Ok(HttpResponse::ok_json(&json!({ "synced": synced })))
        });
        server.respond(
            QUEUE_STATUS_ROUTE,
            HttpResponse::ok_json(&json!({ "queue_size": 0, "last_sync": null })),
        );
        server
    }

    /// Always answer `path` with `response`.
    pub fn respond(&self, path: &str, response: HttpResponse) {
        self.handle(path, move |_| Ok(response.clone()));
    }

    /// Always fail `path` with `error`.
    pub fn fail(&self, path: &str, error: TransportError) {
        self.handle(path, move |_| Err(error.clone()));
    }

    /// Answer `path` by calling `handler`.
    #[allow(clippy::expect_used)]
    pub fn handle(&self, path: &str, handler: impl Fn(&HttpRequest) -> Reply + Send + Sync + 'static) {
        let mut state = self.state.lock().expect("server state poisoned");
        state.routes.entry(path.to_string()).or_default().handler = Some(Arc::new(handler));
    }

    /// Queue one-shot replies for `path`, used in order before its handler.
    #[allow(clippy::expect_used)]
    pub fn script(&self, path: &str, replies: impl IntoIterator<Item = Reply>) {
        let mut state = self.state.lock().expect("server state poisoned");
        state.routes.entry(path.to_string()).or_default().scripted.extend(replies);
    }

    /// Make every request fail with a network error until brought back up.
    #[allow(clippy::expect_used)]
    pub fn set_down(&self, down: bool) {
        self.state.lock().expect("server state poisoned").down = down;
    }

    /// Every request received, in order.
    #[allow(clippy::expect_used)]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().expect("server state poisoned").requests.clone()
    }

    /// Requests received for `path`, in order.
    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests().into_iter().filter(|request| request.path() == path).collect()
    }

    #[allow(clippy::expect_used)]
    fn answer(&self, request: HttpRequest) -> Reply {
        let mut state = self.state.lock().expect("server state poisoned");
        let path = request.path().to_string();
        state.requests.push(request.clone());

        if state.down {
            return Err(TransportError::Network("network unreachable".into()));
        }

        let Some(route) = state.routes.get_mut(&path) else {
            return Err(TransportError::Network(format!("connection refused: {path}")));
        };
        if let Some(reply) = route.scripted.pop_front() {
            return reply;
        }
        match &route.handler {
            Some(handler) => handler(&request),
            None => Err(TransportError::Network(format!("connection refused: {path}"))),
        }
    }
}

impl Transport for SimServer {
    fn send(&self, request: HttpRequest) -> impl std::future::Future<Output = Reply> + Send {
        std::future::ready(self.answer(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unrouted_paths_fail_as_network_errors() {
        let server = SimServer::new();
        let result = server.send(HttpRequest::get("/api/metrics/performance")).await;
        assert!(matches!(result, Err(TransportError::Network(_))));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn scripted_replies_come_first() {
        let server = SimServer::ledger();
        server.script(SYNC_ROUTE, [Ok(HttpResponse::new(500))]);

        let body = json!({ "hashes": [{}, {}] });
        let first = server.send(HttpRequest::post_json(SYNC_ROUTE, &body)).await.unwrap();
        let second = server.send(HttpRequest::post_json(SYNC_ROUTE, &body)).await.unwrap();

        assert_eq!(first.status, 500);
        assert_eq!(second.decode::<Value>().unwrap()["synced"], 2);
    }

    #[tokio::test]
    async fn down_server_fails_everything() {
        let server = SimServer::ledger();
        server.set_down(true);
        assert!(server.send(HttpRequest::get(QUEUE_STATUS_ROUTE)).await.is_err());
        server.set_down(false);
        assert!(server.send(HttpRequest::get(QUEUE_STATUS_ROUTE)).await.is_ok());
    }
}
