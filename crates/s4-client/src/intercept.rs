//! Fetch interception layer.
//!
//! [`OfflineFetch`] wraps a [`Transport`] and is itself a `Transport`, so the
//! UI issues every request through it unchanged. While online every request
//! is delegated. While offline:
//!
//! | Route                    | Behaviour                                      |
//! |--------------------------|------------------------------------------------|
//! | anchor (`/api/anchor`)   | body captured into the queue, 200 `queued_offline` |
//! | provision                | 200 with a deterministic mock session          |
//! | anything else            | delegated; fails with the inner network error  |

use std::sync::Arc;

use s4_core::{
    Environment, OfflineRoutes, RouteKind,
    offline::{capture_anchor, offline_session_body, queued_offline_body},
};
use s4_store::{QueueStore, Storage};

use crate::{
    connectivity::Connectivity,
    http::{HttpRequest, HttpResponse, Transport, TransportError},
};

/// Offline-aware wrapper around the outbound-request primitive.
pub struct OfflineFetch<T: Transport, S: Storage, E: Environment> {
    inner: T,
    queue: Arc<QueueStore<S, E>>,
    connectivity: Connectivity,
    routes: OfflineRoutes,
}

impl<T: Transport, S: Storage, E: Environment> Clone for OfflineFetch<T, S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            queue: Arc::clone(&self.queue),
            connectivity: self.connectivity.clone(),
            routes: self.routes.clone(),
        }
    }
}

impl<T: Transport, S: Storage, E: Environment> OfflineFetch<T, S, E> {
    /// Wrap `inner`, queueing into `queue` while `connectivity` is offline.
    pub fn new(inner: T, queue: Arc<QueueStore<S, E>>, connectivity: Connectivity) -> Self {
        Self::with_routes(inner, queue, connectivity, OfflineRoutes::default())
    }

    /// As [`Self::new`] with custom route paths.
    pub fn with_routes(
        inner: T,
        queue: Arc<QueueStore<S, E>>,
        connectivity: Connectivity,
        routes: OfflineRoutes,
    ) -> Self {
        Self { inner, queue, connectivity, routes }
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Issue `request`, intercepting it if offline and on a known route.
    ///
    /// # Errors
    ///
    /// - Whatever the inner transport returns for delegated requests
    /// - `TransportError::Network` if an offline anchor could not be queued
    pub async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if self.connectivity.is_online() {
            return self.inner.send(request).await;
        }

        match self.routes.classify(&request.url) {
            RouteKind::Anchor => self.queue_anchor(&request),
            RouteKind::Provision => Ok(self.mock_session()),
            RouteKind::Passthrough => self.inner.send(request).await,
        }
    }

    fn queue_anchor(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let env = self.queue.env();
        let capture = capture_anchor(request.body.as_deref(), &env.timestamp());
        if capture.malformed {
            tracing::warn!(url = %request.url, "unparseable anchor body; queueing with unknown hash");
        }

        let hash = capture.item.hash.clone();
        let len = self.queue.append(capture.item).map_err(|e| {
            tracing::error!(error = %e, %hash, "failed to queue offline anchor");
            TransportError::Network(format!("offline and queue unavailable: {e}"))
        })?;

        tracing::info!(%hash, queue_len = len, "anchor queued offline");
        Ok(HttpResponse::ok_json(&queued_offline_body(env.wall_clock().timestamp_millis())))
    }

    fn mock_session(&self) -> HttpResponse {
        let tier = self.queue.selected_tier();
        tracing::info!(tier = tier.as_deref(), "serving offline demo session");
        HttpResponse::ok_json(&offline_session_body(tier.as_deref()))
    }
}

impl<T: Transport, S: Storage, E: Environment> Transport for OfflineFetch<T, S, E> {
    fn send(&self, request: HttpRequest) -> impl std::future::Future<Output = Result<HttpResponse, TransportError>> + Send {
        self.fetch(request)
    }
}
