//! Offline request handling.
//!
//! Decides which outbound requests get synthetic offline behavior and builds
//! what they return. Only two routes qualify: anchor creation (captured into
//! the queue) and demo session provisioning (answered with a mock session).
//! Everything else is left to fail the way the network would.

use serde_json::{Map, Value, json};

use crate::item::{DEFAULT_BRANCH, QueueItem, RECORD_QUEUED_ANCHOR, UNKNOWN_HASH};

/// Anchor creation endpoint.
pub const ANCHOR_ROUTE: &str = "/api/anchor";

/// Demo session provisioning endpoint.
pub const PROVISION_ROUTE: &str = "/api/demo/provision";

/// Batch sync endpoint.
pub const SYNC_ROUTE: &str = "/api/offline/sync";

/// Server-side queue status endpoint.
pub const QUEUE_STATUS_ROUTE: &str = "/api/offline/queue";

/// Status line returned with a queued-offline anchor.
pub const QUEUED_OFFLINE_MESSAGE: &str =
    "Device is offline. Anchor queued and will be submitted when connectivity is restored.";

/// Subscription tier used when none has been selected locally.
pub const DEFAULT_TIER: &str = "pilot";

/// Wallet address handed out by the offline provisioning mock.
pub const OFFLINE_WALLET_ADDRESS: &str = "rS4LedgerOfflineDemoWa11et000000";

/// XRP balance reported by the offline provisioning mock.
pub const OFFLINE_XRP_BALANCE: f64 = 25.0;

/// Endpoint paths the subsystem consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineRoutes {
    /// Anchor creation (intercepted offline)
    pub anchor: String,
    /// Session provisioning (mocked offline)
    pub provision: String,
    /// Batch sync target
    pub sync: String,
    /// Server-side queue status
    pub queue_status: String,
}

impl Default for OfflineRoutes {
    fn default() -> Self {
        Self {
            anchor: ANCHOR_ROUTE.to_string(),
            provision: PROVISION_ROUTE.to_string(),
            sync: SYNC_ROUTE.to_string(),
            queue_status: QUEUE_STATUS_ROUTE.to_string(),
        }
    }
}

/// How an outbound request is treated while offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Capture into the queue and answer `queued_offline`
    Anchor,
    /// Answer with a mock session
    Provision,
    /// Delegate unchanged
    Passthrough,
}

impl OfflineRoutes {
    /// Classify `target`, which may be a path or an absolute URL.
    ///
    /// Matching is on the exact path; query strings, fragments and a
    /// trailing slash are ignored.
    pub fn classify(&self, target: &str) -> RouteKind {
        let path = request_path(target);
        if path == self.anchor {
            RouteKind::Anchor
        } else if path == self.provision {
            RouteKind::Provision
        } else {
            RouteKind::Passthrough
        }
    }
}

/// Path component of a request target.
pub fn request_path(target: &str) -> &str {
    let without_origin = match target.find("://") {
        Some(scheme_end) => {
            let rest = &target[scheme_end + 3..];
            rest.find('/').map_or("/", |slash| &rest[slash..])
        },
        None => target,
    };
    let end = without_origin.find(['?', '#']).unwrap_or(without_origin.len());
    let path = &without_origin[..end];
    if path.len() > 1 { path.trim_end_matches('/') } else { path }
}

/// Result of turning an intercepted anchor body into a queue item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorCapture {
    /// Item to append
    pub item: QueueItem,
    /// Body was present but not a JSON object
    pub malformed: bool,
}

/// Build a queue item from an anchor request body.
///
/// Never fails: an unparseable body is treated as `{}` and a missing hash is
/// stored as [`UNKNOWN_HASH`] so the attempt stays auditable.
pub fn capture_anchor(body: Option<&[u8]>, timestamp: &str) -> AnchorCapture {
    let (fields, malformed) = match body {
        None => (Map::new(), false),
        Some(raw) if raw.iter().all(u8::is_ascii_whitespace) => (Map::new(), false),
        Some(raw) => match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(fields)) => (fields, false),
            Ok(_) | Err(_) => (Map::new(), true),
        },
    };

    let text = |key: &str| {
        fields.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
    };

    let hash = text("hash").or_else(|| text("data_hash")).unwrap_or_else(|| UNKNOWN_HASH.into());
    let record_type = text("record_type").unwrap_or_else(|| RECORD_QUEUED_ANCHOR.into());
    let branch = text("branch").unwrap_or_else(|| DEFAULT_BRANCH.into());

    AnchorCapture { item: QueueItem::new(hash, record_type, branch, timestamp), malformed }
}

/// Body returned to the caller for an anchor queued offline.
///
/// `stamp_millis` is the wall-clock time in Unix milliseconds; it makes the
/// placeholder transaction hash `OFFLINE_<millis>`.
pub fn queued_offline_body(stamp_millis: i64) -> Value {
    json!({
        "status": "queued_offline",
        "message": QUEUED_OFFLINE_MESSAGE,
        "record": {
            "tx_hash": format!("OFFLINE_{stamp_millis}"),
            "network": "Queued Offline",
        },
    })
}

/// Body returned for session provisioning while offline.
///
/// Deterministic apart from `tier`, which comes from the locally cached tier
/// selection.
pub fn offline_session_body(tier: Option<&str>) -> Value {
    let tier = tier.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TIER);
    json!({
        "status": "provisioned_offline",
        "offline": true,
        "wallet": {
            "address": OFFLINE_WALLET_ADDRESS,
            "xrp_balance": OFFLINE_XRP_BALANCE,
        },
        "subscription": {
            "tier": tier,
            "status": "offline_demo",
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_paths_and_urls() {
        let routes = OfflineRoutes::default();
        assert_eq!(routes.classify("/api/anchor"), RouteKind::Anchor);
        assert_eq!(routes.classify("https://s4ledger.test/api/anchor?x=1"), RouteKind::Anchor);
        assert_eq!(routes.classify("/api/anchor/"), RouteKind::Anchor);
        assert_eq!(routes.classify("/api/demo/provision"), RouteKind::Provision);
        assert_eq!(routes.classify("/api/metrics/performance"), RouteKind::Passthrough);
        assert_eq!(routes.classify("/api/anchor/verify"), RouteKind::Passthrough);
        assert_eq!(routes.classify("https://s4ledger.test"), RouteKind::Passthrough);
    }

    #[test]
    fn request_path_strips_origin_query_fragment() {
        assert_eq!(request_path("http://h:8080/a/b?q#f"), "/a/b");
        assert_eq!(request_path("/"), "/");
        assert_eq!(request_path("https://h"), "/");
    }

    #[test]
    fn capture_reads_fields() {
        let body = br#"{"hash":"deadbeef","record_type":"X","branch":"NAVY"}"#;
        let capture = capture_anchor(Some(body), "t0");
        assert!(!capture.malformed);
        assert_eq!(capture.item.hash, "deadbeef");
        assert_eq!(capture.item.record_type, "X");
        assert_eq!(capture.item.branch, "NAVY");
        assert_eq!(capture.item.timestamp, "t0");
        assert!(!capture.item.synced);
    }

    #[test]
    fn capture_falls_back_to_data_hash() {
        let capture = capture_anchor(Some(br#"{"data_hash":"cafe"}"#), "t0");
        assert_eq!(capture.item.hash, "cafe");
        assert_eq!(capture.item.record_type, RECORD_QUEUED_ANCHOR);
        assert_eq!(capture.item.branch, DEFAULT_BRANCH);
    }

    #[test]
    fn malformed_body_still_captured() {
        let capture = capture_anchor(Some(b"{not json"), "t0");
        assert!(capture.malformed);
        assert_eq!(capture.item.hash, UNKNOWN_HASH);
    }

    #[test]
    fn non_object_json_is_malformed() {
        let capture = capture_anchor(Some(b"[1,2,3]"), "t0");
        assert!(capture.malformed);
        assert_eq!(capture.item.hash, UNKNOWN_HASH);
    }

    #[test]
    fn missing_body_is_empty_object() {
        let capture = capture_anchor(None, "t0");
        assert!(!capture.malformed);
        assert_eq!(capture.item.hash, UNKNOWN_HASH);
    }

    #[test]
    fn non_string_hash_is_unknown() {
        let capture = capture_anchor(Some(br#"{"hash":42}"#), "t0");
        assert_eq!(capture.item.hash, UNKNOWN_HASH);
    }

    #[test]
    fn queued_body_shape() {
        let body = queued_offline_body(1_700_000_000_000);
        assert_eq!(body["status"], "queued_offline");
        assert_eq!(body["record"]["tx_hash"], "OFFLINE_1700000000000");
        assert_eq!(body["record"]["network"], "Queued Offline");
    }

    #[test]
    fn session_uses_cached_tier() {
        assert_eq!(offline_session_body(Some("enterprise"))["subscription"]["tier"], "enterprise");
        assert_eq!(offline_session_body(None)["subscription"]["tier"], DEFAULT_TIER);
        assert_eq!(offline_session_body(Some(""))["subscription"]["tier"], DEFAULT_TIER);
        assert_eq!(offline_session_body(None)["wallet"]["address"], OFFLINE_WALLET_ADDRESS);
    }
}
