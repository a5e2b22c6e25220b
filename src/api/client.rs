//! Cached, rate-limit aware client for the SolarEdge monitoring API
//!
//! Every request for site data goes through [`CachedApiClient::fetch`], which
//! resolves an endpoint + parameter set in a fixed order:
//!
//! 1. While a cooldown deadline is active, no network call is made: the
//!    request's own cache entry is served regardless of age, else the
//!    endpoint's last successful payload, else [`ApiError::RateLimited`].
//! 2. A cache entry younger than the endpoint TTL is served as is.
//! 3. Otherwise the API is called. A 429 starts a new cooldown. A success is
//!    cached under both the request key and the endpoint's last-success key
//!    and clears the cooldown.
//! 4. If the live call failed for any reason, the endpoint's last successful
//!    payload is served before the error is allowed to reach the caller.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::clock::{Clock, SystemClock};
use super::endpoint::{CacheKey, Endpoint, RequestParams};
use super::error::ApiError;
use super::transport::{HttpRequest, Transport};
use crate::cache::{self, CacheEntry, CacheManager, KeyValueStore};
use crate::data;

/// Production host of the monitoring API
pub const PRODUCTION_BASE_URL: &str = "https://monitoringapi.solaredge.com";

/// Default cooldown after a 429 response
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 60;

/// Connection settings and freshness policy
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub site_id: String,
    /// Production host, or a development proxy in front of it
    pub base_url: String,
    /// How long live calls are suppressed after a 429
    pub cooldown: Duration,
    ttl_overrides: HashMap<Endpoint, Duration>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            site_id: site_id.into(),
            base_url: PRODUCTION_BASE_URL.to_string(),
            cooldown: Duration::minutes(DEFAULT_COOLDOWN_MINUTES),
            ttl_overrides: HashMap::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Overrides the freshness window of one endpoint
    pub fn with_ttl(mut self, endpoint: Endpoint, ttl: Duration) -> Self {
        self.ttl_overrides.insert(endpoint, ttl);
        self
    }

    pub fn ttl(&self, endpoint: Endpoint) -> Duration {
        self.ttl_overrides
            .get(&endpoint)
            .copied()
            .unwrap_or_else(|| endpoint.ttl())
    }

    /// `{base_url}/site/{site_id}/{endpoint}`
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}/site/{}/{}", self.base_url, self.site_id, endpoint.name())
    }
}

/// Where a served payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Fetched from the API during this call
    Live,
    /// Cache entry within its TTL
    Cache,
    /// Cache entry served because a cooldown is active
    ThrottledCache,
    /// The endpoint's last successful payload, possibly for other parameters
    LastSuccess,
}

impl DataSource {
    /// Whether the payload came from somewhere other than a fresh read
    pub fn is_fallback(&self) -> bool {
        matches!(self, DataSource::ThrottledCache | DataSource::LastSuccess)
    }
}

/// A payload with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub payload: Value,
    pub source: DataSource,
    pub stored_at: DateTime<Utc>,
}

impl Fetched {
    fn from_entry(entry: CacheEntry, source: DataSource) -> Self {
        Self {
            stored_at: entry.stored_at(),
            payload: entry.data,
            source,
        }
    }
}

/// Entries stored at or before `floor` skip the freshness check until their
/// key has been fetched again.
#[derive(Debug, Default)]
struct RefreshFloor {
    floor: Option<DateTime<Utc>>,
    refreshed: HashSet<String>,
}

/// The single gateway to the monitoring API
pub struct CachedApiClient {
    config: ClientConfig,
    cache: CacheManager,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    refresh: Mutex<RefreshFloor>,
}

impl std::fmt::Debug for CachedApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedApiClient")
            .field("base_url", &self.config.base_url)
            .field("site_id", &self.config.site_id)
            .finish_non_exhaustive()
    }
}

impl CachedApiClient {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            cache: CacheManager::new(store),
            transport,
            clock: Arc::new(SystemClock),
            refresh: Mutex::new(RefreshFloor::default()),
        }
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves a request to its JSON payload
    ///
    /// Fails only when no live, cached, or last-known-good data exists.
    pub async fn get(&self, endpoint: Endpoint, params: &RequestParams) -> Result<Value, ApiError> {
        self.fetch(endpoint, params).await.map(|f| f.payload)
    }

    /// Like [`get`](Self::get), also reporting where the payload came from
    pub async fn fetch(
        &self,
        endpoint: Endpoint,
        params: &RequestParams,
    ) -> Result<Fetched, ApiError> {
        let key = CacheKey::new(endpoint, params);
        let last_success_key = cache::last_success_key(endpoint.name());
        let now = self.clock.now();

        if let Some(until) = self.cache.blocked_until() {
            if now < until {
                if let Some(entry) = self.cache.read_entry(key.as_str()) {
                    tracing::debug!(%endpoint, %until, "throttled, serving cached entry");
                    return Ok(Fetched::from_entry(entry, DataSource::ThrottledCache));
                }
                if let Some(entry) = self.cache.read_entry(&last_success_key) {
                    tracing::info!(%endpoint, %until, "throttled, falling back to last success");
                    return Ok(Fetched::from_entry(entry, DataSource::LastSuccess));
                }
                return Err(ApiError::RateLimited { until });
            }
        }

        if let Some(entry) = self.cache.read_entry(key.as_str()) {
            if self.is_fresh(endpoint, &key, &entry, now) {
                tracing::debug!(%endpoint, "cache hit");
                return Ok(Fetched::from_entry(entry, DataSource::Cache));
            }
        }

        match self.fetch_live(endpoint, params).await {
            Ok(payload) => {
                let stored_at = self.clock.now();
                let entry = CacheEntry::new(payload, stored_at);
                self.store_success(&key, &last_success_key, &entry);
                Ok(Fetched::from_entry(entry, DataSource::Live))
            }
            Err(err) => {
                if let Some(entry) = self.cache.read_entry(&last_success_key) {
                    tracing::warn!(%endpoint, error = %err, "using last success fallback");
                    return Ok(Fetched::from_entry(entry, DataSource::LastSuccess));
                }
                tracing::error!(%endpoint, error = %err, "no data available");
                Err(err)
            }
        }
    }

    /// Clears any cooldown and makes the next call for every cached key go live
    pub fn force_refresh(&self) {
        if let Err(e) = self.cache.clear_blocked_until() {
            tracing::warn!(error = %e, "failed to clear rate-limit state");
        }
        if let Ok(mut refresh) = self.refresh.lock() {
            refresh.floor = Some(self.clock.now());
            refresh.refreshed.clear();
        }
        tracing::info!("forced refresh requested");
    }

    /// The active cooldown deadline, if live calls are currently suppressed
    pub fn rate_limited_until(&self) -> Option<DateTime<Utc>> {
        self.cache
            .blocked_until()
            .filter(|until| self.clock.now() < *until)
    }

    fn is_fresh(&self, endpoint: Endpoint, key: &CacheKey, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        if now - entry.stored_at() >= self.config.ttl(endpoint) {
            return false;
        }
        match self.refresh.lock() {
            Ok(refresh) => match refresh.floor {
                Some(floor) if entry.stored_at() <= floor => {
                    refresh.refreshed.contains(key.as_str())
                }
                _ => true,
            },
            Err(_) => true,
        }
    }

    fn store_success(&self, key: &CacheKey, last_success_key: &str, entry: &CacheEntry) {
        if let Err(e) = self.cache.write_entry(key.as_str(), entry) {
            tracing::warn!(cache_key = %key, error = %e, "failed to cache response");
        }
        if let Err(e) = self.cache.write_entry(last_success_key, entry) {
            tracing::warn!(cache_key = last_success_key, error = %e, "failed to store last success");
        }
        if let Err(e) = self.cache.clear_blocked_until() {
            tracing::warn!(error = %e, "failed to clear rate-limit state");
        }
        if let Ok(mut refresh) = self.refresh.lock() {
            if refresh.floor.is_some() {
                refresh.refreshed.insert(key.as_str().to_string());
            }
        }
    }

    /// Calls the API and validates the response
    async fn fetch_live(&self, endpoint: Endpoint, params: &RequestParams) -> Result<Value, ApiError> {
        let mut query = vec![("api_key".to_string(), self.config.api_key.clone())];
        query.extend(params.query_pairs());
        let request = HttpRequest {
            url: self.config.endpoint_url(endpoint),
            query,
        };

        if let Some(missing) = endpoint
            .required_params()
            .iter()
            .find(|name| !params.contains(name))
        {
            return Err(ApiError::RequestFailed(format!(
                "missing required parameter {}",
                missing
            )));
        }

        tracing::info!(%endpoint, "fetching");
        let response = self
            .transport
            .get(request)
            .await
            .map_err(|e| ApiError::Transport(e.0))?;

        if response.status == 429 {
            let until = self.clock.now() + self.config.cooldown;
            if let Err(e) = self.cache.set_blocked_until(until) {
                tracing::warn!(error = %e, "failed to persist rate-limit state");
            }
            tracing::warn!(%endpoint, %until, "daily limit exceeded, cooling down");
            return Err(ApiError::DailyLimitExceeded);
        }

        if !response.is_success() {
            return Err(ApiError::RequestFailed(format!("status {}", response.status)));
        }

        if !response.is_json() {
            return Err(ApiError::RequestFailed(format!(
                "expected JSON, got {}",
                response.content_type.as_deref().unwrap_or("no content type")
            )));
        }

        let payload: Value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::RequestFailed(format!("invalid JSON body: {}", e)))?;

        data::validate(endpoint, &payload).map_err(|e| ApiError::InvalidPayload {
            endpoint: endpoint.name().to_string(),
            reason: e.to_string(),
        })?;

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::clock::ManualClock;
    use crate::api::transport::{HttpResponse, TransportError};
    use crate::cache::{MemoryStore, BLOCKED_UNTIL_KEY};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that replays queued responses and counts calls
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn push(&self, response: Result<HttpResponse, TransportError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn push_json(&self, body: Value) {
            self.push(Ok(HttpResponse::json(body.to_string())));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("connection refused".into())))
        }
    }

    struct Harness {
        client: CachedApiClient,
        transport: Arc<ScriptedTransport>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let transport = Arc::new(ScriptedTransport::default());
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let client = CachedApiClient::new(
            ClientConfig::new("KEY", "4262188"),
            store.clone(),
            transport.clone(),
        )
        .with_clock(clock.clone());
        Harness {
            client,
            transport,
            store,
            clock,
        }
    }

    fn overview(energy: i64) -> Value {
        json!({"overview": {"energy": energy}})
    }

    fn no_params() -> RequestParams {
        RequestParams::new()
    }

    #[tokio::test]
    async fn test_first_fetch_goes_live_and_persists_both_entries() {
        let h = harness();
        h.transport.push_json(overview(100));

        let result = h.client.fetch(Endpoint::Overview, &no_params()).await.unwrap();

        assert_eq!(result.payload, overview(100));
        assert_eq!(result.source, DataSource::Live);
        assert_eq!(h.transport.calls(), 1);

        let cache = CacheManager::new(h.store.clone());
        assert_eq!(cache.read_entry("solar_data_overview_{}").unwrap().data, overview(100));
        assert_eq!(
            cache.read_entry("solar_last_success_overview").unwrap().data,
            overview(100)
        );
    }

    #[tokio::test]
    async fn test_request_carries_api_key_and_params() {
        let h = harness();
        h.transport.push_json(json!({"power": {"values": []}}));
        let params = RequestParams::new()
            .with("startTime", "2024-07-15 00:00:00")
            .with("endTime", "2024-07-15 23:59:59");

        h.client.get(Endpoint::Power, &params).await.unwrap();

        let requests = h.transport.requests.lock().unwrap();
        assert_eq!(
            requests[0].url,
            "https://monitoringapi.solaredge.com/site/4262188/power"
        );
        assert_eq!(requests[0].query[0], ("api_key".to_string(), "KEY".to_string()));
        assert!(requests[0]
            .query
            .contains(&("startTime".to_string(), "2024-07-15 00:00:00".to_string())));
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_served_from_cache() {
        let h = harness();
        h.transport.push_json(overview(100));

        let first = h.client.get(Endpoint::Overview, &no_params()).await.unwrap();
        h.clock.advance(Duration::minutes(1));
        let second = h.client.fetch(Endpoint::Overview, &no_params()).await.unwrap();

        assert_eq!(h.transport.calls(), 1);
        assert_eq!(second.payload, first);
        assert_eq!(second.source, DataSource::Cache);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_live_call() {
        let h = harness();
        h.transport.push_json(overview(100));
        h.transport.push_json(overview(200));

        h.client.get(Endpoint::Overview, &no_params()).await.unwrap();
        h.clock.advance(Duration::minutes(15));
        let refreshed = h.client.get(Endpoint::Overview, &no_params()).await.unwrap();

        assert_eq!(h.transport.calls(), 2);
        assert_eq!(refreshed, overview(200));
    }

    #[tokio::test]
    async fn test_ttl_override_applies() {
        let transport = Arc::new(ScriptedTransport::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let client = CachedApiClient::new(
            ClientConfig::new("KEY", "1").with_ttl(Endpoint::Overview, Duration::minutes(1)),
            Arc::new(MemoryStore::new()),
            transport.clone(),
        )
        .with_clock(clock.clone());
        transport.push_json(overview(1));
        transport.push_json(overview(2));

        client.get(Endpoint::Overview, &no_params()).await.unwrap();
        clock.advance(Duration::minutes(2));
        client.get(Endpoint::Overview, &no_params()).await.unwrap();

        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_energy_details_refetched_after_dashboard_interval() {
        let h = harness();
        let params = RequestParams::new()
            .with("startTime", "2024-06-16 00:00:00")
            .with("endTime", "2024-07-15 23:59:59")
            .with("timeUnit", "DAY")
            .with("meters", "PRODUCTION,PURCHASED");
        h.transport.push_json(json!({"energyDetails": {"meters": []}}));
        h.transport.push_json(json!({"energyDetails": {"meters": []}}));

        h.client.get(Endpoint::EnergyDetails, &params).await.unwrap();
        h.clock.advance(Duration::minutes(20));
        let result = h.client.fetch(Endpoint::EnergyDetails, &params).await.unwrap();

        assert_eq!(result.source, DataSource::Live);
        assert_eq!(h.transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_required_param_fails_without_request() {
        let h = harness();
        let params = RequestParams::new().with("startTime", "2024-07-15 00:00:00");

        let err = h.client.get(Endpoint::Power, &params).await.unwrap_err();

        match err {
            ApiError::RequestFailed(reason) => assert!(reason.contains("endTime"), "{}", reason),
            other => panic!("expected RequestFailed, got {:?}", other),
        }
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_429_sets_cooldown_and_falls_back_to_last_success() {
        let h = harness();
        h.transport.push_json(overview(100));
        h.transport.push(Ok(HttpResponse::status(429)));

        h.client.get(Endpoint::Overview, &no_params()).await.unwrap();
        h.clock.advance(Duration::minutes(20));
        let result = h.client.fetch(Endpoint::Overview, &no_params()).await.unwrap();

        assert_eq!(result.source, DataSource::LastSuccess);
        assert_eq!(result.payload, overview(100));
        assert_eq!(
            h.client.rate_limited_until(),
            Some(h.clock.now() + Duration::hours(1))
        );

        // Immediate retry: served from the key's entry, no network call
        let retry = h.client.fetch(Endpoint::Overview, &no_params()).await.unwrap();
        assert_eq!(retry.source, DataSource::ThrottledCache);
        assert_eq!(retry.payload, overview(100));
        assert_eq!(h.transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_429_without_any_cache_surfaces_daily_limit() {
        let h = harness();
        h.transport.push(Ok(HttpResponse::status(429)));

        let err = h.client.get(Endpoint::Overview, &no_params()).await.unwrap_err();

        assert!(matches!(err, ApiError::DailyLimitExceeded));
        assert!(err.is_rate_limited());
        assert!(h.store.get(BLOCKED_UNTIL_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cooldown_blocks_network_even_when_entry_is_stale() {
        let h = harness();
        h.transport.push_json(overview(100));
        h.client.get(Endpoint::Overview, &no_params()).await.unwrap();

        // Entry is well past its TTL, but the cooldown wins
        h.clock.advance(Duration::hours(3));
        let cache = CacheManager::new(h.store.clone());
        cache
            .set_blocked_until(h.clock.now() + Duration::minutes(30))
            .unwrap();

        let result = h.client.fetch(Endpoint::Overview, &no_params()).await.unwrap();
        assert_eq!(result.source, DataSource::ThrottledCache);
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cooldown_serves_last_success_for_new_params() {
        let h = harness();
        let today = RequestParams::new()
            .with("startTime", "2024-07-15 00:00:00")
            .with("endTime", "2024-07-15 23:59:59");
        let tomorrow = RequestParams::new()
            .with("startTime", "2024-07-16 00:00:00")
            .with("endTime", "2024-07-16 23:59:59");
        h.transport.push_json(json!({"power": {"values": []}}));
        h.client.get(Endpoint::Power, &today).await.unwrap();

        CacheManager::new(h.store.clone())
            .set_blocked_until(h.clock.now() + Duration::minutes(30))
            .unwrap();

        let result = h.client.fetch(Endpoint::Power, &tomorrow).await.unwrap();
        assert_eq!(result.source, DataSource::LastSuccess);
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cooldown_without_cache_is_rate_limited_error() {
        let h = harness();
        let until = h.clock.now() + Duration::minutes(30);
        CacheManager::new(h.store.clone())
            .set_blocked_until(until)
            .unwrap();

        let err = h.client.get(Endpoint::Inventory, &no_params()).await.unwrap_err();

        match err {
            ApiError::RateLimited { until: reported } => {
                assert_eq!(reported.timestamp_millis(), until.timestamp_millis())
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_second_429_overwrites_deadline() {
        let h = harness();
        h.transport.push(Ok(HttpResponse::status(429)));
        h.transport.push(Ok(HttpResponse::status(429)));

        let _ = h.client.get(Endpoint::Overview, &no_params()).await;
        h.clock.advance(Duration::hours(2));
        let _ = h.client.get(Endpoint::Overview, &no_params()).await;

        assert_eq!(
            h.client.rate_limited_until(),
            Some(h.clock.now() + Duration::hours(1))
        );
    }

    #[tokio::test]
    async fn test_expired_cooldown_allows_live_call() {
        let h = harness();
        CacheManager::new(h.store.clone())
            .set_blocked_until(h.clock.now() - Duration::seconds(1))
            .unwrap();
        h.transport.push_json(overview(5));

        let result = h.client.fetch(Endpoint::Overview, &no_params()).await.unwrap();

        assert_eq!(result.source, DataSource::Live);
        assert!(h.client.rate_limited_until().is_none());
    }

    #[tokio::test]
    async fn test_success_clears_cooldown() {
        let h = harness();
        CacheManager::new(h.store.clone())
            .set_blocked_until(h.clock.now() + Duration::minutes(5))
            .unwrap();
        h.clock.advance(Duration::minutes(6));
        h.transport.push_json(overview(5));

        h.client.get(Endpoint::Overview, &no_params()).await.unwrap();

        assert!(h.store.get(BLOCKED_UNTIL_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transport_error_without_cache_raises() {
        let h = harness();
        h.transport.push(Err(TransportError("dns failure".into())));

        let err = h.client.get(Endpoint::Overview, &no_params()).await.unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_last_success() {
        let h = harness();
        let day1 = RequestParams::new()
            .with("startTime", "2024-07-15 00:00:00")
            .with("endTime", "2024-07-15 23:59:59");
        let day2 = RequestParams::new()
            .with("startTime", "2024-07-16 00:00:00")
            .with("endTime", "2024-07-16 23:59:59");
        let payload = json!({"power": {"values": [{"date": "2024-07-15 12:00:00", "value": 1.0}]}});
        h.transport.push_json(payload.clone());
        h.transport.push(Ok(HttpResponse::status(500)));

        h.client.get(Endpoint::Power, &day1).await.unwrap();
        let result = h.client.fetch(Endpoint::Power, &day2).await.unwrap();

        assert_eq!(result.source, DataSource::LastSuccess);
        assert_eq!(result.payload, payload);
    }

    #[tokio::test]
    async fn test_non_json_content_type_is_a_failure() {
        let h = harness();
        h.transport.push(Ok(HttpResponse {
            status: 200,
            content_type: Some("text/html".into()),
            body: "<html></html>".into(),
        }));

        let err = h.client.get(Endpoint::Overview, &no_params()).await.unwrap_err();

        assert!(matches!(err, ApiError::RequestFailed(_)));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_not_cached() {
        let h = harness();
        h.transport.push_json(json!({"unexpected": true}));

        let err = h.client.get(Endpoint::Overview, &no_params()).await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidPayload { .. }));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_fresh_cache_once() {
        let h = harness();
        h.transport.push_json(overview(1));
        h.transport.push_json(overview(2));

        h.client.get(Endpoint::Overview, &no_params()).await.unwrap();
        h.client.force_refresh();
        let forced = h.client.fetch(Endpoint::Overview, &no_params()).await.unwrap();
        let after = h.client.fetch(Endpoint::Overview, &no_params()).await.unwrap();

        assert_eq!(forced.source, DataSource::Live);
        assert_eq!(forced.payload, overview(2));
        assert_eq!(after.source, DataSource::Cache);
        assert_eq!(h.transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_clears_cooldown() {
        let h = harness();
        CacheManager::new(h.store.clone())
            .set_blocked_until(h.clock.now() + Duration::minutes(30))
            .unwrap();
        h.transport.push_json(overview(9));

        h.client.force_refresh();
        let result = h.client.fetch(Endpoint::Overview, &no_params()).await.unwrap();

        assert_eq!(result.source, DataSource::Live);
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fan_out_for_different_endpoints() {
        let h = harness();
        // Every call fails, each endpoint falls back independently
        let cache = CacheManager::new(h.store.clone());
        let stored = CacheEntry::new(overview(7), h.clock.now() - Duration::days(1));
        cache
            .write_entry(&cache::last_success_key("overview"), &stored)
            .unwrap();

        let params = no_params();
        let (a, b) = futures::join!(
            h.client.fetch(Endpoint::Overview, &params),
            h.client.fetch(Endpoint::EnvBenefits, &params)
        );

        assert_eq!(a.unwrap().source, DataSource::LastSuccess);
        assert!(b.is_err());
        assert_eq!(h.transport.calls(), 2);
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = ClientConfig::new("k", "42").with_base_url("http://localhost:5173/solaredge/");
        assert_eq!(
            config.endpoint_url(Endpoint::Overview),
            "http://localhost:5173/solaredge/site/42/overview"
        );
    }
}
