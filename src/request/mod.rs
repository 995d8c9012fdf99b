//! Request Module
//!
//! Thin request layer in front of the cache: derives a cache key from the
//! request URL and query, answers from the cache when allowed, and otherwise
//! dispatches through a [`Transport`] and persists the response.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{Clock, StoreCache, SystemClock};
use crate::storage::{MemoryStorage, StorageProvider};

// == Cache Key ==
/// Builds the cache key for a request: the URL followed by its query
/// parameters as `k=v` pairs, sorted by name and joined by `&`.
///
/// Parameters are appended after an existing `?` with `&`, or after a fresh
/// `?`. Values are used verbatim, without URL encoding.
pub fn cache_key(url: &str, query: &BTreeMap<String, String>) -> String {
    if query.is_empty() {
        return url.to_string();
    }

    let pairs = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if url.contains('?') { '&' } else { '?' };

    format!("{url}{separator}{pairs}")
}

// == Request Options ==
/// Per-request caching behavior.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Answer from and persist to the cache
    pub cache: bool,
    /// TTL in seconds for the persisted response, None = never expires
    pub expire: Option<u64>,
    /// Cache keys invalidated once this request completes
    pub dependencies: Vec<String>,
}

impl RequestOptions {
    /// Options for a cached request with the given TTL.
    pub fn cached(expire: Option<u64>) -> Self {
        Self {
            cache: true,
            expire,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies<I, K>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

// == Transport ==
/// Performs the actual network call.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
    ) -> impl Future<Output = anyhow::Result<Value>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
    ) -> impl Future<Output = anyhow::Result<Value>> + Send {
        (**self).send(url, query)
    }
}

// == Response ==
/// Where a response payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub payload: Value,
    pub source: ResponseSource,
}

// == Data Manager ==
/// Dispatches requests through a transport with a [`StoreCache`] in front.
pub struct DataManager<T, S = MemoryStorage, C = SystemClock> {
    transport: T,
    cache: Arc<RwLock<StoreCache<S, C>>>,
}

impl<T, S, C> DataManager<T, S, C>
where
    T: Transport,
    S: StorageProvider,
    C: Clock,
{
    pub fn new(transport: T, cache: Arc<RwLock<StoreCache<S, C>>>) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &Arc<RwLock<StoreCache<S, C>>> {
        &self.cache
    }

    // == Request ==
    /// Issues a request, serving it from the cache when `options.cache` is set
    /// and a live entry exists.
    ///
    /// A successful network response of a cacheable request is persisted under
    /// the request's cache key, and every key in `options.dependencies` is
    /// removed. Transport errors are returned as-is and leave the cache alone.
    pub async fn request(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
        options: &RequestOptions,
    ) -> anyhow::Result<Response> {
        let key = cache_key(url, query);

        if options.cache {
            let cached = self.cache.write().await.get::<Value>(&key, None);
            if let Some(payload) = cached {
                debug!(key, "serving request from cache");
                return Ok(Response {
                    payload,
                    source: ResponseSource::Cache,
                });
            }
        }

        let payload = self.transport.send(url, query).await?;

        if options.cache {
            let cache = self.cache.write().await;
            cache.set(&key, &payload, None, options.expire);
            for dependency in &options.dependencies {
                cache.remove(dependency, None);
            }
            debug!(
                key,
                invalidated = options.dependencies.len(),
                "stored network response"
            );
        }

        Ok(Response {
            payload,
            source: ResponseSource::Network,
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the request back and counts calls
    #[derive(Default)]
    struct EchoTransport {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Transport for EchoTransport {
        async fn send(
            &self,
            url: &str,
            query: &BTreeMap<String, String>,
        ) -> anyhow::Result<Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(json!({"url": url, "query": query, "call": call}))
        }
    }

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn create_manager(
        transport: EchoTransport,
    ) -> (DataManager<EchoTransport, MemoryStorage, ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let cache = StoreCache::with_clock(MemoryStorage::new(), "app.local", clock.clone());
        (
            DataManager::new(transport, Arc::new(RwLock::new(cache))),
            clock,
        )
    }

    #[test]
    fn test_cache_key_without_query() {
        assert_eq!(cache_key("/api/list", &BTreeMap::new()), "/api/list");
    }

    #[test]
    fn test_cache_key_sorts_parameters() {
        let q = query(&[("page", "2"), ("size", "10"), ("order", "desc")]);
        assert_eq!(cache_key("/api/list", &q), "/api/list?order=desc&page=2&size=10");
    }

    #[test]
    fn test_cache_key_extends_existing_query() {
        let q = query(&[("b", "2")]);
        assert_eq!(cache_key("/api/list?a=1", &q), "/api/list?a=1&b=2");
    }

    #[tokio::test]
    async fn test_uncached_request_always_hits_network() {
        let (manager, _) = create_manager(EchoTransport::default());
        let options = RequestOptions::default();

        for _ in 0..2 {
            let response = manager.request("/api", &BTreeMap::new(), &options).await.unwrap();
            assert_eq!(response.source, ResponseSource::Network);
        }

        assert_eq!(manager.transport.calls.load(Ordering::SeqCst), 2);
        assert!(manager.cache().read().await.storage().is_empty());
    }

    #[tokio::test]
    async fn test_cached_request_served_from_cache() {
        let (manager, _) = create_manager(EchoTransport::default());
        let options = RequestOptions::cached(Some(60));
        let q = query(&[("id", "7")]);

        let first = manager.request("/api/item", &q, &options).await.unwrap();
        let second = manager.request("/api/item", &q, &options).await.unwrap();

        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(first.payload, second.payload);
        assert_eq!(manager.transport.calls.load(Ordering::SeqCst), 1);

        let cached: Option<Value> = manager.cache().read().await.get("/api/item?id=7", None);
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn test_cached_response_expires() {
        let (manager, clock) = create_manager(EchoTransport::default());
        let options = RequestOptions::cached(Some(1));

        manager.request("/api", &BTreeMap::new(), &options).await.unwrap();
        clock.advance(1_001);
        let response = manager.request("/api", &BTreeMap::new(), &options).await.unwrap();

        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.payload["call"], json!(2));
    }

    #[tokio::test]
    async fn test_dependencies_are_invalidated() {
        let (manager, _) = create_manager(EchoTransport::default());
        {
            let cache = manager.cache().read().await;
            cache.set("/api/list", &json!(["stale"]), None, None);
            cache.set("/api/other", &json!("kept"), None, None);
        }

        let options = RequestOptions::cached(None).with_dependencies(["/api/list"]);
        manager.request("/api/save", &BTreeMap::new(), &options).await.unwrap();

        let cache = manager.cache().read().await;
        assert_eq!(cache.get::<Value>("/api/list", None), None);
        assert_eq!(cache.get::<Value>("/api/other", None), Some(json!("kept")));
    }

    #[tokio::test]
    async fn test_dependencies_invalidated_regardless_of_expiry() {
        let (manager, _) = create_manager(EchoTransport::default());
        manager
            .cache()
            .read()
            .await
            .set("/api/list", &json!(1), None, Some(86_400));

        let options = RequestOptions::cached(Some(10)).with_dependencies(vec!["/api/list"]);
        manager.request("/api/save", &BTreeMap::new(), &options).await.unwrap();

        let all = manager.cache().read().await.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].key, "/api/save");
    }

    #[tokio::test]
    async fn test_transport_failure_persists_nothing() {
        let transport = EchoTransport {
            fail: true,
            ..Default::default()
        };
        let (manager, _) = create_manager(transport);
        manager
            .cache()
            .read()
            .await
            .set("/api/list", &json!(1), None, None);

        let options = RequestOptions::cached(None).with_dependencies(["/api/list"]);
        let result = manager.request("/api/save", &BTreeMap::new(), &options).await;

        assert!(result.is_err());
        let cache = manager.cache().read().await;
        assert_eq!(cache.get::<Value>("/api/list", None), Some(json!(1)));
        assert_eq!(cache.get::<Value>("/api/save", None), None);
    }

    #[test]
    fn test_request_outside_async_context() {
        let (manager, _) = create_manager(EchoTransport::default());
        let options = RequestOptions::cached(None);

        let response =
            tokio_test::block_on(manager.request("/sync", &BTreeMap::new(), &options)).unwrap();
        assert_eq!(response.source, ResponseSource::Network);
    }
}
