use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Title search, keyed by provider and query
    TitleSearch(String),
    /// Title details, keyed by provider and lookup key
    Details(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TitleSearch(query) => write!(f, "search:{}", query.trim().to_lowercase()),
            CacheKey::Details(key) => write!(f, "details:{}", key),
        }
    }
}

/// Creates a Redis client for caching and rate limiting
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Read-through cache for metadata provider responses
///
/// A disabled cache (no Redis configured) always misses and drops writes.
/// Redis failures are logged and treated as misses so lookups keep working.
#[derive(Clone)]
pub struct Cache {
    redis_client: Option<Client>,
    write_tx: Option<mpsc::UnboundedSender<CacheWriteMessage>>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Sends the shutdown signal; the writer flushes pending writes before exiting.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a Redis-backed cache and spawns its background writer
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client: Some(redis_client),
            write_tx: Some(write_tx),
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    /// A cache that stores nothing
    pub fn disabled() -> Self {
        Self {
            redis_client: None,
            write_tx: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis_client.is_some()
    }

    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> redis::RedisResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    async fn read_from_redis(client: &Client, key: &CacheKey) -> redis::RedisResult<Option<String>> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        conn.get(key.to_string()).await
    }

    /// Retrieves a value from the cache, `None` on miss or on any cache failure
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let client = self.redis_client.as_ref()?;

        match Self::read_from_redis(client, key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(data) => {
                    tracing::debug!(key = %key, "Cache hit");
                    Some(data)
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis read failed, treating as miss");
                None
            }
        }
    }

    /// Queues a value for writing without waiting for Redis
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let Some(write_tx) = &self.write_tx else {
            return;
        };

        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_title_search_lowercase() {
        let key = CacheKey::TitleSearch("tmdb:THE MATRIX ".to_string());
        assert_eq!(key.to_string(), "search:tmdb:the matrix");
    }

    #[test]
    fn test_cache_key_display_details() {
        let key = CacheKey::Details("omdb:tt1375666".to_string());
        assert_eq!(key.to_string(), "details:omdb:tt1375666");
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = Cache::disabled();
        let key = CacheKey::TitleSearch("anything".to_string());

        cache.set_in_background(&key, &vec!["a".to_string()], 60);
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await;

        assert!(!cache.is_enabled());
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_a_miss() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client).await;
        let key = CacheKey::Details("unreachable".to_string());

        let retrieved: Option<String> = cache.get_from_cache(&key).await;
        assert_eq!(retrieved, None);

        handle.shutdown().await;
    }
}
