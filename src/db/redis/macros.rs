/// Read-through caching around an async block.
///
/// Returns the cached value for `$key` when present; otherwise awaits `$block`,
/// queues the result for a background write with `$ttl` seconds, and returns it.
/// The enclosing function's error type must accept the block's error via `?`.
///
/// # Example
/// ```rust,ignore
/// let details: MovieDetails = cached!(self.cache, CacheKey::Details(key), DETAILS_CACHE_TTL, async move {
///     self.fetch_uncached(&query).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
