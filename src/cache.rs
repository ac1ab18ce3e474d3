use std::sync::Arc;
use std::time::{Duration, Instant};

/// Holds the last fetched value for a fixed time-to-live window.
#[derive(Debug)]
pub struct FetchCache<T> {
    ttl: Duration,
    entry: Option<(Instant, Arc<T>)>,
}

impl<T> FetchCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value if it was stored less than `ttl` before `now`.
    pub fn get(&self, now: Instant) -> Option<Arc<T>> {
        let (stored_at, value) = self.entry.as_ref()?;
        (now.saturating_duration_since(*stored_at) < self.ttl).then(|| Arc::clone(value))
    }

    pub fn store(&mut self, now: Instant, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entry = Some((now, Arc::clone(&value)));
        value
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.entry
            .as_ref()
            .map(|(stored_at, _)| now.saturating_duration_since(*stored_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_within_ttl_and_expires_after() {
        let start = Instant::now();
        let mut cache = FetchCache::new(Duration::from_secs(300));
        assert!(cache.get(start).is_none());

        cache.store(start, 7);
        assert_eq!(cache.get(start + Duration::from_secs(299)).as_deref(), Some(&7));
        assert!(cache.get(start + Duration::from_secs(300)).is_none());
        assert_eq!(cache.age(start + Duration::from_secs(5)), Some(Duration::from_secs(5)));
    }

    #[test]
    fn invalidate_drops_entry_unconditionally() {
        let start = Instant::now();
        let mut cache = FetchCache::new(Duration::from_secs(300));
        cache.store(start, "rows");
        cache.invalidate();
        assert!(cache.get(start).is_none());
        assert_eq!(cache.age(start), None);
    }

    #[test]
    fn zero_ttl_never_serves() {
        let start = Instant::now();
        let mut cache = FetchCache::new(Duration::ZERO);
        cache.store(start, 1);
        assert!(cache.get(start).is_none());
    }
}
