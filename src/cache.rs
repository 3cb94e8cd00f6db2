use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::RawPosting;
use crate::sources::{JobSource, SourceError, SourceKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: SourceKind,
    keyword: String,
    location: String,
    max_results: u32,
}

struct CacheEntry {
    fetched_at: Instant,
    postings: Vec<RawPosting>,
}

/// TTL cache over the fetch capability. A cost and rate-limit control, not a
/// freshness guarantee: identical queries within the window are served from
/// memory instead of hitting the external API again.
pub struct FetchCache {
    ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn fetch(
        &mut self,
        source: &dyn JobSource,
        keyword: &str,
        location: &str,
        max_results: u32,
    ) -> Result<Vec<RawPosting>, SourceError> {
        let key = CacheKey {
            source: source.kind(),
            keyword: keyword.to_string(),
            location: location.to_string(),
            max_results,
        };

        if let Some(entry) = self.entries.get(&key) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.postings.clone());
            }
        }

        let postings = source.fetch(keyword, location, max_results)?;
        self.entries.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                postings: postings.clone(),
            },
        );
        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl JobSource for CountingSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Adzuna
        }

        fn fetch(
            &self,
            _keyword: &str,
            _location: &str,
            _max_results: u32,
        ) -> Result<Vec<RawPosting>, SourceError> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![RawPosting {
                id: Some(format!("call-{}", self.calls.get())),
                ..Default::default()
            }])
        }
    }

    #[test]
    fn identical_queries_within_ttl_hit_the_cache() {
        let source = CountingSource { calls: Cell::new(0) };
        let mut cache = FetchCache::new(Duration::from_secs(60));

        let first = cache.fetch(&source, "data", "us", 50).unwrap();
        let second = cache.fetch(&source, "data", "us", 50).unwrap();
        assert_eq!(source.calls.get(), 1);
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn different_queries_miss_the_cache() {
        let source = CountingSource { calls: Cell::new(0) };
        let mut cache = FetchCache::new(Duration::from_secs(60));

        cache.fetch(&source, "data", "us", 50).unwrap();
        cache.fetch(&source, "data", "us", 25).unwrap();
        cache.fetch(&source, "python", "us", 50).unwrap();
        assert_eq!(source.calls.get(), 3);
    }

    #[test]
    fn zero_ttl_always_refetches() {
        let source = CountingSource { calls: Cell::new(0) };
        let mut cache = FetchCache::new(Duration::ZERO);

        cache.fetch(&source, "data", "us", 50).unwrap();
        cache.fetch(&source, "data", "us", 50).unwrap();
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn source_errors_are_not_cached() {
        struct FailingSource;
        impl JobSource for FailingSource {
            fn kind(&self) -> SourceKind {
                SourceKind::Jsearch
            }
            fn fetch(
                &self,
                _keyword: &str,
                _location: &str,
                _max_results: u32,
            ) -> Result<Vec<RawPosting>, SourceError> {
                Err(SourceError::Unavailable("down".to_string()))
            }
        }

        let mut cache = FetchCache::new(Duration::from_secs(60));
        assert!(cache.fetch(&FailingSource, "data", "us", 50).is_err());
        assert!(cache.fetch(&FailingSource, "data", "us", 50).is_err());
    }
}
