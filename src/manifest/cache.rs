//! Manifest cache with explicit TTL and invalidation.
//!
//! Holds the last generated manifest behind an `Arc`. Regenerations are
//! serialized by a mutex; while one is running, readers keep getting the
//! previous manifest. The swap is a single pointer replacement under the
//! write lock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::models::Manifest;

/// Freshness of the cached manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStaleness {
    /// Nothing generated yet
    Missing,
    /// Within TTL and no mutation since
    Fresh,
    /// Older than the TTL
    Expired,
    /// A mutation happened after generation
    Invalidated,
}

impl ManifestStaleness {
    pub fn needs_regeneration(&self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// TTL-memoized manifest.
pub struct ManifestCache {
    current: RwLock<Option<Arc<Manifest>>>,
    invalidated: AtomicBool,
    regenerating: Mutex<()>,
    ttl: Duration,
}

impl ManifestCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            current: RwLock::new(None),
            invalidated: AtomicBool::new(false),
            regenerating: Mutex::new(()),
            ttl: Duration::seconds(
                i64::try_from(ttl_secs)
                    .unwrap_or(i64::MAX)
                    .min(i64::MAX / 1_000),
            ),
        }
    }

    /// The last generated manifest, whatever its freshness.
    pub async fn current(&self) -> Option<Arc<Manifest>> {
        self.current.read().await.clone()
    }

    /// Mark the cached manifest stale. Cheap; called after every mutation.
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }

    /// Freshness as of `now`. Invalidation takes precedence over expiry.
    pub async fn staleness(&self, now: DateTime<Utc>) -> ManifestStaleness {
        let current = self.current.read().await;
        match current.as_ref() {
            None => ManifestStaleness::Missing,
            Some(_) if self.invalidated.load(Ordering::SeqCst) => ManifestStaleness::Invalidated,
            Some(m) if now.signed_duration_since(m.generated_at) >= self.ttl => {
                ManifestStaleness::Expired
            }
            Some(_) => ManifestStaleness::Fresh,
        }
    }

    /// Return the cached manifest if fresh, otherwise regenerate it.
    ///
    /// If another regeneration is already in flight and a previous manifest
    /// exists, that previous manifest is returned instead of waiting.
    pub async fn get_or_generate<F, Fut>(&self, now: DateTime<Utc>, generate: F) -> Arc<Manifest>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Manifest>,
    {
        if let Some(fresh) = self.fresh(now).await {
            return fresh;
        }

        let _guard = match self.regenerating.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(previous) = self.current().await {
                    return previous;
                }
                self.regenerating.lock().await
            }
        };

        // Someone else may have finished while we waited
        if let Some(fresh) = self.fresh(now).await {
            return fresh;
        }
        self.regenerate_locked(generate).await
    }

    /// Regenerate unconditionally.
    pub async fn force_regenerate<F, Fut>(&self, generate: F) -> Arc<Manifest>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Manifest>,
    {
        let _guard = self.regenerating.lock().await;
        self.regenerate_locked(generate).await
    }

    async fn fresh(&self, now: DateTime<Utc>) -> Option<Arc<Manifest>> {
        if self.staleness(now).await == ManifestStaleness::Fresh {
            self.current().await
        } else {
            None
        }
    }

    async fn regenerate_locked<F, Fut>(&self, generate: F) -> Arc<Manifest>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Manifest>,
    {
        // Cleared before the snapshot is taken: a mutation racing with the
        // generation sets it again and the result is treated as stale.
        self.invalidated.store(false, Ordering::SeqCst);
        let manifest = Arc::new(generate().await);
        *self.current.write().await = Some(manifest.clone());
        debug!(generated_at = %manifest.generated_at, "Manifest cache refreshed");
        manifest
    }
}

impl Default for ManifestCache {
    fn default() -> Self {
        Self::new(300)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::generator::ManifestGenerator;
    use crate::memory::models::MemoryState;

    fn manifest_at(at: DateTime<Utc>) -> Manifest {
        ManifestGenerator::default().generate(&MemoryState::default(), at)
    }

    #[tokio::test]
    async fn test_staleness_transitions() {
        let cache = ManifestCache::new(300);
        let t0 = Utc::now();
        assert_eq!(cache.staleness(t0).await, ManifestStaleness::Missing);

        cache.force_regenerate(|| async { manifest_at(t0) }).await;
        assert_eq!(cache.staleness(t0).await, ManifestStaleness::Fresh);
        assert_eq!(
            cache.staleness(t0 + Duration::seconds(299)).await,
            ManifestStaleness::Fresh
        );
        assert_eq!(
            cache.staleness(t0 + Duration::seconds(300)).await,
            ManifestStaleness::Expired
        );

        cache.invalidate();
        assert_eq!(cache.staleness(t0).await, ManifestStaleness::Invalidated);
        assert!(cache.staleness(t0).await.needs_regeneration());
    }

    #[tokio::test]
    async fn test_get_or_generate_memoizes() {
        let cache = ManifestCache::new(300);
        let t0 = Utc::now();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        let first = cache
            .get_or_generate(t0, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                manifest_at(t0)
            })
            .await;
        let second = cache
            .get_or_generate(t0 + Duration::seconds(10), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                manifest_at(t0)
            })
            .await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Expired: regenerated
        let t1 = t0 + Duration::seconds(301);
        let third = cache.get_or_generate(t1, || async { manifest_at(t1) }).await;
        assert_eq!(third.generated_at, t1);

        // Invalidated: regenerated even within TTL
        cache.invalidate();
        let fourth = cache.get_or_generate(t1, || async { manifest_at(t1) }).await;
        assert!(!Arc::ptr_eq(&third, &fourth));
        assert_eq!(cache.staleness(t1).await, ManifestStaleness::Fresh);
    }

    #[tokio::test]
    async fn test_readers_get_previous_during_regeneration() {
        let cache = Arc::new(ManifestCache::new(300));
        let t0 = Utc::now();
        let old = cache.force_regenerate(|| async { manifest_at(t0) }).await;
        cache.invalidate();

        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let writer = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .force_regenerate(|| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        manifest_at(t0 + Duration::seconds(1))
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        // Expired for this reader, but a regeneration is in flight
        let later = t0 + Duration::seconds(400);
        let seen = cache
            .get_or_generate(later, || async move { manifest_at(later) })
            .await;
        assert!(Arc::ptr_eq(&seen, &old));

        release_tx.send(()).unwrap();
        let new = writer.await.unwrap();
        assert_eq!(new.generated_at, t0 + Duration::seconds(1));
        assert!(Arc::ptr_eq(&cache.current().await.unwrap(), &new));
    }
}
