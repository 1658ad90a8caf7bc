//! Resolved audience caching using Moka.
//!
//! Resolving a large tree against a full snapshot is the expensive step behind
//! audience listings, so results are cached per owner. The key carries the
//! graph revision and the tree fingerprint: a new snapshot or an edited tree
//! simply misses.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cible_shared::config::CacheConfig;
use cible_shared::types::EmployeeId;
use moka::sync::Cache;
use tracing::warn;

use super::resolver::ScopeResolver;
use super::types::{OwnedScope, ScopeOwner};

/// Default cache capacity (number of audiences).
const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Default time-to-live for cache entries (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AudienceKey {
    owner: ScopeOwner,
    revision: u64,
    fingerprint: u64,
    active_only: bool,
}

/// A resolved audience, possibly served from cache.
#[derive(Debug, Clone)]
pub struct CachedAudience {
    /// Matched employees.
    pub employees: Arc<HashSet<EmployeeId>>,
    /// Whether this result was returned from cache.
    pub cached: bool,
}

/// Cache of `resolve_all` results per scope owner.
#[derive(Clone)]
pub struct AudienceCache {
    cache: Cache<AudienceKey, Arc<HashSet<EmployeeId>>>,
}

impl AudienceCache {
    /// Creates a cache with default settings: 256 entries, 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with custom capacity and time-to-live.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .support_invalidation_closures()
            .build();

        Self { cache }
    }

    /// Creates a cache from the `cache` configuration section.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_config(config.max_capacity, config.ttl_secs)
    }

    /// Resolves a scope, returning the cached audience when available.
    pub fn resolve_cached(&self, resolver: &ScopeResolver<'_>, scope: &OwnedScope) -> CachedAudience {
        let key = AudienceKey {
            owner: scope.owner,
            revision: resolver.graph().revision(),
            fingerprint: scope.tree.fingerprint(),
            active_only: resolver.options().active_only,
        };

        if let Some(employees) = self.cache.get(&key) {
            return CachedAudience {
                employees,
                cached: true,
            };
        }

        let employees = Arc::new(resolver.resolve_all(&scope.tree));
        self.cache.insert(key, Arc::clone(&employees));

        CachedAudience {
            employees,
            cached: false,
        }
    }

    /// Drops every cached audience of one owner, e.g. after its tree was deleted.
    pub fn invalidate_owner(&self, owner: ScopeOwner) {
        if let Err(err) = self
            .cache
            .invalidate_entries_if(move |key, _| key.owner == owner)
        {
            warn!(%owner, error = %err, "Falling back to full audience cache invalidation");
            self.cache.invalidate_all();
        }
    }

    /// Invalidates all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs cache maintenance tasks.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for AudienceCache {
    fn default() -> Self {
        Self::new()
    }
}
