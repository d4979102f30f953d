//! Cache validity gate
//!
//! A cached project may be reused iff its metadata is cached, a local
//! last-modified record exists, and the marker captured with the metadata
//! equals that record. Anything else is stale.
//!
//! Refreshing is an explicit two-step protocol: [`CacheGate::check_freshness`]
//! then [`CacheGate::proceed_or_refresh_once`]. The gate never trusts its own
//! refresh; it re-checks afterwards and reports a project that is still stale
//! instead of retrying.

use std::fmt;
use std::sync::Arc;

use super::ProjectCache;
use crate::project::{LastModified, ProjectId};
use crate::session::{SessionError, SessionResult};
use crate::store::{ProjectStore, StoreResult};

/// Why a cached project cannot be reused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// Project metadata is not cached
    NotCached,
    /// No local last-modified record for the project
    NoLastModified,
    /// Cached metadata carries no marker
    NoCachedMarker,
    /// Markers differ
    Mismatch {
        cached: LastModified,
        current: LastModified,
    },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCached => write!(f, "project not cached"),
            Self::NoLastModified => write!(f, "no last-modified record"),
            Self::NoCachedMarker => write!(f, "cached project has no marker"),
            Self::Mismatch { cached, current } => {
                write!(f, "cached marker {} differs from {}", cached, current)
            }
        }
    }
}

/// Result of a freshness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale(StaleReason),
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// What `proceed_or_refresh_once` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Cache was already fresh, nothing downloaded
    AlreadyFresh,
    /// Cache was stale, refreshed once and is fresh now
    Refreshed,
}

/// Decides whether cached project data can be reused
#[derive(Clone)]
pub struct CacheGate {
    cache: Arc<ProjectCache>,
    store: Arc<dyn ProjectStore>,
}

impl CacheGate {
    pub fn new(cache: Arc<ProjectCache>, store: Arc<dyn ProjectStore>) -> Self {
        Self { cache, store }
    }

    pub fn cache(&self) -> &Arc<ProjectCache> {
        &self.cache
    }

    /// Check whether the cached project can be reused as-is
    pub fn check_freshness(&self, id: &ProjectId) -> Freshness {
        if !self.cache.contains(id) {
            return Freshness::Stale(StaleReason::NotCached);
        }
        let Some(current) = self.cache.last_modified(id) else {
            return Freshness::Stale(StaleReason::NoLastModified);
        };
        let Some(cached) = self.cache.cached_marker(id) else {
            return Freshness::Stale(StaleReason::NoCachedMarker);
        };

        if cached == current {
            Freshness::Fresh
        } else {
            Freshness::Stale(StaleReason::Mismatch { cached, current })
        }
    }

    pub fn is_fresh(&self, id: &ProjectId) -> bool {
        self.check_freshness(id).is_fresh()
    }

    /// Download the project from the store, replacing every cached part
    ///
    /// Runs metadata, documents, targets, then the last-modified marker, in
    /// that order, each exactly once.
    pub fn refresh(&self, id: &ProjectId) -> StoreResult<()> {
        log::info!("[CACHE] Refreshing project {}", id);

        let project = self.store.get_project(id)?;
        self.cache.store_project(project);

        let documents = self.store.get_documents(id)?;
        self.cache.store_documents(id, documents);

        let targets = self.store.get_targets(id)?;
        self.cache.store_targets(id, targets);

        let last_modified = self.store.get_last_modified(id)?;
        self.cache.store_last_modified(id, last_modified);

        Ok(())
    }

    /// Proceed when fresh, otherwise refresh once and re-check
    ///
    /// A project that is still stale after the refresh points at an
    /// inconsistent store and is reported as [`SessionError::StillStale`].
    pub fn proceed_or_refresh_once(&self, id: &ProjectId) -> SessionResult<RefreshOutcome> {
        if let Freshness::Stale(reason) = self.check_freshness(id) {
            log::info!("[CACHE] Project {} is stale: {}", id, reason);
            self.refresh(id)?;
        } else {
            return Ok(RefreshOutcome::AlreadyFresh);
        }

        match self.check_freshness(id) {
            Freshness::Fresh => Ok(RefreshOutcome::Refreshed),
            Freshness::Stale(reason) => {
                log::error!("[CACHE] Project {} still stale after refresh: {}", id, reason);
                Err(SessionError::StillStale {
                    project: id.clone(),
                    reason,
                })
            }
        }
    }
}
