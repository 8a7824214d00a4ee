//! Run-scoped cache of accepted classifier results
//!
//! A fingerprint identifies a stage's input. Once a stage has accepted a
//! classifier answer for a fingerprint, later lookups return that answer and
//! the classifier is not called again during the run.

use crate::model::{ComponentMap, Relationship};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Deterministic cache key derived from a stage's input identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// `{stage}:{path}:{content_len}` for per-file stages
    pub fn for_file(stage: &str, path: &Path, content_len: usize) -> Self {
        Self(format!("{}:{}:{}", stage, path.display(), content_len))
    }

    /// `{stage}:{sha256(components)}`
    pub fn for_components(stage: &str, components: &ComponentMap) -> Self {
        Self(format!("{}:{}", stage, digest(components)))
    }

    /// `{stage}:{sha256(components)}:{sha256(relationships)}`
    pub fn for_graph(
        stage: &str,
        components: &ComponentMap,
        relationships: &[Relationship],
    ) -> Self {
        Self(format!(
            "{}:{}:{}",
            stage,
            digest(components),
            digest(&relationships)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn digest<T: Serialize + ?Sized>(value: &T) -> String {
    // ComponentMap is a BTreeMap, so its JSON form is already sorted by name.
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

pub struct ResponseCache {
    entries: Mutex<HashMap<Fingerprint, serde_json::Value>>,
    enabled: bool,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            enabled: true,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// A cache that never stores anything; every lookup computes.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get<T: DeserializeOwned>(&self, fingerprint: &Fingerprint) -> Option<T> {
        if !self.enabled {
            return None;
        }
        let entries = self.entries.lock().ok()?;
        let value = entries.get(fingerprint)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Cached value for {} has an unexpected shape: {}", fingerprint, e);
                None
            }
        }
    }

    /// Stores `value` unless the fingerprint already has one; returns the
    /// value that ends up associated with the fingerprint.
    pub fn insert_if_absent<T: Serialize + DeserializeOwned>(
        &self,
        fingerprint: &Fingerprint,
        value: T,
    ) -> T {
        if !self.enabled {
            return value;
        }
        let Ok(encoded) = serde_json::to_value(&value) else {
            return value;
        };
        let Ok(mut entries) = self.entries.lock() else {
            return value;
        };
        let stored = entries.entry(fingerprint.clone()).or_insert(encoded);
        serde_json::from_value(stored.clone()).unwrap_or(value)
    }

    /// Returns the cached value for `fingerprint`, or runs `compute`.
    ///
    /// `compute` yields `None` when it could not produce an acceptable result;
    /// nothing is stored in that case, so the caller's fallback runs and a
    /// later call with the same fingerprint may try again.
    pub async fn get_or_compute<T, F, Fut>(&self, fingerprint: &Fingerprint, compute: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        if let Some(hit) = self.get::<T>(fingerprint) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit: {}", fingerprint);
            return Some(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss: {}", fingerprint);

        let computed = compute().await?;
        Some(self.insert_if_absent(fingerprint, computed))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("enabled", &self.enabled)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComponentRole, RelationshipKind};
    use std::path::PathBuf;

    fn components(pairs: &[(&str, ComponentRole)]) -> ComponentMap {
        pairs
            .iter()
            .map(|(n, r)| (n.to_string(), *r))
            .collect()
    }

    #[tokio::test]
    async fn test_compute_runs_once_per_fingerprint() {
        let cache = ResponseCache::new();
        let fp = Fingerprint::for_file("detect", &PathBuf::from("svc/user.py"), 120);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Option<String> = cache
                .get_or_compute(&fp, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Some("service".to_string())
                })
                .await;
            assert_eq!(value.as_deref(), Some("service"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, entries: 1 });
    }

    #[tokio::test]
    async fn test_rejected_results_are_not_stored() {
        let cache = ResponseCache::new();
        let fp = Fingerprint::for_file("scan", &PathBuf::from("a.py"), 10);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Option<String> = cache
                .get_or_compute(&fp, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    None
                })
                .await;
            assert!(value.is_none());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_cache_always_computes() {
        let cache = ResponseCache::disabled();
        let fp = Fingerprint::for_file("scan", &PathBuf::from("a.py"), 10);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let _: Option<u32> = cache
                .get_or_compute(&fp, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Some(7)
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_first_write_wins() {
        let cache = ResponseCache::new();
        let fp = Fingerprint::for_file("detect", &PathBuf::from("a.py"), 1);

        assert_eq!(cache.insert_if_absent(&fp, "first".to_string()), "first");
        assert_eq!(cache.insert_if_absent(&fp, "second".to_string()), "first");
        assert_eq!(cache.get::<String>(&fp).as_deref(), Some("first"));
    }

    #[test]
    fn test_file_fingerprint_format() {
        let fp = Fingerprint::for_file("scan", &PathBuf::from("services/user.py"), 42);
        assert_eq!(fp.as_str(), "scan:services/user.py:42");
    }

    #[test]
    fn test_component_fingerprint_is_order_independent() {
        let a = components(&[("gw", ComponentRole::Gateway), ("db", ComponentRole::Database)]);
        let b = components(&[("db", ComponentRole::Database), ("gw", ComponentRole::Gateway)]);

        assert_eq!(
            Fingerprint::for_components("relate", &a),
            Fingerprint::for_components("relate", &b)
        );
    }

    #[test]
    fn test_component_fingerprint_changes_with_roles() {
        let a = components(&[("x", ComponentRole::Cache)]);
        let b = components(&[("x", ComponentRole::Queue)]);

        assert_ne!(
            Fingerprint::for_components("relate", &a),
            Fingerprint::for_components("relate", &b)
        );
    }

    #[test]
    fn test_graph_fingerprint_depends_on_relationships() {
        let comps = components(&[("gw", ComponentRole::Gateway), ("svc", ComponentRole::Service)]);
        let rels = vec![Relationship::new("gw", "svc", RelationshipKind::Routes)];

        let with = Fingerprint::for_graph("render", &comps, &rels);
        let without = Fingerprint::for_graph("render", &comps, &[]);

        assert_ne!(with, without);
        assert!(with.as_str().starts_with("render:"));
    }
}
