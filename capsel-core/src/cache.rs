//! Memoized feature cache.
//!
//! The cache is the single source of truth for "does capability X exist in
//! this environment". Entries are either booleans or probe functions; a probe
//! is invoked the first time its feature is queried and its result replaces
//! the probe in place, so each probe runs at most once per process lifetime
//! unless explicitly overwritten.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::env::{reset_probe_element, Document, GlobalScope, ProbeContext, ScratchElement};

/// Name (if a string) or identifier (if an integer) of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureKey {
    /// A named feature, e.g. `"host-tty"`.
    Name(String),
    /// A numeric feature identifier.
    Id(u64),
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKey::Name(name) => write!(f, "{}", name),
            FeatureKey::Id(id) => write!(f, "#{}", id),
        }
    }
}

impl From<&str> for FeatureKey {
    fn from(name: &str) -> Self {
        FeatureKey::Name(name.to_string())
    }
}

impl From<String> for FeatureKey {
    fn from(name: String) -> Self {
        FeatureKey::Name(name)
    }
}

impl From<u64> for FeatureKey {
    fn from(id: u64) -> Self {
        FeatureKey::Id(id)
    }
}

/// A probe function.
///
/// Invoked with three positional arguments: the global scope, the optional
/// host document, and the shared scratch element. The return value is cached
/// as the feature's boolean. Probes are trusted, environment-authored code;
/// a panicking probe propagates to the caller of [`FeatureCache::query`].
pub type ProbeFn =
    Box<dyn Fn(&GlobalScope, Option<&Document>, &ScratchElement) -> bool + Send + Sync>;

/// A cache entry: an already-resolved boolean, or a probe waiting for its
/// first query.
pub enum FeatureValue {
    /// The feature's value is known.
    Resolved(bool),
    /// The feature is determined by a probe on first query.
    Probe(ProbeFn),
}

impl FeatureValue {
    /// Wraps a probe function as a cache value.
    pub fn probe<F>(probe: F) -> Self
    where
        F: Fn(&GlobalScope, Option<&Document>, &ScratchElement) -> bool + Send + Sync + 'static,
    {
        FeatureValue::Probe(Box::new(probe))
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Resolved(value)
    }
}

impl fmt::Debug for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Resolved(value) => f.debug_tuple("Resolved").field(value).finish(),
            FeatureValue::Probe(_) => f.write_str("Probe(..)"),
        }
    }
}

/// Host-provided initial cache contents: feature name to boolean.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSeed(pub HashMap<String, bool>);

/// Serializable view of the cache contents.
///
/// Pending probes are reported as pending, never invoked by taking a
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Features with a known boolean value.
    pub resolved: BTreeMap<String, bool>,
    /// Features whose probe has not run yet.
    pub pending: Vec<String>,
}

/// Lazily-evaluated, memoized feature registry.
pub struct FeatureCache {
    /// Feature key to entry; probes are replaced by their result on first
    /// query.
    entries: RwLock<HashMap<FeatureKey, FeatureValue>>,
    /// Environment context handed to every probe invocation.
    context: ProbeContext,
}

impl FeatureCache {
    /// Creates an empty cache over the given probe context.
    pub fn new(context: ProbeContext) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            context,
        }
    }

    /// Creates a cache over the real process environment.
    pub fn detect() -> Self {
        Self::new(ProbeContext::detect())
    }

    /// Creates a cache pre-populated from a host-provided seed.
    ///
    /// Seeded entries count as first registrations, so later `register`
    /// calls for the same keys are ignored.
    pub fn with_seed<K, I>(context: ProbeContext, seed: I) -> Self
    where
        K: Into<FeatureKey>,
        I: IntoIterator<Item = (K, bool)>,
    {
        let cache = Self::new(context);
        {
            let mut entries = cache.entries.write().unwrap();
            for (key, value) in seed {
                entries.insert(key.into(), FeatureValue::Resolved(value));
            }
        }
        cache
    }

    /// The environment context probes are invoked with.
    pub fn context(&self) -> &ProbeContext {
        &self.context
    }

    /// Returns the current value of the named feature.
    ///
    /// If the entry is a pending probe, the probe is invoked once with the
    /// environment context and its result is stored back under the key.
    /// Unregistered features read as false: absence of information means
    /// "assume unsupported".
    pub fn query(&self, key: impl Into<FeatureKey>) -> bool {
        let key = key.into();
        {
            let entries = self.entries.read().unwrap();
            match entries.get(&key) {
                Some(FeatureValue::Resolved(value)) => {
                    trace!(feature = %key, value, "feature cache hit");
                    return *value;
                }
                None => {
                    trace!(feature = %key, "unregistered feature reads false");
                    return false;
                }
                Some(FeatureValue::Probe(_)) => {}
            }
        }

        // Take the probe out of the map so it runs at most once, and so it
        // can itself consult the cache without holding the map lock.
        let probe = {
            let mut entries = self.entries.write().unwrap();
            match entries.remove(&key) {
                Some(FeatureValue::Probe(probe)) => probe,
                Some(FeatureValue::Resolved(value)) => {
                    entries.insert(key, FeatureValue::Resolved(value));
                    return value;
                }
                None => return false,
            }
        };

        debug!(feature = %key, "running feature probe");
        let value = probe(
            &self.context.global,
            self.context.document.as_ref(),
            &self.context.element,
        );
        self.entries
            .write()
            .unwrap()
            .insert(key, FeatureValue::Resolved(value));
        value
    }

    /// Registers a value (boolean or probe) for the named feature.
    ///
    /// The first registration wins: if the key already holds a value the
    /// call is a no-op. Use [`FeatureCache::register_with`] to override.
    pub fn register(&self, key: impl Into<FeatureKey>, value: impl Into<FeatureValue>) {
        self.register_with(key, value, false, false);
    }

    /// Full registration form.
    ///
    /// # Arguments
    /// * `key` - Feature name or identifier
    /// * `value` - Boolean or probe to store
    /// * `evaluate_now` - Query the feature immediately after storing and
    ///   return the result
    /// * `force` - Replace an existing entry instead of keeping the first
    ///   registration
    ///
    /// # Returns
    /// `Some(result)` when `evaluate_now` is set, `None` otherwise.
    pub fn register_with(
        &self,
        key: impl Into<FeatureKey>,
        value: impl Into<FeatureValue>,
        evaluate_now: bool,
        force: bool,
    ) -> Option<bool> {
        let key = key.into();
        {
            let mut entries = self.entries.write().unwrap();
            if force || !entries.contains_key(&key) {
                entries.insert(key.clone(), value.into());
            } else {
                debug!(feature = %key, "registration ignored, key already defined");
            }
        }
        if evaluate_now {
            Some(self.query(key))
        } else {
            None
        }
    }

    /// Whether the key has been registered at all, resolved or pending.
    /// Never forces a probe.
    pub fn contains(&self, key: impl Into<FeatureKey>) -> bool {
        self.entries.read().unwrap().contains_key(&key.into())
    }

    /// Forces every pending probe to run.
    pub fn evaluate_all(&self) {
        let pending: Vec<FeatureKey> = {
            let entries = self.entries.read().unwrap();
            entries
                .iter()
                .filter(|(_, value)| matches!(value, FeatureValue::Probe(_)))
                .map(|(key, _)| key.clone())
                .collect()
        };
        for key in pending {
            self.query(key);
        }
    }

    /// Takes a serializable snapshot of the cache contents without forcing
    /// any pending probes.
    pub fn snapshot(&self) -> CacheSnapshot {
        let entries = self.entries.read().unwrap();
        let mut resolved = BTreeMap::new();
        let mut pending = Vec::new();
        for (key, value) in entries.iter() {
            match value {
                FeatureValue::Resolved(v) => {
                    resolved.insert(key.to_string(), *v);
                }
                FeatureValue::Probe(_) => pending.push(key.to_string()),
            }
        }
        pending.sort();
        CacheSnapshot { resolved, pending }
    }

    /// Clears the shared scratch element and returns it for reuse, so
    /// repeated probes do not accumulate stale state.
    pub fn reset_probe_element(&self) -> &ScratchElement {
        reset_probe_element(&self.context.element)
    }
}

impl fmt::Debug for FeatureCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureCache")
            .field("entries", &self.entries.read().unwrap().len())
            .finish()
    }
}
