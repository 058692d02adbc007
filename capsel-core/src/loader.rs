//! Resource-loading boundary.
//!
//! Resolution itself is synchronous; producing the selected resource is the
//! one asynchronous boundary in the system. The contract: at most one load
//! request per resolution, and exactly one completion - with a resource, with
//! `None` when nothing was selected, or with the loader's error.

use async_trait::async_trait;
use tracing::debug;

use crate::cache::FeatureCache;
use crate::error::Result;
use crate::resolver::select;

/// Produces the resource a selected identifier names.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// The resource type this loader produces.
    type Resource: Send;

    /// Loads the resource for `id`.
    async fn load(&self, id: &str) -> Result<Self::Resource>;
}

/// Resolves `expression` against `cache` and loads the selected resource.
///
/// When the expression reduces to no selection the loader is bypassed
/// entirely and the resolution completes with `Ok(None)`.
pub async fn resolve<L>(
    expression: &str,
    cache: &FeatureCache,
    loader: &L,
) -> Result<Option<L::Resource>>
where
    L: ResourceLoader,
{
    match select(expression, cache) {
        Some(id) => {
            debug!(%id, "loading selected resource");
            loader.load(&id).await.map(Some)
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::ProbeContext;
    use crate::error::CapselError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoLoader {
        loads: AtomicUsize,
    }

    impl EchoLoader {
        fn new() -> Self {
            Self {
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ResourceLoader for EchoLoader {
        type Resource = String;

        async fn load(&self, id: &str) -> Result<String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if id == "missing" {
                return Err(CapselError::LoadFailed {
                    id: id.to_string(),
                    reason: "not found".to_string(),
                });
            }
            Ok(format!("resource:{}", id))
        }
    }

    fn cache_with(pairs: &[(&str, bool)]) -> FeatureCache {
        let cache = FeatureCache::new(ProbeContext::empty());
        for (name, value) in pairs {
            cache.register(*name, *value);
        }
        cache
    }

    #[tokio::test]
    async fn selection_loads_exactly_once() {
        let cache = cache_with(&[("x", true)]);
        let loader = EchoLoader::new();

        let resource = resolve("x?modA:modB", &cache, &loader).await.unwrap();
        assert_eq!(resource, Some("resource:modA".to_string()));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_selection_bypasses_the_loader() {
        let cache = cache_with(&[]);
        let loader = EchoLoader::new();

        let resource = resolve("", &cache, &loader).await.unwrap();
        assert_eq!(resource, None);

        let resource = resolve(":modB", &cache, &loader).await.unwrap();
        assert_eq!(resource, None);

        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn load_failures_propagate() {
        let cache = cache_with(&[]);
        let loader = EchoLoader::new();

        let err = resolve("missing", &cache, &loader).await.unwrap_err();
        assert!(matches!(err, CapselError::LoadFailed { .. }));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }
}
