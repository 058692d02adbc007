//! Default feature registration.
//!
//! When the embedding host supplies no feature API of its own, [`bootstrap`]
//! registers a minimal set of features derived from the process environment.
//! All registrations go through the first-wins path, so a host seed or an
//! earlier registration always takes precedence.

use crate::cache::{FeatureCache, FeatureValue};

/// Always true: the process is running at all.
pub const HOST_PROCESS: &str = "host-process";
/// The compile target is a Unix family system.
pub const HOST_UNIX: &str = "host-unix";
/// The compile target is Windows.
pub const HOST_WINDOWS: &str = "host-windows";
/// The global scope exposes environment variables.
pub const HOST_ENV: &str = "host-env";
/// The process is attached to an interactive terminal.
pub const HOST_TTY: &str = "host-tty";
/// The embedding host supplied a document-like object.
pub const HOST_DOCUMENT: &str = "host-document";

/// Registers the default feature set.
///
/// Target-family flags are registered eagerly; everything that depends on
/// the captured environment stays a probe until first queried.
pub fn bootstrap(cache: &FeatureCache) {
    cache.register(HOST_PROCESS, true);
    cache.register(HOST_UNIX, cfg!(unix));
    cache.register(HOST_WINDOWS, cfg!(windows));
    cache.register(
        HOST_ENV,
        FeatureValue::probe(|global, _, _| global.has_vars()),
    );
    cache.register(
        HOST_TTY,
        FeatureValue::probe(|global, _, _| global.is_interactive()),
    );
    cache.register(
        HOST_DOCUMENT,
        FeatureValue::probe(|_, document, _| document.is_some()),
    );
}
