//! Probe environment context.
//!
//! Probes inspect the ambient environment through an explicit context that is
//! constructed once at startup and passed by reference to every invocation,
//! rather than reaching for process globals from inside the probe body.

use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::Mutex;

/// Immutable snapshot of the ambient process scope.
///
/// This is the first argument every probe receives. It is captured once, so
/// all probes observe the same view of the environment.
#[derive(Debug, Clone, Default)]
pub struct GlobalScope {
    os: String,
    arch: String,
    interactive: bool,
    vars: HashMap<String, String>,
}

impl GlobalScope {
    /// Captures the real process environment.
    ///
    /// Environment entries that are not valid Unicode (legal on Unix) are
    /// skipped: an unreadable variable reads as absent, never as fatal.
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            interactive: std::io::stdout().is_terminal(),
            vars: std::env::vars_os()
                .filter_map(|(name, value)| {
                    Some((name.into_string().ok()?, value.into_string().ok()?))
                })
                .collect(),
        }
    }

    /// A scope with nothing detected, for tests and hosts that expose no
    /// ambient state.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds an environment variable to the snapshot.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Overrides the interactive-terminal flag.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Operating system name as reported at capture time.
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Processor architecture as reported at capture time.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Whether the process was attached to an interactive terminal.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Looks up an environment variable from the snapshot.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Whether the snapshot captured any environment variables at all.
    pub fn has_vars(&self) -> bool {
        !self.vars.is_empty()
    }
}

/// Host-supplied document-like object.
///
/// An opaque property bag the embedding host may expose for probes that need
/// more than the process scope. Hosts without such a surface pass `None` as
/// the second probe argument.
#[derive(Debug, Clone, Default)]
pub struct Document {
    properties: HashMap<String, String>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property to the document.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Looks up a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whether the document carries the named property.
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }
}

/// Shared mutable scratch fixture handed to probes.
///
/// Probes that need somewhere to stage state during a test write into this
/// element. It is shared across all probes of a cache, so callers that care
/// about stale state reset it between probes with [`reset_probe_element`].
#[derive(Debug, Default)]
pub struct ScratchElement {
    state: Mutex<HashMap<String, String>>,
}

impl ScratchElement {
    /// Creates an empty scratch element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state.lock().unwrap().insert(key.into(), value.into());
    }

    /// Reads back a previously stored value.
    pub fn get(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().get(key).cloned()
    }

    /// Deletes all stored state.
    pub fn clear(&self) {
        self.state.lock().unwrap().clear();
    }

    /// Whether the element holds no state.
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().is_empty()
    }
}

/// Clears all scratch state left behind by earlier probes and returns the
/// element for reuse.
pub fn reset_probe_element(element: &ScratchElement) -> &ScratchElement {
    element.clear();
    element
}

/// The full environment context passed to probe functions.
///
/// Constructed once per cache; probes receive its three parts as positional
/// arguments: the global scope, the optional document, and the scratch
/// element.
#[derive(Debug)]
pub struct ProbeContext {
    /// Snapshot of the ambient process scope.
    pub global: GlobalScope,
    /// Document-like object, when the host provides one.
    pub document: Option<Document>,
    /// Shared scratch fixture for probes.
    pub element: ScratchElement,
}

impl ProbeContext {
    /// Builds a context from explicit parts.
    pub fn new(global: GlobalScope, document: Option<Document>) -> Self {
        Self {
            global,
            document,
            element: ScratchElement::new(),
        }
    }

    /// Captures the real process environment, with no document.
    pub fn detect() -> Self {
        Self::new(GlobalScope::detect(), None)
    }

    /// A context with nothing detected.
    pub fn empty() -> Self {
        Self::new(GlobalScope::empty(), None)
    }
}
